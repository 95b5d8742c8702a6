use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre as ey;
use ey::eyre::Context;
use hypack_bundle::{
    asset_registry::{Asset, AssetKind},
    blueprint::{Blueprint, PropValue},
    bundle_file,
};
use hypack_shared::{log::info, serde_json};

/// Decodes a bundle and writes every asset back to an individual file,
/// together with a JSON dump of the decoded header.
pub fn run_unpack(file: &Path) -> ey::Result<()> {
    let blob = fs::read(file).wrap_err_with(|| format!("Failed to read '{}'", file.display()))?;
    let (blueprint, assets) = bundle_file::import(&blob).wrap_err("Failed to decode the bundle")?;

    let directory = if blueprint.name.is_empty() {
        PathBuf::from("Unpacked")
    } else {
        PathBuf::from(&blueprint.name)
    };
    fs::create_dir_all(&directory).wrap_err_with(|| format!("Failed to create '{}'", directory.display()))?;

    info!("Total assets {}", assets.len());
    for asset in assets.iter() {
        info!("{} - {} - {}", asset.url, asset.kind, asset.size);
        let filename = output_filename(asset, &blueprint);
        let path = directory.join(&filename);
        fs::write(&path, &asset.data).wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
    }

    let header = bundle_file::header(&blueprint, &assets);
    let json = serde_json::to_vec_pretty(&header).wrap_err("Failed to encode the decoded header")?;
    fs::write(directory.join("header.json"), json).wrap_err("Failed to write the decoded header")?;

    Ok(())
}

/// Picks a filename for one decoded asset: the script asset becomes
/// `script.js`, the model asset `model.<ext>`, image and file-prop assets
/// get their recorded source names and everything else falls back to the
/// basename of its `asset://` reference.
fn output_filename(asset: &Asset, blueprint: &Blueprint) -> String {
    if asset.kind == AssetKind::Script {
        return "script.js".to_owned();
    }
    if asset.url == blueprint.model {
        return match asset.url.rsplit_once('.') {
            Some((_, extension)) => format!("model.{extension}"),
            None => "model".to_owned(),
        };
    }
    if let Some(image) = &blueprint.image {
        if image.url == asset.url {
            if let Some(name) = source_file_name(&image.name) {
                return name;
            }
        }
    }
    let recorded_name = blueprint.props.values().find_map(|value| match value {
        PropValue::File(file_prop) if file_prop.url == asset.url => source_file_name(&file_prop.name),
        _ => None,
    });
    if let Some(name) = recorded_name {
        return name;
    }
    asset.url.strip_prefix("asset://").unwrap_or(&asset.url).to_owned()
}

fn source_file_name(path: &str) -> Option<String> {
    Path::new(path).file_name().map(|name| name.to_string_lossy().into_owned())
}
