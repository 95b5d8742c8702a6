//! Drives one end-to-end build: an empty [`Blueprint`] is initialized from
//! the project configuration, the compiled script artifact and the model
//! file are registered as assets, and the property descriptor list is
//! processed concurrently before the finished blueprint and asset collection
//! are handed to the [`bundle codec`](crate::bundle_file).
//!
//! Property descriptors are validated when the list is parsed, one worker
//! thread is spawned per descriptor and every worker sends its outcome over
//! a channel. Workers only read files; the blueprint and the asset
//! collection are mutated exclusively on the calling thread after all
//! workers have been joined, in descriptor order, so that repeated builds of
//! the same inputs produce identical bundles.
//!
//! Any validation or I/O failure aborts the whole build. There is no partial
//! output and no retry; a failed build is restarted from the beginning.

use std::{collections::BTreeMap, path::PathBuf, thread};

use hypack_shared::{
    crossbeam_channel,
    log::{debug, info},
    rand::{CryptoRng, Rng},
    generate_identifier,
    serde_json::{self, Value},
};
use serde::Deserialize;

use crate::{
    asset_registry::{AssetCollection, AssetKind},
    blueprint::{Blueprint, FileProp, PropValue},
    common::{read_file, Error, Result},
    config::ProjectConfig,
};

/// Wire shape of one entry in the property descriptor list.
#[derive(Debug, Deserialize)]
struct RawPropDescriptor {
    key: Option<String>,
    #[serde(rename = "type")]
    value_type: Option<String>,
    initial: Option<Value>,
    kind: Option<AssetKind>,
}

/// One validated property descriptor. Descriptors are read once from the
/// descriptor list at build time, populate exactly one entry of the
/// blueprint's properties mapping and are then discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum PropDescriptor {
    /// Inline value copied into the blueprint verbatim; an absent initial
    /// value becomes an empty string.
    Literal { key: String, initial: Option<Value> },
    /// File-backed property. Without an initial path there is nothing to
    /// bundle and the descriptor is a no-op for its key.
    File { key: String, source: Option<FileSource> },
}

/// Source file of a file-backed property.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSource {
    pub kind: AssetKind,
    pub path: PathBuf,
}

/// Parses and validates the property descriptor list.
///
/// Every entry must carry a key and a declared type. A file descriptor with
/// an initial value must additionally carry the asset kind used to classify
/// the referenced file, and its initial value must be a string path.
pub fn parse_prop_descriptors(blob: &[u8]) -> Result<Vec<PropDescriptor>> {
    let raw: Vec<RawPropDescriptor> = serde_json::from_slice(blob).map_err(Error::MalformedDescriptorList)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, raw)| validate_descriptor(index, raw))
        .collect()
}

fn validate_descriptor(index: usize, raw: RawPropDescriptor) -> Result<PropDescriptor> {
    let Some(key) = raw.key else {
        return Err(Error::MissingDescriptorField { index, field: "key" });
    };
    let Some(value_type) = raw.value_type else {
        return Err(Error::MissingDescriptorField { index, field: "type" });
    };

    if value_type != "file" {
        return Ok(PropDescriptor::Literal { key, initial: raw.initial });
    }

    let Some(initial) = raw.initial else {
        return Ok(PropDescriptor::File { key, source: None });
    };
    let Some(kind) = raw.kind else {
        return Err(Error::MissingDescriptorField { index, field: "kind" });
    };
    let Value::String(path) = initial else {
        return Err(Error::InvalidFileInitial { key });
    };
    Ok(PropDescriptor::File {
        key,
        source: Some(FileSource { kind, path: path.into() }),
    })
}

/// Outcome of one property worker. Produced on a worker thread, applied to
/// the blueprint and the asset collection on the owning thread.
enum PropOutcome {
    Skip,
    Literal { key: String, value: Value },
    FileAsset { key: String, kind: AssetKind, name: String, data: Vec<u8> },
}

/// Builds the bundle contents for one project: blueprint initialization,
/// script and model registration and the concurrent property phase. The
/// returned pair is ready for [`export`](crate::bundle_file::export).
///
/// The script artifact at `config.script_path` must already be compiled;
/// invoking the external script bundler is the caller's job. A fresh
/// identifier is generated from `rng` when the configuration has none.
pub fn build_bundle<R>(config: &ProjectConfig, unique_default: bool, rng: &mut R) -> Result<(Blueprint, AssetCollection)>
where
    R: Rng + CryptoRng,
{
    let mut blueprint = init_blueprint(config, unique_default, rng);
    let mut assets = AssetCollection::new();

    info!(
        "Building app {} by {} (v{})",
        config.data.name, config.data.author, config.data.version
    );

    // Script
    info!("Adding script {} to {}", config.script_path.display(), config.data.name);
    let script_blob = read_file(&config.script_path)?;
    blueprint.script = assets.add(script_blob, AssetKind::Script, None).url;

    // Model
    info!("Adding model {}", config.data.model.display());
    let model_blob = read_file(&config.data.model)?;
    let model_kind = if config.data.model.extension().is_some_and(|extension| extension == "vrm") {
        AssetKind::Avatar
    } else {
        AssetKind::Model
    };
    blueprint.model = assets.add(model_blob, model_kind, None).url;

    // Props
    let descriptor_blob = read_file(&config.props_path)?;
    let descriptors = parse_prop_descriptors(&descriptor_blob)?;
    apply_prop_descriptors(&mut blueprint, &mut assets, &descriptors)?;

    Ok((blueprint, assets))
}

fn init_blueprint<R: Rng + CryptoRng>(config: &ProjectConfig, unique_default: bool, rng: &mut R) -> Blueprint {
    let id = if config.data.id.is_empty() {
        generate_identifier(rng)
    } else {
        config.data.id.clone()
    };
    Blueprint {
        id,
        version: config.data.version,
        name: config.data.name.clone(),
        image: None,
        author: config.data.author.clone(),
        url: config.data.url.clone(),
        desc: config.data.desc.clone(),
        model: String::new(),
        script: String::new(),
        props: BTreeMap::new(),
        preload: config.data.preload,
        public: config.data.public,
        locked: false,
        unique: config.data.unique || unique_default,
        frozen: false,
    }
}

/// Processes every descriptor on its own worker thread and applies the
/// outcomes once all workers have finished.
///
/// The workers never touch the blueprint or the asset collection. They send
/// `(index, outcome)` pairs over a channel; after the join point the
/// outcomes are applied in descriptor order on the calling thread. The first
/// error aborts the build.
pub fn apply_prop_descriptors(
    blueprint: &mut Blueprint,
    assets: &mut AssetCollection,
    descriptors: &[PropDescriptor],
) -> Result<()> {
    let (sender, receiver) = crossbeam_channel::unbounded();

    thread::scope(|scope| -> Result<()> {
        for (index, descriptor) in descriptors.iter().enumerate() {
            let sender = sender.clone();
            thread::Builder::new()
                .name(format!("prop worker {index}"))
                .spawn_scoped(scope, move || {
                    let outcome = process_descriptor(descriptor);
                    let _ = sender.send((index, outcome));
                })
                .map_err(|_| Error::FailedToStartWorker)?;
        }
        Ok(())
    })?;
    drop(sender);

    let mut outcomes: Vec<Option<PropOutcome>> = Vec::new();
    outcomes.resize_with(descriptors.len(), || None);
    for (index, outcome) in receiver {
        outcomes[index] = Some(outcome?);
    }

    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            PropOutcome::Skip => {}
            PropOutcome::Literal { key, value } => {
                blueprint.props.insert(key, PropValue::Literal(value));
            }
            PropOutcome::FileAsset { key, kind, name, data } => {
                let record = assets.add(data, kind, Some(name.as_ref()));
                blueprint.props.insert(
                    key,
                    PropValue::File(FileProp {
                        kind,
                        name,
                        url: record.url,
                    }),
                );
            }
        }
    }
    Ok(())
}

fn process_descriptor(descriptor: &PropDescriptor) -> Result<PropOutcome> {
    match descriptor {
        PropDescriptor::Literal { key, initial } => {
            debug!("Building prop '{key}'");
            let value = initial.clone().unwrap_or_else(|| Value::String(String::new()));
            Ok(PropOutcome::Literal { key: key.clone(), value })
        }
        PropDescriptor::File { key, source: None } => {
            debug!("Prop '{key}' has no initial value, nothing to bundle");
            Ok(PropOutcome::Skip)
        }
        PropDescriptor::File { key, source: Some(source) } => {
            debug!("Building file prop '{key}' from '{}'", source.path.display());
            let data = read_file(&source.path)?;
            Ok(PropOutcome::FileAsset {
                key: key.clone(),
                kind: source.kind,
                name: source.path.to_string_lossy().into_owned(),
                data,
            })
        }
    }
}
