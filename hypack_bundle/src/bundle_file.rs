//! Bundles are written in a custom format that contains a metadata header
//! and the raw asset payloads.
//!
//! ## Overview
//!
//! The header is a UTF-8 JSON document describing the blueprint and one
//! metadata record per asset. It is preceded by its own length so that the
//! payload region can be located without parsing.
//!
//! | Field         | Type   | Size (bytes) | Description                           |
//! |---------------|--------|--------------|---------------------------------------|
//! | Header length | u32    | 4            | Length of the JSON header document    |
//! | Header        | u8[]   | variable     | UTF-8 JSON: blueprint + asset records |
//! | Payloads      | u8[]   | variable     | Asset bytes, in header record order   |
//!
//! All integers are little-endian. The payload region is the concatenation
//! of every asset's raw bytes in exactly the order of the header's asset
//! records, each occupying as many bytes as its declared size. Bytes after
//! the last declared asset are tolerated and ignored when decoding.

use hypack_shared::{
    byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt},
    log::trace,
    serde_json,
};

use crate::{
    asset_registry::{Asset, AssetCollection},
    blueprint::{Blueprint, BundleHeader},
    common::{Error, Result},
};

/// File extension of a serialized bundle.
pub const BUNDLE_EXTENSION: &str = "hyp";

/// Filename that is suggested when the blueprint has no name.
pub const FALLBACK_FILENAME: &str = "app.hyp";

/// Builds the header document for a blueprint and an asset collection, as it
/// would be written at the beginning of a bundle.
pub fn header(blueprint: &Blueprint, assets: &AssetCollection) -> BundleHeader {
    BundleHeader {
        blueprint: Some(blueprint.clone()),
        assets: assets.iter().map(Asset::record).collect(),
        meta: None,
    }
}

/// Serializes the blueprint and the asset collection into a single bundle
/// blob and suggests a filename for it.
///
/// The locked ⇒ frozen invariant is enforced on the blueprint before it is
/// serialized. The output is deterministic for deterministic input ordering.
///
/// # Example
///
/// ```rust
/// use hypack_bundle::{asset_registry::AssetCollection, bundle_file};
/// # use std::collections::BTreeMap;
/// # use hypack_bundle::blueprint::Blueprint;
/// # let mut blueprint = Blueprint {
/// #     id: "a".to_owned(), version: 1, name: "demo".to_owned(), image: None,
/// #     author: String::new(), url: String::new(), desc: String::new(),
/// #     model: String::new(), script: String::new(), props: BTreeMap::new(),
/// #     preload: false, public: false, locked: false, unique: false, frozen: false,
/// # };
/// let assets = AssetCollection::new();
/// let (blob, filename) = bundle_file::export(&mut blueprint, &assets).unwrap();
/// assert_eq!(filename, "demo.hyp");
/// let (decoded, _) = bundle_file::import(&blob).unwrap();
/// assert_eq!(decoded, blueprint);
/// ```
pub fn export(blueprint: &mut Blueprint, assets: &AssetCollection) -> Result<(Vec<u8>, String)> {
    blueprint.enforce_frozen();

    let filename = if blueprint.name.is_empty() {
        FALLBACK_FILENAME.to_owned()
    } else {
        format!("{}.{BUNDLE_EXTENSION}", blueprint.name)
    };

    let header = header(blueprint, assets);
    let header_bytes = serde_json::to_vec(&header).map_err(Error::MalformedHeader)?;

    let payload_len = assets.iter().map(|asset| asset.data.len()).sum::<usize>();
    let mut blob = Vec::with_capacity(4 + header_bytes.len() + payload_len);
    blob.write_u32::<LittleEndian>(header_bytes.len() as u32)?;
    blob.extend_from_slice(&header_bytes);
    for asset in assets.iter() {
        trace!("Bundling '{}'", asset.url);
        blob.extend_from_slice(&asset.data);
    }

    Ok((blob, filename))
}

/// Decodes a bundle blob back into its blueprint and asset collection.
///
/// Fails with [`Error::MalformedBundle`] when the length prefix is missing
/// or the declared header length exceeds the blob, with
/// [`Error::MalformedHeader`] when the header document cannot be decoded,
/// with [`Error::MissingBlueprint`] when the header carries no blueprint and
/// with [`Error::TruncatedAssetData`] when an asset's declared size exceeds
/// the remaining payload bytes.
pub fn import(blob: &[u8]) -> Result<(Blueprint, AssetCollection)> {
    if blob.len() < 4 {
        return Err(Error::MalformedBundle);
    }

    let header_len = (&blob[..4]).read_u32::<LittleEndian>().map_err(|_| Error::MalformedBundle)? as usize;
    if blob.len() < 4 + header_len {
        return Err(Error::MalformedBundle);
    }

    let header: BundleHeader = serde_json::from_slice(&blob[4..4 + header_len]).map_err(Error::MalformedHeader)?;
    let blueprint = header.blueprint.ok_or(Error::MissingBlueprint)?;

    let mut assets = AssetCollection::new();
    let mut cursor = 4 + header_len;
    for record in header.assets {
        let remaining = blob.len() - cursor;
        if record.size > remaining {
            return Err(Error::TruncatedAssetData {
                url: record.url,
                declared: record.size,
                remaining,
            });
        }
        let data = blob[cursor..cursor + record.size].to_vec();
        cursor += record.size;
        assets.push(Asset::from_record(record, data));
    }

    // Trailing bytes after the last declared asset are ignored.
    Ok((blueprint, assets))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hypack_shared::byteorder::{LittleEndian, WriteBytesExt};

    use super::*;
    use crate::{
        asset_registry::AssetKind,
        blueprint::{FileProp, PropValue},
    };

    fn blueprint() -> Blueprint {
        Blueprint {
            id: "x9y8z7w6v5".to_owned(),
            version: 3,
            name: "sample".to_owned(),
            image: None,
            author: "author".to_owned(),
            url: "https://example.com".to_owned(),
            desc: "sample app".to_owned(),
            model: String::new(),
            script: String::new(),
            props: BTreeMap::new(),
            preload: true,
            public: false,
            locked: false,
            unique: true,
            frozen: false,
        }
    }

    fn blob_with_header(header_json: &str) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.write_u32::<LittleEndian>(header_json.len() as u32).unwrap();
        blob.extend_from_slice(header_json.as_bytes());
        blob
    }

    #[test]
    fn round_trip() {
        // Given
        let mut assets = AssetCollection::new();
        let script = assets.add(b"console.log(1)".to_vec(), AssetKind::Script, None);
        let model = assets.add(b"model bytes".to_vec(), AssetKind::Model, None);
        let texture = assets.add(b"texture bytes".to_vec(), AssetKind::Texture, Some(std::path::Path::new("skin.png")));

        let mut blueprint = blueprint();
        blueprint.script = script.url.clone();
        blueprint.model = model.url.clone();
        blueprint.props.insert(
            "skin".to_owned(),
            PropValue::File(FileProp {
                kind: AssetKind::Texture,
                name: "skin.png".to_owned(),
                url: texture.url.clone(),
            }),
        );
        blueprint.props.insert(
            "speed".to_owned(),
            PropValue::Literal(serde_json::json!(4.5)),
        );

        // When
        let (blob, filename) = export(&mut blueprint, &assets).unwrap();
        let (decoded_blueprint, decoded_assets) = import(&blob).unwrap();

        // Then
        assert_eq!(filename, "sample.hyp");
        assert_eq!(decoded_blueprint, blueprint);
        assert_eq!(decoded_assets, assets);
    }

    #[test]
    fn round_trip_preserves_duplicate_assets() {
        // Given
        let mut assets = AssetCollection::new();
        assets.add(b"same bytes".to_vec(), AssetKind::Audio, None);
        assets.add(b"same bytes".to_vec(), AssetKind::Audio, None);
        let mut blueprint = blueprint();

        // When
        let (blob, _) = export(&mut blueprint, &assets).unwrap();
        let (_, decoded_assets) = import(&blob).unwrap();

        // Then
        assert_eq!(decoded_assets.len(), 2);
        assert_eq!(decoded_assets, assets);
    }

    #[test]
    fn export_applies_locked_frozen_invariant() {
        let mut blueprint = blueprint();
        blueprint.locked = true;
        let (blob, _) = export(&mut blueprint, &AssetCollection::new()).unwrap();

        assert!(blueprint.frozen);
        let (decoded, _) = import(&blob).unwrap();
        assert!(decoded.frozen);
    }

    #[test]
    fn export_without_assets_has_no_payload_region() {
        let mut blueprint = blueprint();
        let (blob, _) = export(&mut blueprint, &AssetCollection::new()).unwrap();

        let header_len = u32::from_le_bytes(blob[..4].try_into().unwrap()) as usize;
        assert_eq!(blob.len(), 4 + header_len);
    }

    #[test]
    fn export_falls_back_to_generic_filename() {
        let mut blueprint = blueprint();
        blueprint.name = String::new();
        let (_, filename) = export(&mut blueprint, &AssetCollection::new()).unwrap();
        assert_eq!(filename, FALLBACK_FILENAME);
    }

    #[test]
    fn export_is_deterministic() {
        let mut assets = AssetCollection::new();
        assets.add(b"payload".to_vec(), AssetKind::Script, None);
        let first = export(&mut blueprint(), &assets).unwrap();
        let second = export(&mut blueprint(), &assets).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn import_fails_without_length_prefix() {
        assert!(matches!(import(&[]), Err(Error::MalformedBundle)));
        assert!(matches!(import(&[1, 2, 3]), Err(Error::MalformedBundle)));
    }

    #[test]
    fn import_fails_when_header_length_exceeds_blob() {
        let mut blob = Vec::new();
        blob.write_u32::<LittleEndian>(100).unwrap();
        blob.extend_from_slice(b"short");
        assert!(matches!(import(&blob), Err(Error::MalformedBundle)));
    }

    #[test]
    fn import_fails_on_undecodable_header() {
        let blob = blob_with_header("not json at all");
        assert!(matches!(import(&blob), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn import_fails_without_blueprint() {
        let blob = blob_with_header(r#"{"assets":[]}"#);
        assert!(matches!(import(&blob), Err(Error::MissingBlueprint)));
    }

    #[test]
    fn import_fails_on_truncated_asset_data() {
        // Given a header that declares more payload bytes than the blob has
        let mut assets = AssetCollection::new();
        assets.add(vec![7u8; 32], AssetKind::Hdr, None);
        let (blob, _) = export(&mut blueprint(), &assets).unwrap();

        // When the payload region is cut short
        let truncated = &blob[..blob.len() - 1];

        // Then
        assert!(matches!(import(truncated), Err(Error::TruncatedAssetData { .. })));
    }

    #[test]
    fn import_tolerates_trailing_bytes() {
        let mut assets = AssetCollection::new();
        assets.add(b"data".to_vec(), AssetKind::Audio, None);
        let (mut blob, _) = export(&mut blueprint(), &assets).unwrap();
        blob.extend_from_slice(b"padding that nobody declared");

        let (_, decoded_assets) = import(&blob).unwrap();
        assert_eq!(decoded_assets, assets);
    }
}
