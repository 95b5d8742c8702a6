//! Assets are identified by the content of their payload. Adding raw bytes to
//! an [`AssetCollection`] computes a SHA-256 digest over the exact payload,
//! derives a MIME type and a stable `asset://` reference from the digest and
//! the semantic [`AssetKind`], and appends the result to the collection.
//!
//! The collection is append-only and preserves insertion order. Order is the
//! only correlation between the metadata records in a bundle header and the
//! payload ranges in the binary bundle, so it must survive serialization.

use std::{
    fmt::{self, Formatter},
    path::Path,
};

use hypack_shared::{
    log::{debug, warn},
    sha2::{Digest, Sha256},
};
use serde::{Deserialize, Serialize};

use crate::common::Error;

/// Semantic classification of an asset. Unknown classifications deserialize
/// to [`AssetKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Avatar,
    Model,
    Emote,
    Texture,
    Hdr,
    Audio,
    #[serde(other)]
    Other,
}

impl AssetKind {
    /// Canonical file extension of the kind. Textures inherit the extension
    /// of the original source filename, which is not re-derivable from the
    /// payload and therefore has to be supplied by the caller.
    fn extension(&self, origin: Option<&Path>) -> Option<String> {
        match self {
            AssetKind::Script => Some("js".to_owned()),
            AssetKind::Avatar => Some("vrm".to_owned()),
            AssetKind::Model | AssetKind::Emote => Some("glb".to_owned()),
            AssetKind::Hdr => Some("hdr".to_owned()),
            AssetKind::Audio => Some("mp3".to_owned()),
            AssetKind::Texture => origin_extension(origin),
            AssetKind::Other => None,
        }
    }

    /// MIME type of the kind. Everything without a more specific type is
    /// generic binary data.
    fn mime(&self, origin: Option<&Path>) -> String {
        match self {
            AssetKind::Script => "application/javascript".to_owned(),
            AssetKind::Model | AssetKind::Emote => "model/gltf-binary".to_owned(),
            AssetKind::Texture => match origin_extension(origin) {
                Some(extension) => format!("image/{extension}"),
                None => "application/octet-stream".to_owned(),
            },
            AssetKind::Avatar | AssetKind::Hdr | AssetKind::Audio | AssetKind::Other => "application/octet-stream".to_owned(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Script => "script",
            AssetKind::Avatar => "avatar",
            AssetKind::Model => "model",
            AssetKind::Emote => "emote",
            AssetKind::Texture => "texture",
            AssetKind::Hdr => "hdr",
            AssetKind::Audio => "audio",
            AssetKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

fn origin_extension(origin: Option<&Path>) -> Option<String> {
    origin?
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
}

/// One binary resource with a content-derived reference. The payload is
/// immutable once the asset is created; `size` always equals `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub kind: AssetKind,
    pub url: String,
    pub size: usize,
    pub mime: String,
    pub data: Vec<u8>,
}

impl Asset {
    /// Header-side view of the asset without the payload bytes.
    pub fn record(&self) -> AssetRecord {
        AssetRecord {
            kind: self.kind,
            url: self.url.clone(),
            size: self.size,
            mime: self.mime.clone(),
        }
    }

    /// Reassembles an asset from its header record and the payload bytes
    /// sliced out of a bundle.
    pub(crate) fn from_record(record: AssetRecord, data: Vec<u8>) -> Self {
        Self {
            kind: record.kind,
            url: record.url,
            size: record.size,
            mime: record.mime,
            data,
        }
    }
}

/// Metadata of one asset as stored in the bundle header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub url: String,
    pub size: usize,
    pub mime: String,
}

/// Ordered, append-only sequence of [`Asset`]s.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetCollection(Vec<Asset>);

impl AssetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Asset] {
        &self.0
    }

    /// Computes the content hash of `data`, resolves reference and MIME type
    /// from `kind` and appends the new [`Asset`]. Returns the metadata record
    /// of the appended asset.
    ///
    /// `origin` is the filename the payload was read from; it is only
    /// consulted for kinds whose extension cannot be fixed (textures). A kind
    /// without extension mapping is recoverable: the asset is created with an
    /// extension-less reference and a diagnostic is logged.
    ///
    /// Identical payloads are not deduplicated. Adding the same bytes twice
    /// yields two entries sharing the same reference string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hypack_bundle::asset_registry::{AssetCollection, AssetKind};
    /// let mut assets = AssetCollection::new();
    /// let record = assets.add(b"console.log(42)".to_vec(), AssetKind::Script, None);
    /// assert!(record.url.starts_with("asset://"));
    /// assert!(record.url.ends_with(".js"));
    /// assert_eq!(assets.len(), 1);
    /// ```
    pub fn add(&mut self, data: Vec<u8>, kind: AssetKind, origin: Option<&Path>) -> AssetRecord {
        let digest = hex_digest(&data);
        let url = match kind.extension(origin) {
            Some(extension) => format!("asset://{digest}.{extension}"),
            None => {
                warn!("{}", Error::UnresolvedAssetKind(kind));
                format!("asset://{digest}")
            }
        };
        let asset = Asset {
            kind,
            url,
            size: data.len(),
            mime: kind.mime(origin),
            data,
        };
        let record = asset.record();
        debug!("Added '{}' to the assets", record.url);
        self.0.push(asset);
        record
    }

    pub(crate) fn push(&mut self, asset: Asset) {
        self.0.push(asset);
    }
}

/// Lowercase hex SHA-256 digest over the exact payload bytes.
pub fn hex_digest(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        let first = hex_digest(b"payload");
        let second = hex_digest(b"payload");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn same_digest_across_kinds() {
        let mut assets = AssetCollection::new();
        let script = assets.add(b"bytes".to_vec(), AssetKind::Script, None);
        let audio = assets.add(b"bytes".to_vec(), AssetKind::Audio, None);

        let digest = hex_digest(b"bytes");
        assert_eq!(script.url, format!("asset://{digest}.js"));
        assert_eq!(audio.url, format!("asset://{digest}.mp3"));
        assert_eq!(script.mime, "application/javascript");
        assert_eq!(audio.mime, "application/octet-stream");
    }

    #[test]
    fn model_and_emote_share_extension_and_mime() {
        let mut assets = AssetCollection::new();
        let model = assets.add(b"glb".to_vec(), AssetKind::Model, None);
        let emote = assets.add(b"glb".to_vec(), AssetKind::Emote, None);
        assert!(model.url.ends_with(".glb"));
        assert!(emote.url.ends_with(".glb"));
        assert_eq!(model.mime, "model/gltf-binary");
        assert_eq!(emote.mime, "model/gltf-binary");
    }

    #[test]
    fn texture_inherits_origin_extension() {
        let mut assets = AssetCollection::new();
        let record = assets.add(b"png bytes".to_vec(), AssetKind::Texture, Some(Path::new("images/Character.PNG")));
        assert!(record.url.ends_with(".png"));
        assert_eq!(record.mime, "image/png");
    }

    #[test]
    fn unresolved_kind_is_recoverable() {
        let mut assets = AssetCollection::new();
        let record = assets.add(b"mystery".to_vec(), AssetKind::Other, None);
        assert_eq!(record.url, format!("asset://{}", hex_digest(b"mystery")));
        assert_eq!(record.mime, "application/octet-stream");
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn texture_without_origin_extension_is_recoverable() {
        let mut assets = AssetCollection::new();
        let record = assets.add(b"raw".to_vec(), AssetKind::Texture, None);
        assert_eq!(record.url, format!("asset://{}", hex_digest(b"raw")));
        assert_eq!(record.mime, "application/octet-stream");
    }

    #[test]
    fn identical_payloads_are_not_deduplicated() {
        let mut assets = AssetCollection::new();
        let first = assets.add(b"twice".to_vec(), AssetKind::Hdr, None);
        let second = assets.add(b"twice".to_vec(), AssetKind::Hdr, None);
        assert_eq!(first.url, second.url);
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn size_matches_payload_length() {
        let mut assets = AssetCollection::new();
        let record = assets.add(vec![0u8; 1234], AssetKind::Avatar, None);
        assert_eq!(record.size, 1234);
        assert_eq!(assets.as_slice()[0].data.len(), 1234);
    }

    #[test]
    fn unknown_kind_deserializes_to_other() {
        let kind: AssetKind = hypack_shared::serde_json::from_str("\"video\"").unwrap();
        assert_eq!(kind, AssetKind::Other);
    }
}
