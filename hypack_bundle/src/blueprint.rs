use std::collections::BTreeMap;

use hypack_shared::serde_json;
use serde::{Deserialize, Serialize};

use crate::asset_registry::{AssetKind, AssetRecord};

/// Metadata record describing one packaged app.
///
/// The field order matches the order in which the fields appear in the
/// encoded bundle header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub version: i32,
    pub name: String,
    pub image: Option<FileProp>,
    pub author: String,
    pub url: String,
    pub desc: String,
    pub model: String,
    pub script: String,
    pub props: BTreeMap<String, PropValue>,

    pub preload: bool,
    pub public: bool,
    pub locked: bool,
    pub unique: bool,
    pub frozen: bool,
}

impl Blueprint {
    /// Locked blueprints are always frozen; frozen is force-set whenever
    /// locked is set, never the other way around.
    pub fn enforce_frozen(&mut self) {
        if self.locked {
            self.frozen = true;
        }
    }
}

/// Structured property value referencing a bundled file asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProp {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub name: String,
    pub url: String,
}

/// Value of one entry in the open-ended properties mapping of a
/// [`Blueprint`]: either a [`FileProp`] record or any literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    File(FileProp),
    Literal(serde_json::Value),
}

/// Auxiliary bundle metadata used for debugging and export only; decoding a
/// bundle never requires it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMeta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_mods: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_map: BTreeMap<String, String>,
}

/// The metadata document stored at the beginning of a bundle: the blueprint
/// plus one [`AssetRecord`] per asset, payloads excluded.
///
/// The blueprint is optional only so that decoding can distinguish a header
/// without blueprint data from an undecodable header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleHeader {
    pub blueprint: Option<Blueprint>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BundleMeta>,
}
