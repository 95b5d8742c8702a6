use std::{fs, io, path::Path, path::PathBuf, result};

use hypack_shared::{serde_json, thiserror};

use crate::asset_registry::AssetKind;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bundle data is missing the header length prefix")]
    MalformedBundle,
    #[error("Failed to decode the bundle header: {0}")]
    MalformedHeader(serde_json::Error),
    #[error("Bundle header contains no blueprint")]
    MissingBlueprint,
    #[error("Asset '{url}' declares {declared} bytes but only {remaining} remain")]
    TruncatedAssetData { url: String, declared: usize, remaining: usize },
    #[error("Failed to decode the property descriptor list: {0}")]
    MalformedDescriptorList(serde_json::Error),
    #[error("Property descriptor {index} is missing the required field '{field}'")]
    MissingDescriptorField { index: usize, field: &'static str },
    #[error("Initial value of file property '{key}' must be a string path")]
    InvalidFileInitial { key: String },
    #[error("No extension mapping for asset kind '{0}'")]
    UnresolvedAssetKind(AssetKind),
    #[error("Failed to decode the project configuration: {0}")]
    MalformedConfig(serde_json::Error),
    #[error("Failed to start property worker thread")]
    FailedToStartWorker,
    #[error("Failed to read '{}': {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
}

/// Reads a file and attaches the path to the error.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::ReadFailed {
        path: path.to_owned(),
        source,
    })
}
