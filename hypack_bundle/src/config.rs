//! Flat JSON description of a project: the declared blueprint metadata plus
//! the paths the build pipeline reads its inputs from. The surrounding tool
//! loads and saves this file; the pipeline only consumes the loaded value.

use std::{
    fs,
    path::{Path, PathBuf},
};

use hypack_shared::serde_json;
use serde::{Deserialize, Serialize};

use crate::common::{read_file, Error, Result};

/// Name of the project configuration file in the project directory.
pub const PROJECT_CONFIG_FILENAME: &str = "approllup.json";

/// Identity and descriptive metadata of the project being packaged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub id: String,
    pub name: String,
    pub version: i32,
    pub author: String,
    pub url: String,
    pub desc: String,
    pub model: PathBuf,

    pub preload: bool,
    pub public: bool,
    pub unique: bool,
}

/// Project configuration consumed by the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub data: ProjectMeta,
    pub app_version: String,
    pub script_path: PathBuf,
    pub assets_path: PathBuf,
    pub props_path: PathBuf,
}

impl ProjectConfig {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let blob = read_file(path)?;
        serde_json::from_slice(&blob).map_err(Error::MalformedConfig)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(Error::MalformedConfig)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Default configuration for a freshly initialized project with the
    /// given identifier.
    pub fn template(id: String) -> Self {
        Self {
            data: ProjectMeta {
                id,
                name: "my-app-project".to_owned(),
                version: 1,
                author: "Your Name".to_owned(),
                url: "https://example.com".to_owned(),
                desc: "A new app project".to_owned(),
                model: PathBuf::from("./assets/model.glb"),
                preload: false,
                public: false,
                unique: true,
            },
            app_version: "v1.0.0".to_owned(),
            script_path: PathBuf::from("./dist/main.bundle.js"),
            assets_path: PathBuf::from("./assets"),
            props_path: PathBuf::from("./props/props.json"),
        }
    }
}
