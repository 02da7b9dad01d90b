//! Runtime configuration model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CONTAINERS_DIR, DEFAULT_IMAGES_DIR};
use crate::error::{MiniboxError, Result};
use crate::types::ImageName;

/// Where images and containers live, and which image to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding `<image>.tar` archives and their extracted trees.
    pub images_dir: PathBuf,
    /// Directory holding `overlay/<container-id>/{upper,work,merged}`.
    pub containers_dir: PathBuf,
    /// Image used as the container's read-only base layer.
    pub image_name: ImageName,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            containers_dir: PathBuf::from(DEFAULT_CONTAINERS_DIR),
            image_name: ImageName::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MiniboxError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}
