//! Domain primitive types used across the minibox workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MiniboxError, Result};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an image stored in the images directory.
///
/// Names map directly onto paths (`<name>.tar`, `<name>/rootfs`), so they
/// must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageName(String);

impl ImageName {
    /// Validates and wraps an image name.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Config`] if the name is empty, contains a
    /// path separator or NUL byte, or is `.` / `..`.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(MiniboxError::Config {
                message: format!("invalid image name: {name:?}"),
            });
        }
        Ok(Self(name))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ImageName {
    fn default() -> Self {
        Self(crate::constants::DEFAULT_IMAGE_NAME.to_owned())
    }
}

impl TryFrom<String> for ImageName {
    type Error = MiniboxError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<ImageName> for String {
    fn from(name: ImageName) -> Self {
        name.0
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered steps of entering a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainmentStep {
    /// Create a private mount namespace.
    Unshare,
    /// Stop mount propagation to and from the host.
    IsolatePropagation,
    /// Materialize the image and mount the overlay.
    BuildRoot,
    /// Mount pseudo-filesystems and create device entries.
    Populate,
    /// Create the directory receiving the old root.
    PrepareSwitch,
    /// Swap the root mount.
    Pivot,
    /// Move the working directory onto the new root.
    Chdir,
    /// Detach and remove the old root.
    DetachOldRoot,
    /// Replace the process image with the target program.
    Exec,
}

impl fmt::Display for ContainmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unshare => "unshare",
            Self::IsolatePropagation => "isolate-propagation",
            Self::BuildRoot => "build-root",
            Self::Populate => "populate",
            Self::PrepareSwitch => "prepare-switch",
            Self::Pivot => "pivot",
            Self::Chdir => "chdir",
            Self::DetachOldRoot => "detach-old-root",
            Self::Exec => "exec",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_container_ids_are_unique() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn image_name_accepts_plain_names() {
        let name = ImageName::parse("ubuntu-22.04").unwrap();
        assert_eq!(name.as_str(), "ubuntu-22.04");
    }

    #[test]
    fn image_name_rejects_path_like_names() {
        for bad in ["", ".", "..", "../etc", "a/b", "nul\0"] {
            assert!(ImageName::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn image_name_deserialization_validates() {
        let ok: ImageName = serde_json::from_str("\"busybox\"").unwrap();
        assert_eq!(ok.as_str(), "busybox");
        assert!(serde_json::from_str::<ImageName>("\"../x\"").is_err());
    }
}
