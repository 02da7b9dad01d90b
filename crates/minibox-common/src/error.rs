//! Unified error types for the minibox workspace.
//!
//! Kernel-facing code returns raw `std::io::Error`s; the domain layer
//! classifies them into the variants below so a failed containment attempt
//! can be reported with its full cause chain.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ContainmentStep;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MiniboxError {
    /// An I/O operation failed.
    #[error("I/O error at {}", path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// No archive exists for the requested image.
    #[error("unable to locate image {name} (looked for {})", path.display())]
    ImageNotFound {
        /// Requested image name.
        name: String,
        /// Archive path that was expected.
        path: PathBuf,
    },

    /// Reading or unpacking an image archive failed.
    #[error("failed to extract {}", archive.display())]
    Extraction {
        /// Archive being extracted.
        archive: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A `mount(2)` call was rejected.
    #[error("failed to mount {fstype} at {}", target.display())]
    Mount {
        /// Filesystem type, or the kind of mount change requested.
        fstype: String,
        /// Mount point.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Creating or configuring a namespace failed.
    #[error("namespace operation `{operation}` failed")]
    Namespace {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Switching or detaching the root filesystem failed.
    #[error("failed to switch root to {}", new_root.display())]
    Pivot {
        /// Root the process was switching to.
        new_root: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Creating a device node or device symlink failed.
    #[error("failed to create device entry {}", path.display())]
    DeviceCreation {
        /// Device path.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Replacing the process image with the target program failed.
    #[error("failed to exec {program}")]
    Exec {
        /// Program that could not be executed.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Forking or waiting for the container process failed.
    #[error("process operation `{operation}` failed")]
    Process {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Populating the container root failed.
    #[error("failed to populate root environment at {}", root.display())]
    Populate {
        /// Root being populated.
        root: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<MiniboxError>,
    },

    /// A containment step failed before the target program was executed.
    #[error("containment failed at step `{step}`")]
    Containment {
        /// Step that failed.
        step: ContainmentStep,
        /// Underlying failure.
        #[source]
        source: Box<MiniboxError>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl MiniboxError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Renders this error followed by every error in its source chain.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            rendered.push_str("\n  caused by: ");
            rendered.push_str(&err.to_string());
            cause = err.source();
        }
        rendered
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MiniboxError>;
