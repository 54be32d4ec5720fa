//! Error taxonomy for package lookup and icon resolution.
//!
//! Identifier-level problems (bad `package:icon` strings, unknown icon names)
//! are absorbed by batch callers. Package-level problems (missing file,
//! undecodable file, unregistered namespace) are raised to the direct caller
//! of the finder or repository.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = IconifyError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IconifyError {
    /// Malformed identifier: missing separator or an empty segment.
    #[error("invalid identifier [{identifier}]: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// No package file under any registered path and extension.
    #[error(
        "package [{package}] not found in any registered paths; check name, extensions, and hint configuration"
    )]
    NotFound { package: String },

    /// A namespaced lookup named a namespace with no hint directories.
    #[error("no hint paths registered for namespace [{namespace}]")]
    NoHintPaths { namespace: String },

    /// The package file exists but is not a valid icon set.
    #[error("unable to decode package [{package}] from {}: {source}", path.display())]
    Decode {
        package: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IconifyError {
    pub(crate) fn invalid_identifier(identifier: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(package: &str) -> Self {
        Self::NotFound {
            package: package.to_string(),
        }
    }

    /// True for failures scoped to a whole package rather than one identifier.
    pub fn is_package_level(&self) -> bool {
        !matches!(self, Self::InvalidIdentifier { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
