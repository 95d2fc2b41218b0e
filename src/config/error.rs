//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading a machine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the layout
    #[error("Failed to parse machine configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration version is not supported by this version
    #[error("Unsupported configuration version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The document parsed but describes an unusable machine
    #[error("Invalid machine configuration: {0}")]
    Invalid(String),
}
