use std::path::PathBuf;
use thiserror::Error;

/// Error kinds for configuration loading and collaborator calls.
///
/// The three `Config*` variants are distinct so callers can report which
/// provider's configuration failed and how; the collaborator variants carry
/// the service name and the failing operation.
#[derive(Debug, Error)]
pub enum CloudstrapError {
    #[error("no configuration resource for provider '{provider}' (looked for {})", path.display())]
    ConfigResourceMissing { provider: String, path: PathBuf },

    #[error("configuration for provider '{provider}' is missing required key '{key}'")]
    ConfigKeyMissing { provider: String, key: String },

    #[error("cannot read file '{}' referenced by key '{key}': {source}", path.display())]
    ConfigFileUnreadable {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {service}: {reason}")]
    Connection { service: String, reason: String },

    #[error("{service}: {operation} failed: {reason}")]
    Operation {
        service: String,
        operation: String,
        reason: String,
    },
}

impl CloudstrapError {
    pub fn connection(service: &str, reason: impl std::fmt::Display) -> Self {
        CloudstrapError::Connection {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn operation(service: &str, operation: &str, reason: impl std::fmt::Display) -> Self {
        CloudstrapError::Operation {
            service: service.to_string(),
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}
