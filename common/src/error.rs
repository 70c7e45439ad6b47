use thiserror::Error;

/// Error produced while loading or validating ambient configuration
/// (CLI flags, log paths) shared by every binary in the workspace.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
