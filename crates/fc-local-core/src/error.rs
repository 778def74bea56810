use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("runtime {0} is not supported")]
    UnsupportedRuntime(String),

    #[error("invalid function descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("failed to unpack code: {0}")]
    UnpackError(String),

    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("no free port at or above {0}")]
    NoFreePort(u16),

    #[error("command failed with code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}
