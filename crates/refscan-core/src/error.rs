use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Could not open scene at path \"{path}\": {reason}")]
    SceneOpen { path: String, reason: String },

    #[error("Could not load asset at path \"{path}\": {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, RefScanError>;
