use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to encode or decode store value: {0}")]
    StoreCodecError(#[from] bincode::Error),

    #[error("Failed to build internal domain model: {0}")]
    ModelConstructionError(String),

    #[error("Invalid IP prefix '{0}'")]
    InvalidPrefix(String),

    #[error("Source prefix {src} and destination prefix {dst} use different IP versions")]
    IpVersionMismatch { src: String, dst: String },

    #[error("Could not interpret '{0}' as a value with a known unit")]
    UnknownUnit(String),

    #[error("Intent was rejected by the provider: {0}")]
    IntentRejected(String),

    #[error("Intent service is not available")]
    IntentServiceUnavailable,

    #[error("Planner transport failure: {0}")]
    TransportError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
