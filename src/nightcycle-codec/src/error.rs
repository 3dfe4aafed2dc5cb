use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid monitoring json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unable to read monitoring data: {0}")]
    Io(#[from] std::io::Error),
}
