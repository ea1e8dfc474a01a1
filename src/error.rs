use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(
        "can't map '{model}' to a supported AWS model ID; make sure you are requesting a Mistral model supported by Amazon Bedrock"
    )]
    UnsupportedModel { model: String },
    #[error("request signing failed: {0}")]
    Signing(String),
    #[error("admission wait for '{key}' exceeded {waited_ms}ms")]
    QueueTimeout { key: String, waited_ms: u64 },
    #[error("backend error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected backend response shape: {0}")]
    UnexpectedBackendShape(String),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
