use analysis_core::FetchFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MLError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type MLResult<T> = Result<T, MLError>;

impl From<MLError> for FetchFailure {
    fn from(err: MLError) -> Self {
        match err {
            MLError::RequestFailed(e) => match e.status() {
                Some(status) => FetchFailure::Http {
                    status: status.as_u16(),
                    message: e.to_string(),
                },
                None => FetchFailure::Transport(e.to_string()),
            },
            MLError::ServiceUnavailable(msg) => FetchFailure::Transport(msg),
            MLError::InvalidResponse(msg) => FetchFailure::Parse(msg),
            MLError::Serialization(e) => FetchFailure::Parse(e.to_string()),
        }
    }
}
