use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Destination rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::TransportFailure(err.to_string())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
