use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Destination collision found at guard time. Distinguished from
    /// transport failures so callers can present it differently.
    #[error("File '{0}' already exists at the destination")]
    AlreadyExists(String),

    /// Cancellation fired. Never reported to the user as an error.
    #[error("Transfer aborted")]
    Aborted,

    #[error("Remote error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
