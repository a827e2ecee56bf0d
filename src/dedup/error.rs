use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Could not find a free name for '{0}' within the attempt cap")]
    ExhaustedRename(String),

    #[error("No duplicate candidate at index {0}")]
    UnknownCandidate(usize),
}

pub type DedupResult<T> = Result<T, DedupError>;
