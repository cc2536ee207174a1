use thiserror::Error;

/// Errors surfaced to callers that start or drive a reading session.
#[derive(Debug, Error)]
pub enum SpeedReadError {
    #[error("could not find content for `{0}`")]
    ContentNotFound(String),
    #[error("no content source configured")]
    NoContentSource,
    #[error("no active reading session")]
    NotActive,
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Failures reported by a [`crate::highlight::ContentHost`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("container `{0}` is not present")]
    ContainerMissing(String),
    #[error("mark no longer matches the container contents")]
    StaleMark,
}
