use crate::types::JobId;
use std::result;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Job with ID {0} not found")]
    NotFound(JobId),
    /// The registry task is gone, so nothing can answer the request.
    #[error("Job registry exited")]
    RegistryExited,
}

pub type Result<T> = result::Result<T, JobError>;
