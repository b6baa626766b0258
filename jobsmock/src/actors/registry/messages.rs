use crate::errors;
use crate::job::{CreateJobRequest, JobRecord, ListJobsRequest};
use crate::types::{JobId, Program};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum RegistryMessage {
    CreateJob {
        request: CreateJobRequest,
        response: oneshot::Sender<JobRecord>,
    },
    RunJob {
        job_id: JobId,
        response: oneshot::Sender<errors::Result<JobRecord>>,
    },
    GetJob {
        job_id: JobId,
        response: oneshot::Sender<Option<JobRecord>>,
    },
    ListJobs {
        request: ListJobsRequest,
        response: oneshot::Sender<Vec<JobRecord>>,
    },
    UpdateJob {
        job_id: JobId,
        command: Program,
        response: oneshot::Sender<errors::Result<JobRecord>>,
    },
    DeleteJob {
        job_id: JobId,
        response: oneshot::Sender<errors::Result<()>>,
    },
}
