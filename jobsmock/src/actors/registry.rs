mod actor;
mod messages;

use self::{
    actor::JobRegistry,
    messages::RegistryMessage::{self, CreateJob, DeleteJob, GetJob, ListJobs, RunJob, UpdateJob},
};
use crate::config::RegistryConfig;
use crate::errors::{self, JobError};
use crate::job::{CreateJobRequest, JobRecord, ListJobsRequest};
use crate::runner::{CommandRunner, LocalRunner};
use crate::types::Program;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A `JobRegistry` which stores job records and runs their commands.
///
/// This struct is an actor handle: the table lives in a task spawned by `JobRegistryHandle::spawn`
/// and every method is a message round-trip to it. Handles can be cloned freely and shared
/// between tasks. Each spawned registry owns an independent table, which is dropped once the
/// last handle goes away.
#[derive(Clone)]
pub struct JobRegistryHandle {
    sender: mpsc::Sender<RegistryMessage>,
}

impl JobRegistryHandle {
    /// Spawn a registry that runs jobs as local subprocesses.
    pub fn spawn(config: RegistryConfig) -> Self {
        Self::with_runner(config, LocalRunner::new())
    }

    /// Spawn a registry that hands every run to `runner`.
    pub fn with_runner(config: RegistryConfig, runner: impl CommandRunner) -> Self {
        let (sender, receiver) = mpsc::channel(config.message_capacity.max(1));
        JobRegistry::spawn(receiver, Arc::new(runner), config.creator);
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: impl FnOnce(oneshot::Sender<T>) -> RegistryMessage,
    ) -> errors::Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(msg(tx))
            .await
            .map_err(|_| JobError::RegistryExited)?;
        rx.await.map_err(|_| JobError::RegistryExited)
    }

    /// Register a job with status `Created`. An existing job with the same id is replaced.
    pub async fn create_job(&self, request: CreateJobRequest) -> errors::Result<JobRecord> {
        self.request(|response| CreateJob { request, response })
            .await
    }

    /// Run a job's command and wait for it to exit.
    ///
    /// The returned record is `Completed` or `Failed`; a failing command is not an error here.
    pub async fn run_job(&self, job_id: &str) -> errors::Result<JobRecord> {
        self.request(|response| RunJob {
            job_id: job_id.to_string(),
            response,
        })
        .await?
    }

    /// Look up a job. A missing job is `Ok(None)`.
    pub async fn get_job(&self, job_id: &str) -> errors::Result<Option<JobRecord>> {
        self.request(|response| GetJob {
            job_id: job_id.to_string(),
            response,
        })
        .await
    }

    /// Every registered job, in no particular order. The request's filters are ignored.
    pub async fn list_jobs(&self, request: ListJobsRequest) -> errors::Result<Vec<JobRecord>> {
        self.request(|response| ListJobs { request, response })
            .await
    }

    /// Replace a job's command and mark it `Updated`.
    pub async fn update_job(
        &self,
        job_id: &str,
        command: impl Into<Program>,
    ) -> errors::Result<JobRecord> {
        let command = command.into();
        self.request(|response| UpdateJob {
            job_id: job_id.to_string(),
            command,
            response,
        })
        .await?
    }

    pub async fn delete_job(&self, job_id: &str) -> errors::Result<()> {
        self.request(|response| DeleteJob {
            job_id: job_id.to_string(),
            response,
        })
        .await?
    }
}
