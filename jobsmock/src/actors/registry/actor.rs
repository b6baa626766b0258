use super::messages::RegistryMessage;
use crate::actors::worker::{self, Completion};
use crate::errors::{self, JobError};
use crate::job::{CreateJobRequest, JobRecord, ListJobsRequest};
use crate::runner::CommandRunner;
use crate::status::JobStatus;
use crate::types::{JobId, Program};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// A stored record plus the generation stamped when it was created.
///
/// Recreating an id bumps the generation, so a run started for the old record can't finish into
/// the new one.
struct Entry {
    generation: u64,
    record: JobRecord,
}

pub struct JobRegistry {
    inbox: mpsc::Receiver<RegistryMessage>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    jobs: HashMap<JobId, Entry>,
    next_generation: u64,
    runner: Arc<dyn CommandRunner>,
    creator: String,
}

impl JobRegistry {
    pub fn spawn(
        inbox: mpsc::Receiver<RegistryMessage>,
        runner: Arc<dyn CommandRunner>,
        creator: String,
    ) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let actor = Self {
            inbox,
            completion_tx,
            completion_rx,
            jobs: HashMap::new(),
            next_generation: 0,
            runner,
            creator,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::RegistryMessage::*;
        loop {
            select! {
                maybe_msg = self.inbox.recv() => {
                    // every handle dropped: tear the table down with the task
                    let msg = match maybe_msg {
                        Some(msg) => msg,
                        None => break,
                    };
                    match msg {
                        CreateJob { request, response } => {
                            let _ = response.send(self.create_job(request));
                        }
                        RunJob { job_id, response } => self.run_job(job_id, response),
                        GetJob { job_id, response } => {
                            let _ = response.send(self.get_job(&job_id));
                        }
                        ListJobs { request, response } => {
                            let _ = response.send(self.list_jobs(request));
                        }
                        UpdateJob { job_id, command, response } => {
                            let _ = response.send(self.update_job(&job_id, command));
                        }
                        DeleteJob { job_id, response } => {
                            let _ = response.send(self.delete_job(&job_id));
                        }
                    }
                }
                Some(completion) = self.completion_rx.recv() => self.finish_run(completion),
            }
        }
        debug!(jobs = self.jobs.len(), "job registry shut down");
    }

    fn create_job(&mut self, request: CreateJobRequest) -> JobRecord {
        let record = JobRecord::new(request, &self.creator);
        let entry = Entry {
            generation: self.next_generation,
            record: record.clone(),
        };
        self.next_generation += 1;
        let replaced = self
            .jobs
            .insert(record.identifier.clone(), entry)
            .is_some();
        info!(
            job_id = %record.identifier,
            command = %record.command,
            replaced,
            "created job"
        );
        record
    }

    fn run_job(&mut self, job_id: JobId, response: oneshot::Sender<errors::Result<JobRecord>>) {
        let Entry { generation, record } = match self.jobs.get_mut(&job_id) {
            Some(entry) => entry,
            None => {
                let _ = response.send(Err(JobError::NotFound(job_id)));
                return;
            }
        };
        record.begin_run();
        info!(
            job_id = %job_id,
            command = %record.command,
            execution = record.execution_count,
            "running job"
        );
        worker::spawn(
            self.runner.as_ref(),
            record.clone(),
            *generation,
            response,
            self.completion_tx.clone(),
        );
    }

    fn finish_run(&mut self, completion: Completion) {
        let Completion {
            snapshot,
            generation,
            result,
            response,
        } = completion;
        let record = match self.jobs.get_mut(&snapshot.identifier) {
            Some(entry) if entry.generation == generation => {
                entry.record.finish_run(result);
                entry.record.clone()
            }
            _ => {
                debug!(job_id = %snapshot.identifier, "job deleted or replaced while running");
                let mut record = snapshot;
                record.finish_run(result);
                record
            }
        };
        debug_assert!(record.status.is_finished());
        if record.status == JobStatus::Completed {
            info!(job_id = %record.identifier, status = %record.status, "job finished");
        } else {
            warn!(
                job_id = %record.identifier,
                status = %record.status,
                output = record.output.as_deref().unwrap_or_default(),
                "job failed"
            );
        }
        let _ = response.send(Ok(record));
    }

    fn get_job(&self, job_id: &str) -> Option<JobRecord> {
        debug!(job_id, "get job");
        self.jobs.get(job_id).map(|entry| entry.record.clone())
    }

    fn list_jobs(&self, request: ListJobsRequest) -> Vec<JobRecord> {
        debug!(?request, jobs = self.jobs.len(), "list jobs");
        self.jobs
            .values()
            .map(|entry| entry.record.clone())
            .collect()
    }

    fn update_job(&mut self, job_id: &str, command: Program) -> errors::Result<JobRecord> {
        let record = &mut self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?
            .record;
        record.update_command(command);
        debug!(job_id, command = %record.command, "updated job");
        Ok(record.clone())
    }

    fn delete_job(&mut self, job_id: &str) -> errors::Result<()> {
        self.jobs
            .remove(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        debug!(job_id, "deleted job");
        Ok(())
    }
}
