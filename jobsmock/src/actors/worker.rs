use crate::errors;
use crate::job::JobRecord;
use crate::runner::{CommandRunner, RunOutput};
use std::io;
use tokio::sync::{mpsc, oneshot};

/// Sent back to the registry once a run's process has ended.
pub struct Completion {
    /// Record as it was when the run began.
    pub snapshot: JobRecord,
    /// Generation of the record the run was started for.
    pub generation: u64,
    pub result: io::Result<RunOutput>,
    pub response: oneshot::Sender<errors::Result<JobRecord>>,
}

/// Launch `snapshot`'s command on its own task.
///
/// The run is detached from whoever asked for it: the completion is always reported, even if the
/// caller stopped waiting.
pub fn spawn(
    runner: &dyn CommandRunner,
    snapshot: JobRecord,
    generation: u64,
    response: oneshot::Sender<errors::Result<JobRecord>>,
    completion_tx: mpsc::UnboundedSender<Completion>,
) {
    let run = runner.run(snapshot.invocation());
    tokio::spawn(async move {
        let result = run.await;
        let _ = completion_tx.send(Completion {
            snapshot,
            generation,
            result,
            response,
        });
    });
}
