use jobsmock::{
    CreateJobRequest, JobRecord, JobRegistry, JobStatus, ListJobsRequest, LocalRunner,
    RegistryConfig,
};
use std::error;
use std::path::Path;
use tracing::info;

type CliResult<T> = Result<T, Box<dyn error::Error>>;

/// Drives a private, in-process registry and prints what it returns.
pub struct LocalCli {
    registry: JobRegistry,
    json: bool,
}

impl LocalCli {
    pub fn new(config: RegistryConfig, shell: bool, json: bool) -> Self {
        let runner = if shell {
            LocalRunner::shell()
        } else {
            LocalRunner::new()
        };
        Self {
            registry: JobRegistry::with_runner(config, runner),
            json,
        }
    }

    /// Create and run a single job. Returns whether it completed.
    pub async fn run_one(&self, request: CreateJobRequest) -> CliResult<bool> {
        let job = self.registry.create_job(request).await?;
        info!(job_id = %job.identifier, "created job");
        let record = self.registry.run_job(&job.identifier).await?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else if let Some(output) = &record.output {
            print!("{}", output);
        }
        Ok(record.status == JobStatus::Completed)
    }

    /// Create every job in `path`, run them concurrently, then print a summary of the registry.
    /// Returns whether every job completed.
    pub async fn run_batch(&self, path: &Path) -> CliResult<bool> {
        let contents = tokio::fs::read_to_string(path).await?;
        let requests: Vec<CreateJobRequest> = serde_json::from_str(&contents)?;

        let mut ids = Vec::with_capacity(requests.len());
        for request in requests {
            ids.push(self.registry.create_job(request).await?.identifier);
        }

        let runs: Vec<_> = ids
            .into_iter()
            .map(|job_id| {
                let registry = self.registry.clone();
                tokio::spawn(async move { registry.run_job(&job_id).await })
            })
            .collect();
        for run in runs {
            run.await??;
        }

        let mut records = self.registry.list_jobs(ListJobsRequest::default()).await?;
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        self.print_summary(&records)?;
        Ok(records
            .iter()
            .all(|record| record.status == JobStatus::Completed))
    }

    fn print_summary(&self, records: &[JobRecord]) -> CliResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(records)?);
            return Ok(());
        }
        for record in records {
            let first_line = record
                .output
                .as_deref()
                .and_then(|output| output.lines().next())
                .unwrap_or_default();
            println!("{}\t{}\t{}", record.identifier, record.status, first_line);
        }
        Ok(())
    }
}
