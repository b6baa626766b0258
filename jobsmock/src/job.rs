use crate::runner::{Invocation, RunOutput};
use crate::status::JobStatus;
use crate::types::{Args, Envs, JobId, Labels, Program};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;

/// What to run: the caller-supplied part of a job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobDefinition {
    pub command: Program,
    pub arguments: Args,
    pub environment: Envs,
    pub labels: Labels,
    pub working_dir: Option<String>,
}

impl JobDefinition {
    pub fn new(command: impl Into<Program>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, var: impl Into<String>, val: impl Into<String>) -> Self {
        self.environment.insert(var.into(), val.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.labels.insert(key.into(), val.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateJobRequest {
    /// Scope label, e.g. `projects/p/locations/l`. Informational only.
    pub parent: String,
    pub job_id: JobId,
    pub job: JobDefinition,
}

impl CreateJobRequest {
    pub fn new(job_id: impl Into<JobId>, job: JobDefinition) -> Self {
        Self {
            parent: String::new(),
            job_id: job_id.into(),
            job,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }
}

/// Listing parameters. Accepted for API compatibility; the registry always returns every record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListJobsRequest {
    pub parent: Option<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub show_deleted: bool,
}

/// A registered job and the outcome of its latest run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub identifier: JobId,
    pub parent: String,
    pub command: Program,
    pub arguments: Args,
    pub environment: Envs,
    pub working_dir: Option<String>,
    pub status: JobStatus,
    pub creation_time: DateTime<Utc>,
    /// Set by `update_job`, independent of the execution status.
    pub update_time: Option<DateTime<Utc>>,
    pub creator: String,
    pub execution_count: u64,
    pub labels: Labels,
    pub output: Option<String>,
}

impl JobRecord {
    pub(crate) fn new(request: CreateJobRequest, creator: &str) -> Self {
        let CreateJobRequest {
            parent,
            job_id,
            job,
        } = request;
        Self {
            identifier: job_id,
            parent,
            command: job.command,
            arguments: job.arguments,
            environment: job.environment,
            working_dir: job.working_dir,
            status: JobStatus::Created,
            creation_time: Utc::now(),
            update_time: None,
            creator: creator.to_string(),
            execution_count: 0,
            labels: job.labels,
            output: None,
        }
    }

    pub(crate) fn invocation(&self) -> Invocation {
        Invocation {
            program: self.command.clone(),
            args: self.arguments.clone(),
            envs: self.environment.clone(),
            working_dir: self.working_dir.clone(),
        }
    }

    pub(crate) fn begin_run(&mut self) {
        self.status = JobStatus::Running;
        self.execution_count += 1;
    }

    /// Record the outcome of a run. Launch failures and unsuccessful exits both end up as `Failed`.
    pub(crate) fn finish_run(&mut self, result: io::Result<RunOutput>) {
        match result {
            Ok(run) if run.termination.success() => {
                let text = if run.stdout.is_empty() {
                    &run.stderr
                } else {
                    &run.stdout
                };
                self.status = JobStatus::Completed;
                self.output = Some(String::from_utf8_lossy(text).into_owned());
            }
            Ok(run) => {
                let mut message = format!("`{}` terminated with {}", self.command, run.termination);
                if !run.stderr.is_empty() {
                    message.push('\n');
                    message.push_str(&String::from_utf8_lossy(&run.stderr));
                }
                self.status = JobStatus::Failed;
                self.output = Some(message);
            }
            Err(err) => {
                self.status = JobStatus::Failed;
                self.output = Some(format!("failed to launch `{}`: {}", self.command, err));
            }
        }
    }

    pub(crate) fn update_command(&mut self, command: Program) {
        self.command = command;
        self.status = JobStatus::Updated;
        self.update_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Termination;
    use crate::types::OutputBlob;

    fn record() -> JobRecord {
        let job = JobDefinition::new("render")
            .arg("scene.blend")
            .env("OUTPUT_PATH", "./output/");
        JobRecord::new(
            CreateJobRequest::new("j1", job).with_parent("projects/p"),
            "test",
        )
    }

    fn exited(code: i32, stdout: &'static str, stderr: &'static str) -> io::Result<RunOutput> {
        Ok(RunOutput {
            termination: Termination::Exited { code },
            stdout: OutputBlob::from(stdout),
            stderr: OutputBlob::from(stderr),
        })
    }

    #[test]
    fn new_record_starts_created_without_output() {
        let record = record();
        assert_eq!(record.identifier, "j1");
        assert_eq!(record.parent, "projects/p");
        assert_eq!(record.status, JobStatus::Created);
        assert_eq!(record.creator, "test");
        assert_eq!(record.execution_count, 0);
        assert!(record.labels.is_empty());
        assert!(record.output.is_none());
        assert!(record.update_time.is_none());
    }

    #[test]
    fn invocation_carries_command_args_and_env() {
        let invocation = record().invocation();
        assert_eq!(invocation.program, "render");
        assert_eq!(invocation.args, vec!["scene.blend".to_string()]);
        assert_eq!(invocation.envs.get("OUTPUT_PATH").map(String::as_str), Some("./output/"));
    }

    #[test]
    fn success_prefers_stdout_then_stderr() {
        let mut record = record();
        record.begin_run();
        assert_eq!(record.status, JobStatus::Running);
        record.finish_run(exited(0, "out", "err"));
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.output.as_deref(), Some("out"));

        record.finish_run(exited(0, "", "only stderr"));
        assert_eq!(record.output.as_deref(), Some("only stderr"));
    }

    #[test]
    fn non_zero_exit_fails_with_diagnostics() {
        let mut record = record();
        record.finish_run(exited(2, "", "no such scene"));
        assert_eq!(record.status, JobStatus::Failed);
        let output = record.output.unwrap();
        assert!(output.contains("exit code 2"));
        assert!(output.contains("no such scene"));
    }

    #[test]
    fn launch_error_fails_with_message() {
        let mut record = record();
        record.finish_run(Err(io::Error::new(io::ErrorKind::NotFound, "no such file")));
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.output.unwrap().contains("no such file"));
    }

    #[test]
    fn update_replaces_command_only() {
        let mut record = record();
        record.update_command("render-v2".into());
        assert_eq!(record.command, "render-v2");
        assert_eq!(record.status, JobStatus::Updated);
        assert_eq!(record.arguments, vec!["scene.blend".to_string()]);
        assert!(record.update_time.is_some());
    }

    #[test]
    fn create_request_accepts_cloud_shaped_json() {
        let request: CreateJobRequest = serde_json::from_str(
            r#"{"parent": "projects/p", "jobId": "render", "job": {"command": "python", "arguments": ["render.py"], "environment": {"SCENE_FILE": "scene.blend"}}}"#,
        )
        .unwrap();
        assert_eq!(request.job_id, "render");
        assert_eq!(request.job.arguments, vec!["render.py".to_string()]);
        assert!(request.job.working_dir.is_none());
    }
}
