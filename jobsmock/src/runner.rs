//! Command runners: the capability that actually launches a job's command.
//!
//! The registry only ever talks to a [`CommandRunner`]. [`LocalRunner`] spawns real subprocesses,
//! while [`CannedRunner`] stands in for a backend under test and answers with a fixed outcome.

use crate::types::{Args, Envs, OutputBlob, Program};
use bytes::BytesMut;
use futures::future::{BoxFuture, FutureExt};
use std::os::unix::process::ExitStatusExt;
use std::sync::{Arc, Mutex, PoisonError};
use std::{fmt, io, process::Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process;

/// Everything a runner needs to launch one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: Program,
    pub args: Args,
    /// Overrides applied on top of the ambient environment.
    pub envs: Envs,
    pub working_dir: Option<String>,
}

/// How a process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Exited { code: i32 },
    Killed { signal: i32 },
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited { code: 0 })
    }

    fn from_status(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(code) => Termination::Exited { code },
            None => Termination::Killed {
                signal: status.signal().unwrap_or_default(),
            },
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited { code } => write!(f, "exit code {}", code),
            Termination::Killed { signal } => write!(f, "signal {}", signal),
        }
    }
}

/// Captured result of a process that was launched and ran to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutput {
    pub termination: Termination,
    pub stdout: OutputBlob,
    pub stderr: OutputBlob,
}

/// Launches an invocation and waits for it to end.
///
/// An `Err` means the command could not be launched at all (e.g. the executable is missing).
pub trait CommandRunner: Send + Sync + 'static {
    fn run(&self, invocation: Invocation) -> BoxFuture<'static, io::Result<RunOutput>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Launch {
    #[default]
    Direct,
    Shell,
}

/// Runs invocations as local subprocesses.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalRunner {
    launch: Launch,
}

impl LocalRunner {
    /// Spawn the program directly, passing arguments untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the program to `sh -c` as a shell line.
    ///
    /// Arguments reach it as positional parameters (`"$@"`), so they are never re-split or
    /// interpreted by the shell.
    pub fn shell() -> Self {
        Self {
            launch: Launch::Shell,
        }
    }

    fn command(&self, invocation: &Invocation) -> process::Command {
        let mut command = match self.launch {
            Launch::Direct => {
                let mut command = process::Command::new(&invocation.program);
                command.args(&invocation.args);
                command
            }
            Launch::Shell => {
                let mut command = process::Command::new("sh");
                command
                    .arg("-c")
                    .arg(format!("{} \"$@\"", invocation.program))
                    // $0 for the shell line
                    .arg("sh")
                    .args(&invocation.args);
                command
            }
        };
        command
            .envs(&invocation.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl CommandRunner for LocalRunner {
    fn run(&self, invocation: Invocation) -> BoxFuture<'static, io::Result<RunOutput>> {
        let mut command = self.command(&invocation);
        async move {
            let mut child = command.spawn()?;
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            // both pipes must drain while waiting, or a chatty child blocks on a full pipe
            let (status, stdout, stderr) =
                tokio::try_join!(child.wait(), drain(stdout), drain(stderr))?;
            Ok(RunOutput {
                termination: Termination::from_status(status),
                stdout,
                stderr,
            })
        }
        .boxed()
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<OutputBlob> {
    let mut buf = BytesMut::with_capacity(4096);
    if let Some(mut pipe) = pipe {
        while pipe.read_buf(&mut buf).await? > 0 {}
    }
    Ok(buf.freeze())
}

#[derive(Clone, Debug)]
enum Canned {
    Output(RunOutput),
    SpawnError { kind: io::ErrorKind, message: String },
}

/// A runner that never launches anything.
///
/// Every invocation gets the same canned outcome and is recorded for later inspection.
#[derive(Clone, Debug)]
pub struct CannedRunner {
    outcome: Canned,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl CannedRunner {
    pub fn exit(
        code: i32,
        stdout: impl Into<OutputBlob>,
        stderr: impl Into<OutputBlob>,
    ) -> Self {
        Self::with_outcome(Canned::Output(RunOutput {
            termination: Termination::Exited { code },
            stdout: stdout.into(),
            stderr: stderr.into(),
        }))
    }

    pub fn killed(signal: i32) -> Self {
        Self::with_outcome(Canned::Output(RunOutput {
            termination: Termination::Killed { signal },
            stdout: OutputBlob::new(),
            stderr: OutputBlob::new(),
        }))
    }

    pub fn spawn_error(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self::with_outcome(Canned::SpawnError {
            kind,
            message: message.into(),
        })
    }

    fn with_outcome(outcome: Canned) -> Self {
        Self {
            outcome,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Invocations received so far, oldest first.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CommandRunner for CannedRunner {
    fn run(&self, invocation: Invocation) -> BoxFuture<'static, io::Result<RunOutput>> {
        self.invocations.lock().unwrap_or_else(PoisonError::into_inner).push(invocation);
        let result = match &self.outcome {
            Canned::Output(output) => Ok(output.clone()),
            Canned::SpawnError { kind, message } => Err(io::Error::new(*kind, message.clone())),
        };
        futures::future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> Invocation {
        Invocation {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            envs: Envs::new(),
            working_dir: None,
        }
    }

    #[tokio::test]
    async fn captures_stdout() {
        let output = LocalRunner::new()
            .run(invocation("echo", &["-n", "hello world!"]))
            .await
            .expect("echo should spawn");
        assert_eq!(output.termination, Termination::Exited { code: 0 });
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello world!");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn captures_stderr_and_exit_code() {
        let output = LocalRunner::new()
            .run(invocation("sh", &["-c", "echo oops >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(output.termination, Termination::Exited { code: 3 });
        assert!(!output.termination.success());
        assert_eq!(String::from_utf8_lossy(&output.stderr), "oops\n");
    }

    #[tokio::test]
    async fn overrides_merge_over_ambient_environment() {
        let mut inv = invocation("sh", &["-c", "printf '%s:%s' \"$JOBSMOCK_TEST_VAR\" \"${PATH:+set}\""]);
        inv.envs.insert("JOBSMOCK_TEST_VAR".into(), "override".into());
        let output = LocalRunner::new().run(inv).await.unwrap();
        // PATH comes from the ambient environment, the variable from the override
        assert_eq!(String::from_utf8_lossy(&output.stdout), "override:set");
    }

    #[tokio::test]
    async fn honours_working_dir() {
        let mut inv = invocation("pwd", &[]);
        inv.working_dir = Some("/".into());
        let output = LocalRunner::new().run(inv).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "/");
    }

    #[tokio::test]
    async fn shell_launch_interprets_the_program_line() {
        let output = LocalRunner::shell()
            .run(invocation("echo \"Hello, World!\" && echo again", &[]))
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "Hello, World!\nagain\n"
        );
    }

    #[tokio::test]
    async fn shell_launch_passes_arguments_verbatim() {
        let output = LocalRunner::shell()
            .run(invocation("printf", &["%s|", "a b", "$HOME", "x;y"]))
            .await
            .unwrap();
        assert_eq!(output.termination, Termination::Exited { code: 0 });
        assert_eq!(String::from_utf8_lossy(&output.stdout), "a b|$HOME|x;y|");
    }

    #[tokio::test]
    async fn reports_killed_processes() {
        let output = LocalRunner::new()
            .run(invocation("sh", &["-c", "kill -9 $$"]))
            .await
            .unwrap();
        assert_eq!(output.termination, Termination::Killed { signal: 9 });
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let err = LocalRunner::new()
            .run(invocation("/nonexistent/jobsmock-binary", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn canned_runner_records_invocations() {
        let runner = CannedRunner::exit(0, "done", "");
        let output = runner.run(invocation("render", &["scene.blend"])).await.unwrap();
        assert_eq!(output.stdout, OutputBlob::from("done"));
        assert_eq!(runner.invocations(), vec![invocation("render", &["scene.blend"])]);

        let err = CannedRunner::spawn_error(io::ErrorKind::PermissionDenied, "denied")
            .run(invocation("render", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
