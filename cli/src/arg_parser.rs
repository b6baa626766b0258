use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run jobs against an in-process mock of a cloud Jobs API
#[derive(Debug, Parser)]
#[clap(name = "jobsmock", version)]
pub struct ArgParser {
    /// Attribution recorded as the creator of every job
    #[clap(long, env = "JOBSMOCK_CREATOR", default_value = "test")]
    pub creator: String,

    /// Capacity of the registry's request queue
    #[clap(long, env = "JOBSMOCK_MESSAGE_CAPACITY", default_value = "32")]
    pub message_capacity: usize,

    /// Launch commands through `sh -c` instead of spawning them directly
    #[clap(long, global = true)]
    pub shell: bool,

    /// Print job records as JSON
    #[clap(long, global = true)]
    pub json: bool,

    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommand {
    /// create a job and run it; put `--` before the command if it takes flags
    Run {
        #[clap(long)]
        /// job id, a random uuid when omitted
        id: Option<String>,

        #[clap(long)]
        /// scope label recorded on the job
        parent: Option<String>,

        #[clap(long, multiple_occurrences = true, parse(try_from_str = var_eq_val))]
        /// environment override, VAR=VAL
        env: Vec<(String, String)>,

        #[clap(long, multiple_occurrences = true, parse(try_from_str = var_eq_val))]
        /// label, KEY=VAL
        label: Vec<(String, String)>,

        #[clap(long)]
        /// working directory for the command
        dir: Option<String>,

        /// name of the command to run
        command: String,

        #[clap(allow_hyphen_values = true)]
        /// a list of args to the command
        args: Vec<String>,
    },
    /// create every job in a JSON file, run them all, and summarize
    Batch {
        /// JSON array of create requests
        file: PathBuf,
    },
}

/// try_from_str parse function for `VAR=VAL` pairs
fn var_eq_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((var, val)) if !var.is_empty() && !val.contains('=') => {
            Ok((var.to_string(), val.to_string()))
        }
        _ => Err("Required format is VAR=VAL".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_trailing_args() {
        let args = ArgParser::try_parse_from([
            "jobsmock", "--json", "run", "--id", "j1", "--env", "SCENE=a.blend", "--", "echo",
            "-n", "hi",
        ])
        .unwrap();
        assert!(args.json);
        assert!(!args.shell);
        assert_eq!(args.creator, "test");
        match args.sub_command {
            SubCommand::Run {
                id,
                env,
                command,
                args,
                ..
            } => {
                assert_eq!(id.as_deref(), Some("j1"));
                assert_eq!(env, vec![("SCENE".to_string(), "a.blend".to_string())]);
                assert_eq!(command, "echo");
                assert_eq!(args, vec!["-n".to_string(), "hi".to_string()]);
            }
            other => panic!("unexpected sub-command {:?}", other),
        }
    }

    #[test]
    fn parses_batch() {
        let args = ArgParser::try_parse_from(["jobsmock", "batch", "jobs.json", "--shell"]).unwrap();
        assert!(args.shell);
        assert_eq!(
            args.sub_command,
            SubCommand::Batch {
                file: PathBuf::from("jobs.json")
            }
        );
    }

    #[test]
    fn var_eq_val_requires_one_equals_sign() {
        assert_eq!(var_eq_val("A=b"), Ok(("A".into(), "b".into())));
        assert_eq!(var_eq_val("A="), Ok(("A".into(), String::new())));
        assert!(var_eq_val("A").is_err());
        assert!(var_eq_val("=b").is_err());
        assert!(var_eq_val("A=b=c").is_err());
    }
}
