mod arg_parser;
mod local_cli;

use arg_parser::{ArgParser, SubCommand};
use jobsmock::{CreateJobRequest, JobDefinition, RegistryConfig};
use local_cli::LocalCli;

use clap::Parser;
use std::{error, io, process};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    // logs go to stderr, job output owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = ArgParser::parse();
    let config = RegistryConfig::default()
        .with_creator(args.creator)
        .with_message_capacity(args.message_capacity);
    let cli = LocalCli::new(config, args.shell, args.json);

    let succeeded = match args.sub_command {
        SubCommand::Run {
            id,
            parent,
            env,
            label,
            dir,
            command,
            args,
        } => {
            let mut job = JobDefinition::new(command).args(args);
            job.environment.extend(env);
            job.labels.extend(label);
            job.working_dir = dir;
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            cli.run_one(CreateJobRequest::new(id, job).with_parent(parent.unwrap_or_default()))
                .await?
        }
        SubCommand::Batch { file } => cli.run_batch(&file).await?,
    };

    if !succeeded {
        process::exit(1);
    }
    Ok(())
}
