//! In-process mock of a cloud Jobs control plane.
//!
//! Jobs are registered, run, polled and deleted through a [`JobRegistry`] handle, the same way a
//! client would drive the real API. Runs execute locally through a [`CommandRunner`].

mod actors;
pub mod config;
pub mod errors;
pub mod job;
pub mod runner;
mod status;
pub mod types;

// re-export the registry handle as if it is the registry itself.
pub use actors::registry::JobRegistryHandle as JobRegistry;
pub use config::RegistryConfig;
pub use errors::{JobError, Result};
pub use job::{CreateJobRequest, JobDefinition, JobRecord, ListJobsRequest};
pub use runner::{CannedRunner, CommandRunner, LocalRunner};
pub use status::JobStatus;
