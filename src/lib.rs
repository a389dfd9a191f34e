#![forbid(unsafe_code)]
#![deny(warnings, clippy::all, clippy::pedantic)]

mod config;
mod error;
mod git;
mod logging;
mod pipeline;
mod runner;
mod system;
mod types;
pub mod output;

pub use config::{CONFIG_FILE_NAME, load_configuration};
pub use error::{Result, StatsError};
pub use git::{DefaultGitRunner, GitRepository, GitRunner, RepositoryAccessor};
pub use logging::setup_logger;
pub use pipeline::{CommitPipeline, DATE_FORMAT, format_timestamp, process_commits};
pub use runner::{Collaborators, Workspace, run};
pub use system::{CommandExecutor, DefaultAnswer, Prompt, ShellExecutor, StdinPrompt};
pub use types::{
    CommitId, CommitOrder, CommitRecord, Configuration, Options, RunContext, TaskMapping,
    TimeZonePolicy,
};
