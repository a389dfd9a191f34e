mod repository;
mod runner;

pub use repository::{GitRepository, RepositoryAccessor};
pub use runner::{DefaultGitRunner, GitRunner};
