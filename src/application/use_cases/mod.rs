pub mod batch;
pub mod clone_repositories;
pub mod delete_repositories;
pub mod git_operations;
pub mod install_repositories;
pub mod make_migrations;
pub mod manage_project;
pub mod scaffold_project;
pub mod status_check;

pub use batch::{BatchResult, OutcomeKind, RepoOutcome, Reporter};
