pub mod git_scm;

pub use git_scm::{CloneOptions, CloneOutcome, GitScm, GitStatusSummary};
