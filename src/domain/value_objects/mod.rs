pub mod env_overlay;
pub mod repo_source;

pub use env_overlay::EnvOverlay;
pub use repo_source::{ParsedRepoSpec, RepoSource};
