/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - Process execution (runner boundary, supervised companion processes)
/// - Git operations through the git executable
/// - Python / django-admin / npm command builders
/// - File system operations (manifest file, fixture copies)
pub mod filesystem;
pub mod process;
pub mod scm;
pub mod tools;

// Re-export commonly used types
pub use filesystem::ManifestStore;
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use scm::GitScm;
