pub mod command_executor;
pub mod supervisor;

pub use command_executor::{CommandSpec, OutputMode, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use supervisor::Supervisor;

#[cfg(test)]
pub use command_executor::MockProcessRunner;
