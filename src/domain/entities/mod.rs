pub mod invocation;
pub mod manifest;
pub mod registry;
pub mod repository;
pub mod workspace;
