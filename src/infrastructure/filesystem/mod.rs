pub mod file_operations;
pub mod manifest_store;

pub use manifest_store::{LoadedManifest, ManifestStore, ManifestWrite};
