pub mod fixture_service;
pub mod manifest_service;

pub use fixture_service::{FixtureOutcome, FixtureService};
pub use manifest_service::{ManifestService, ProcessedManifest};
