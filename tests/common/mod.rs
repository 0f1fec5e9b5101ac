//! Common test utilities and helpers
//!
//! Shared by the integration test crates; not every crate uses every helper.
#![allow(dead_code)]

pub mod assertion_helpers;
pub mod recording_runner;
pub mod test_fixtures;
