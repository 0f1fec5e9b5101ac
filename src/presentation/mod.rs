//! Presentation layer: the `dm` command line
pub mod cli;
