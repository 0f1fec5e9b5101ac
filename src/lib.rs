//! # dm - Django MongoDB workspace tool
//!
//! `dm` clones the Django ecosystem repositories declared in a workspace
//! manifest, installs them, places the MongoDB configuration fixtures each
//! repository's own test runner needs, and runs those test suites against
//! `django-mongodb-backend`. It also scaffolds and drives small Django
//! projects from templates.
//!
//! ## Quick Start
//!
//! 1. Declare the repositories in `pyproject.toml`:
//!
//! ```toml
//! [tool.django_mongodb_cli]
//! repos = [
//!     "django @ git+ssh://git@github.com/mongodb-forks/django@mongodb-5.2.x",
//!     "demo@https://example.com/demo.git#main",
//! ]
//!
//! [tool.django_mongodb_cli.groups]
//! core = ["django", "demo"]
//! ```
//!
//! 2. Clone and install them:
//!
//! ```bash
//! dm repo clone -g core --install
//! ```
//!
//! 3. Run a repository's tests:
//!
//! ```bash
//! dm repo test django admin_changelist --keepdb
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: the repository registry, selectors and value objects
//! - [`application`]: manifest processing and one use case per action family
//! - [`infrastructure`]: the process runner boundary, git, Python/Django/npm
//!   command builders and file system access
//! - [`presentation`]: the clap command line
//! - [`common`]: error handling and embedded templates
//!
//! Every subprocess goes through [`infrastructure::process::ProcessRunner`],
//! and environment overrides travel as an explicit
//! [`domain::value_objects::EnvOverlay`]; the process environment is never
//! mutated.
//!
//! ## Using the Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use django_mongodb_cli::application::services::ManifestService;
//! use django_mongodb_cli::application::use_cases::batch::silent;
//! use django_mongodb_cli::application::use_cases::clone_repositories::{
//!     CloneRepositoriesConfig, CloneRepositoriesUseCase,
//! };
//! use django_mongodb_cli::domain::entities::invocation::Selector;
//! use django_mongodb_cli::infrastructure::TokioProcessRunner;
//!
//! # async fn example() -> django_mongodb_cli::Result<()> {
//! let service = ManifestService::new();
//! let path = service.locate(None, std::path::Path::new("."))?;
//! let workspace = service.load(&path).await?.workspace;
//!
//! let use_case = CloneRepositoriesUseCase::new(&workspace, Arc::new(TokioProcessRunner::new()));
//! let config = CloneRepositoriesConfig::new(Selector::Groups(vec!["core".to_string()]));
//! let result = use_case.execute(&config, &mut silent).await?;
//! println!("cloned {} repositories", result.succeeded());
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::DmError;
pub use crate::common::result::DmResult as Result;
