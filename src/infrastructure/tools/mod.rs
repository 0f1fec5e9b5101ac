//! Command builders for the external tools the CLI drives

pub mod django_admin;
pub mod npm;
pub mod python;

pub use django_admin::DjangoAdmin;
pub use npm::NpmTool;
pub use python::PythonTool;
