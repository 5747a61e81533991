//! One-shot batch import of pseudo-JSON dataset dumps into a local document
//! store, inferring an identity field per dataset to keep imports idempotent.

// Sub-modules in alphabetical order.
pub mod errors;
pub mod identity;
pub mod import;
pub mod record;
pub mod store;
mod temp_dir;

pub use temp_dir::TempDir;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
