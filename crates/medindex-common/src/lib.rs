//! medindex-common: Shared types and errors used across all medindex crates.

pub mod error;
pub mod format;
pub mod record;

// Re-export commonly used types
pub use error::{MedindexError, Result};
pub use format::SourceFormat;
pub use record::{Record, PROVENANCE_FIELD};
