//! # rb-core
//!
//! Shared error type, header and bookkeeping types, and the storage traits
//! the combine engine is written against.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Store, StructuredSink, StructuredSource};
pub use types::{
    AuxiliaryObject, ChildDescriptor, ChildKind, DATA_TYPE_ANALYSIS, DATA_TYPE_COMBINE,
    DATA_VERSION, FileHeader, ObjectPath, RunMetadata,
};

/// Workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
