//! # rb-store
//!
//! Self-describing container files for analysis and combine outputs.
//!
//! A container is a JSON document holding a typed header and a tree of
//! groups with histograms and auxiliary objects (see [`document`]). Files
//! are read through a memory map and written atomically.
//!
//! ## Example
//!
//! ```no_run
//! use rb_core::{Store, StructuredSource};
//! use rb_store::ContainerStore;
//!
//! let f = ContainerStore.open("run1.json".as_ref()).unwrap();
//! for child in f.list_children(&[]).unwrap() {
//!     println!("{} ({:?})", child.name, child.kind);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod file;
pub mod writer;

use std::path::Path;

use rb_core::{Result, Store};

pub use document::{Document, Entry, Group, Object};
pub use file::ContainerFile;
pub use writer::ContainerWriter;

/// [`Store`] over JSON container files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerStore;

impl Store for ContainerStore {
    type Source = ContainerFile;
    type Sink = ContainerWriter;

    fn open(&self, path: &Path) -> Result<ContainerFile> {
        ContainerFile::open(path)
    }

    fn create(&self, path: &Path, overwrite: bool) -> Result<ContainerWriter> {
        ContainerWriter::create(path, overwrite)
    }
}
