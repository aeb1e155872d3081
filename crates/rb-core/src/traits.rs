//! Storage traits for the combine engine.
//!
//! The engine only talks to these traits, so it never depends on a concrete
//! on-disk format: a [`Store`] opens read-only [`StructuredSource`]s and
//! creates one write-only [`StructuredSink`] per run.

use std::path::Path;

use rb_hist::Histogram;

use crate::Result;
use crate::error::Error;
use crate::types::{AuxiliaryObject, ChildDescriptor, FileHeader};

/// A read-only, group-structured container of histograms and auxiliary objects.
///
/// Closing a source is dropping it.
pub trait StructuredSource: Send + Sync {
    /// Path the source was opened from (for diagnostics).
    fn path(&self) -> &Path;

    /// Header record.
    fn header(&self) -> &FileHeader;

    /// Children of the group at `group` (empty slice = root), in stored order.
    fn list_children(&self, group: &[String]) -> Result<Vec<ChildDescriptor>>;

    /// Read the histogram `name` inside `group`.
    ///
    /// Absent objects yield [`Error::MissingHistogram`].
    fn read_histogram(&self, group: &[String], name: &str) -> Result<Histogram>;

    /// Read the auxiliary object `name` inside `group`.
    fn read_auxiliary(&self, group: &[String], name: &str) -> Result<AuxiliaryObject>;

    /// Fail with [`Error::TypeTag`] unless the header carries one of `accepted`
    /// and a supported format version.
    fn check_tag(&self, accepted: &[&str]) -> Result<()> {
        self.header()
            .validate_tag(accepted)
            .map_err(|reason| Error::TypeTag { path: self.path().to_path_buf(), reason })
    }
}

/// A write-only container created fresh for one run.
///
/// Nothing becomes visible at the destination before [`StructuredSink::finalize`].
pub trait StructuredSink {
    /// Make sure the group at `group` exists (creating parents as needed).
    fn ensure_group(&mut self, group: &[String]) -> Result<()>;

    /// Store `histogram` under `group` as `name`; the key need not match `histogram.name()`.
    fn write_histogram(&mut self, group: &[String], name: &str, histogram: Histogram)
    -> Result<()>;

    /// Store an auxiliary object under `group` as `name`, unchanged.
    fn clone_verbatim(&mut self, group: &[String], name: &str, object: AuxiliaryObject)
    -> Result<()>;

    /// Set the header record.
    fn write_header(&mut self, header: FileHeader) -> Result<()>;

    /// Flush and publish the container at its destination in one step.
    fn finalize(self) -> Result<()>;
}

/// Factory for sources and sinks of one concrete format.
pub trait Store: Sync {
    /// Source type.
    type Source: StructuredSource;
    /// Sink type.
    type Sink: StructuredSink;

    /// Open an existing container; missing or corrupt files yield [`Error::Open`].
    fn open(&self, path: &Path) -> Result<Self::Source>;

    /// Create a new container at `path`; fails if it exists and `overwrite` is false.
    fn create(&self, path: &Path, overwrite: bool) -> Result<Self::Sink>;
}
