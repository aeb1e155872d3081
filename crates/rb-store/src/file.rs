//! Read-only access to a container file.

use std::fs;
use std::path::{Path, PathBuf};

use rb_core::{
    AuxiliaryObject, ChildDescriptor, Error, FileHeader, ObjectPath, Result, StructuredSource,
};
use rb_hist::Histogram;

use crate::document::{Document, Group, Object};

/// A container file opened for reading.
///
/// The whole document is parsed at open time, so a truncated or otherwise
/// corrupt file is rejected immediately instead of failing halfway through a run.
#[derive(Debug)]
pub struct ContainerFile {
    document: Document,
    path: PathBuf,
}

impl ContainerFile {
    /// Open and parse a container from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |reason: String| Error::Open { path: path.clone(), reason };

        let file = fs::File::open(&path).map_err(|e| open_err(e.to_string()))?;
        let len = file.metadata().map_err(|e| open_err(e.to_string()))?.len();
        if len == 0 {
            return Err(open_err("empty file".into()));
        }
        // SAFETY: the mapping is read-only and only lives for the parse below;
        // concurrent truncation by another process is outside what we guard against.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| open_err(e.to_string()))?;
        let document: Document = serde_json::from_slice(&mmap)
            .map_err(|e| open_err(format!("corrupt container: {e}")))?;
        log::debug!("opened {} ({} bytes)", path.display(), len);
        Ok(Self { document, path })
    }

    /// Parse a container from bytes (for testing).
    pub fn from_bytes(data: &[u8], path: PathBuf) -> Result<Self> {
        let document: Document = serde_json::from_slice(data).map_err(|e| Error::Open {
            path: path.clone(),
            reason: format!("corrupt container: {e}"),
        })?;
        Ok(Self { document, path })
    }

    /// Wrap an in-memory document.
    pub fn from_document(document: Document, path: PathBuf) -> Self {
        Self { document, path }
    }

    /// Parsed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    fn group(&self, group: &[String]) -> Option<&Group> {
        self.document.root.subgroup(group)
    }

    fn missing(&self, group: &[String], name: &str) -> Error {
        Error::MissingHistogram {
            path: self.path.clone(),
            object: ObjectPath::new(group, name).to_string(),
        }
    }
}

impl StructuredSource for ContainerFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn header(&self) -> &FileHeader {
        &self.document.header
    }

    fn list_children(&self, group: &[String]) -> Result<Vec<ChildDescriptor>> {
        let g = self.group(group).ok_or_else(|| {
            Error::Validation(format!(
                "group '{}' not found in {}",
                group.join("/"),
                self.path.display()
            ))
        })?;
        Ok(g.describe())
    }

    fn read_histogram(&self, group: &[String], name: &str) -> Result<Histogram> {
        match self.group(group).and_then(|g| g.find(name)) {
            Some(Object::Histogram(h)) => Ok(h.clone()),
            _ => Err(self.missing(group, name)),
        }
    }

    fn read_auxiliary(&self, group: &[String], name: &str) -> Result<AuxiliaryObject> {
        match self.group(group).and_then(|g| g.find(name)) {
            Some(Object::Auxiliary(a)) => Ok(a.clone()),
            _ => Err(Error::Validation(format!(
                "auxiliary object {} not found in {}",
                ObjectPath::new(group, name),
                self.path.display()
            ))),
        }
    }
}
