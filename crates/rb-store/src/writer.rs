//! Write-only container sink with atomic publication.
//!
//! Objects are collected in memory and serialized into a temporary file next
//! to the destination; [`ContainerWriter::finalize`] syncs it and renames it
//! into place. Dropping the writer without finalizing removes the temporary
//! file, so an aborted run never leaves a complete-looking output behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rb_core::{AuxiliaryObject, Error, FileHeader, Result, StructuredSink};
use rb_hist::Histogram;
use tempfile::NamedTempFile;

use crate::document::{Document, Group, Object};

/// A container being written.
#[derive(Debug)]
pub struct ContainerWriter {
    dest: PathBuf,
    overwrite: bool,
    tmp: NamedTempFile,
    root: Group,
    header: Option<FileHeader>,
}

impl ContainerWriter {
    /// Prepare a new container at `dest`.
    ///
    /// Fails with [`Error::OutputPath`] if `dest` exists and `overwrite` is
    /// false, if it is a directory, or if its directory is not writable.
    pub fn create(dest: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let reject = |reason: String| Error::OutputPath { path: dest.clone(), reason };

        if dest.is_dir() {
            return Err(reject("is a directory".into()));
        }
        if dest.exists() && !overwrite {
            return Err(reject("file exists (use overwrite to replace it)".into()));
        }
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".rbcombine-")
            .suffix(".tmp")
            .tempfile_in(&parent)
            .map_err(|e| reject(format!("cannot write in {}: {e}", parent.display())))?;
        log::debug!("staging output for {} in {}", dest.display(), tmp.path().display());
        Ok(Self { dest, overwrite, tmp, root: Group::default(), header: None })
    }

    /// Destination path.
    pub fn dest(&self) -> &Path {
        &self.dest
    }
}

impl StructuredSink for ContainerWriter {
    fn ensure_group(&mut self, group: &[String]) -> Result<()> {
        self.root.subgroup_mut(group).map(|_| ())
    }

    fn write_histogram(
        &mut self,
        group: &[String],
        name: &str,
        histogram: Histogram,
    ) -> Result<()> {
        self.root.subgroup_mut(group)?.insert(name, Object::Histogram(histogram));
        Ok(())
    }

    fn clone_verbatim(
        &mut self,
        group: &[String],
        name: &str,
        object: AuxiliaryObject,
    ) -> Result<()> {
        self.root.subgroup_mut(group)?.insert(name, Object::Auxiliary(object));
        Ok(())
    }

    fn write_header(&mut self, header: FileHeader) -> Result<()> {
        self.header = Some(header);
        Ok(())
    }

    fn finalize(self) -> Result<()> {
        let ContainerWriter { dest, overwrite, tmp, root, header } = self;
        let header = header
            .ok_or_else(|| Error::Validation(format!("no header written for {}", dest.display())))?;
        let document = Document { header, root };

        {
            let mut w = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut w, &document)?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;

        let persisted = if overwrite { tmp.persist(&dest) } else { tmp.persist_noclobber(&dest) };
        persisted.map_err(|e| Error::Io(e.error))?;
        log::debug!("wrote {}", dest.display());
        Ok(())
    }
}
