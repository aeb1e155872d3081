//! Common data types shared by sources, sinks and the combine engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag written by the per-file analysis step.
pub const DATA_TYPE_ANALYSIS: &str = "REBDSIM";

/// Type tag written by a combine run.
pub const DATA_TYPE_COMBINE: &str = "REBDSIMCOMBINE";

/// Newest container format version understood by this build.
pub const DATA_VERSION: u32 = 8;

/// Scalar event bookkeeping summed across sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Events in the original simulation output(s) the analysis ran over.
    #[serde(default)]
    pub n_original_events: u64,
    /// Events requested from the simulation.
    #[serde(default)]
    pub n_events_requested: u64,
    /// Events present in the input distribution file.
    #[serde(default)]
    pub n_events_in_file: u64,
    /// Events of the distribution file that were skipped.
    #[serde(default)]
    pub n_events_in_file_skipped: u64,
    /// Number of times the distribution file was looped over.
    #[serde(default)]
    pub distr_file_loop_n_times: u64,
}

impl RunMetadata {
    /// Field-wise sum; `None` if any field would overflow.
    pub fn checked_add(&self, rhs: &RunMetadata) -> Option<RunMetadata> {
        Some(RunMetadata {
            n_original_events: self.n_original_events.checked_add(rhs.n_original_events)?,
            n_events_requested: self.n_events_requested.checked_add(rhs.n_events_requested)?,
            n_events_in_file: self.n_events_in_file.checked_add(rhs.n_events_in_file)?,
            n_events_in_file_skipped: self
                .n_events_in_file_skipped
                .checked_add(rhs.n_events_in_file_skipped)?,
            distr_file_loop_n_times: self
                .distr_file_loop_n_times
                .checked_add(rhs.distr_file_loop_n_times)?,
        })
    }
}

/// Self-describing header record of a container file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Type tag, e.g. [`DATA_TYPE_ANALYSIS`] or [`DATA_TYPE_COMBINE`].
    pub data_type: String,
    /// Container format version.
    pub data_version: u32,
    /// Version of the producing software, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_version: Option<String>,
    /// Event bookkeeping.
    #[serde(flatten)]
    pub metadata: RunMetadata,
    /// Files merged into this one, in merge order (combine outputs only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub combined_files: Vec<String>,
}

impl FileHeader {
    /// Header for a freshly written file of the given type at the current version.
    pub fn new(data_type: impl Into<String>, metadata: RunMetadata) -> Self {
        Self {
            data_type: data_type.into(),
            data_version: DATA_VERSION,
            producer_version: Some(crate::VERSION.to_string()),
            metadata,
            combined_files: Vec::new(),
        }
    }

    /// Check the tag against `accepted` and the version against [`DATA_VERSION`].
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate_tag(&self, accepted: &[&str]) -> std::result::Result<(), String> {
        if !accepted.iter().any(|t| *t == self.data_type) {
            return Err(format!(
                "data type '{}' is not one of [{}]",
                self.data_type,
                accepted.join(", ")
            ));
        }
        if self.data_version == 0 || self.data_version > DATA_VERSION {
            return Err(format!(
                "data version {} is not supported (1..={DATA_VERSION})",
                self.data_version
            ));
        }
        Ok(())
    }
}

/// What kind of object a group child is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKind {
    /// A nested group (directory).
    Group,
    /// A histogram of the given dimensionality (1–4).
    Histogram {
        /// Dimensionality.
        dims: usize,
    },
    /// Any other stored object (e.g. a model description table).
    Auxiliary {
        /// Producer-defined class name.
        class_name: String,
    },
}

/// One child of a group as listed by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    /// Child name within its group.
    pub name: String,
    /// Child kind.
    pub kind: ChildKind,
}

/// A non-histogram object copied verbatim from the first valid source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryObject {
    /// Producer-defined class name.
    pub class_name: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
}

/// Location of an object: its group path and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath {
    /// Group names from the root, outermost first.
    pub groups: Vec<String>,
    /// Leaf name.
    pub name: String,
}

impl ObjectPath {
    /// Build from a group path and a name.
    pub fn new(groups: &[String], name: impl Into<String>) -> Self {
        Self { groups: groups.to_vec(), name: name.into() }
    }

    /// Name of the immediate parent group (empty at the root).
    pub fn parent(&self) -> &str {
        self.groups.last().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for g in &self.groups {
            write!(f, "{g}/")?;
        }
        f.write_str(&self.name)
    }
}
