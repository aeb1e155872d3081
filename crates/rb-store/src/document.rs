//! In-memory container document: a header plus a tree of named groups.
//!
//! On disk a container is one JSON document:
//!
//! ```text
//! {
//!   "header": { "data_type": "REBDSIM", "data_version": 8, "n_original_events": ..., ... },
//!   "root": {
//!     "entries": [
//!       { "name": "Event", "object": { "kind": "group", "entries": [ ... ] } },
//!       { "name": "Model",
//!         "object": { "kind": "auxiliary", "class_name": "...", "payload": ... } }
//!     ]
//!   }
//! }
//! ```
//!
//! Histograms appear as
//! `{ "kind": "histogram", "name": ..., "axes": [...], "contents": ..., ... }`.

use rb_core::{AuxiliaryObject, ChildDescriptor, ChildKind, Error, FileHeader, Result};
use rb_hist::Histogram;
use serde::{Deserialize, Serialize};

/// Whole container: header and root group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Header record.
    pub header: FileHeader,
    /// Root group.
    #[serde(default)]
    pub root: Group,
}

/// An ordered list of named children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Children in stored order.
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// One named child of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Name within the parent group.
    pub name: String,
    /// The stored object.
    pub object: Object,
}

/// Anything a group can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Object {
    /// Nested group.
    Group(Group),
    /// Histogram (1–4 dimensions).
    Histogram(Histogram),
    /// Opaque object copied verbatim.
    Auxiliary(AuxiliaryObject),
}

impl Object {
    fn describe(&self) -> ChildKind {
        match self {
            Object::Group(_) => ChildKind::Group,
            Object::Histogram(h) => ChildKind::Histogram { dims: h.dims() },
            Object::Auxiliary(a) => ChildKind::Auxiliary { class_name: a.class_name.clone() },
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Object::Group(_) => "group",
            Object::Histogram(_) => "histogram",
            Object::Auxiliary(_) => "auxiliary",
        }
    }
}

impl Group {
    /// Find a child by name; the last one wins if a name repeats.
    pub fn find(&self, name: &str) -> Option<&Object> {
        self.entries.iter().rev().find(|e| e.name == name).map(|e| &e.object)
    }

    /// Descend through nested groups; `None` if any step is absent or not a group.
    pub fn subgroup(&self, path: &[String]) -> Option<&Group> {
        let mut current = self;
        for part in path {
            match current.find(part)? {
                Object::Group(g) => current = g,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Descend through nested groups, creating missing ones.
    ///
    /// Fails if a step names an existing non-group object.
    pub fn subgroup_mut(&mut self, path: &[String]) -> Result<&mut Group> {
        let mut current = self;
        for part in path {
            let idx = match current.entries.iter().rposition(|e| e.name == *part) {
                Some(idx) => idx,
                None => {
                    let group = Object::Group(Group::default());
                    current.entries.push(Entry { name: part.clone(), object: group });
                    current.entries.len() - 1
                }
            };
            current = match &mut current.entries[idx].object {
                Object::Group(g) => g,
                other => {
                    return Err(Error::Validation(format!(
                        "cannot create group '{}': a {} with that name exists",
                        part,
                        other.kind_name()
                    )));
                }
            };
        }
        Ok(current)
    }

    /// Insert or replace the child `name`.
    pub fn insert(&mut self, name: &str, object: Object) {
        match self.entries.iter_mut().rev().find(|e| e.name == name) {
            Some(entry) => entry.object = object,
            None => self.entries.push(Entry { name: name.to_string(), object }),
        }
    }

    /// Describe every child in stored order.
    pub fn describe(&self) -> Vec<ChildDescriptor> {
        self.entries
            .iter()
            .map(|e| ChildDescriptor { name: e.name.clone(), kind: e.object.describe() })
            .collect()
    }
}
