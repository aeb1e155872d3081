//! Combine options and their on-disk configuration file.

use std::path::Path;

use rb_core::{DATA_TYPE_COMBINE, Error, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::MergeKind;

/// Which parent-group names select which merge.
///
/// A histogram's merge is decided by the name of the group that directly
/// contains it; groups named in neither list are not merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeRules {
    /// Groups holding per-entry mean histograms.
    pub mean_merge: Vec<String>,
    /// Groups holding per-run sums.
    pub sum: Vec<String>,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            mean_merge: vec!["PerEntryHistograms".into(), "MergedHistograms".into()],
            sum: vec!["SimpleHistograms".into()],
        }
    }
}

impl MergeRules {
    /// Merge kind for a histogram whose immediate parent group is `parent`.
    pub fn classify(&self, parent: &str) -> MergeKind {
        if self.mean_merge.iter().any(|g| g == parent) {
            MergeKind::MeanMerge
        } else if self.sum.iter().any(|g| g == parent) {
            MergeKind::Sum
        } else {
            MergeKind::Skip
        }
    }

    /// Reject rule sets that name a group under both merges.
    pub fn validate(&self) -> Result<()> {
        if let Some(both) = self.mean_merge.iter().find(|g| self.sum.contains(g)) {
            return Err(Error::Config(format!(
                "group '{both}' is listed under both mean_merge and sum"
            )));
        }
        Ok(())
    }
}

/// Settings for one combine run.
#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Threads (0 = rayon default, 1 = sequential).
    pub threads: usize,
    /// Group-name rules.
    pub rules: MergeRules,
    /// Type tag written into the output header.
    pub output_data_type: String,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            threads: 1,
            rules: MergeRules::default(),
            output_data_type: DATA_TYPE_COMBINE.to_string(),
        }
    }
}

impl CombineOptions {
    /// Overlay the values present in `config`.
    pub fn apply(&mut self, config: CombineConfig) {
        if let Some(rules) = config.merge_rules {
            self.rules = rules;
        }
        if let Some(threads) = config.threads {
            self.threads = threads;
        }
        if let Some(overwrite) = config.overwrite {
            self.overwrite = overwrite;
        }
    }
}

/// Contents of a `--config` file. Every field is optional.
///
/// ```yaml
/// threads: 4
/// merge_rules:
///   mean_merge: [PerEntryHistograms, MergedHistograms]
///   sum: [SimpleHistograms]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombineConfig {
    /// Replacement merge rules.
    #[serde(default)]
    pub merge_rules: Option<MergeRules>,
    /// Thread count.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Overwrite flag.
    #[serde(default)]
    pub overwrite: Option<bool>,
}

/// Read a config file: JSON when the extension is `.json`, YAML otherwise.
pub fn read_config(path: &Path) -> Result<CombineConfig> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: CombineConfig = if ext == "json" {
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
    } else {
        serde_yaml_ng::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
    };
    if let Some(rules) = &cfg.merge_rules {
        rules.validate()?;
    }
    Ok(cfg)
}
