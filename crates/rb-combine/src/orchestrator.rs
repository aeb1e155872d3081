//! The combine run: open sources, fold every catalogued histogram, write once.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rb_core::{
    DATA_TYPE_ANALYSIS, DATA_TYPE_COMBINE, Error, FileHeader, Result, RunMetadata, Store,
    StructuredSink, StructuredSource,
};
use serde::Serialize;

use crate::catalog::{HistogramCatalog, Step};
use crate::config::CombineOptions;

/// Type tags a source may carry.
pub const ACCEPTED_DATA_TYPES: [&str; 2] = [DATA_TYPE_ANALYSIS, DATA_TYPE_COMBINE];

/// A source left out of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSource {
    /// Input path.
    pub path: String,
    /// Why it was skipped.
    pub reason: String,
}

/// A catalogued histogram that one source did not contribute to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryIssue {
    /// Source file.
    pub source: String,
    /// `group/.../name` of the histogram.
    pub object: String,
    /// Diagnostic text.
    pub reason: String,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombineReport {
    /// Output file.
    pub output: String,
    /// Number of input paths given.
    pub n_inputs: usize,
    /// Sources merged, in merge order.
    pub merged: Vec<String>,
    /// Sources skipped entirely.
    pub skipped: Vec<SkippedSource>,
    /// Histograms written to the output.
    pub histograms_written: usize,
    /// Lookups that found nothing or an unusable object (entry kept its state).
    pub missing: Vec<EntryIssue>,
    /// Entries dropped from the output after a binning disagreement.
    pub failed_entries: Vec<EntryIssue>,
    /// Summed event bookkeeping of the merged sources.
    pub metadata: RunMetadata,
}

impl CombineReport {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "merged {}/{} files into {} ({} histograms, {} skipped files, {} missing lookups, \
             {} failed histograms)",
            self.merged.len(),
            self.n_inputs,
            self.output,
            self.histograms_written,
            self.skipped.len(),
            self.missing.len(),
            self.failed_entries.len()
        )
    }
}

/// Reject output paths that look like a file pattern.
pub fn check_output_path(output: &Path) -> Result<()> {
    let s = output.to_string_lossy();
    if s.contains('*') || s.contains('?') {
        return Err(Error::OutputPath {
            path: output.to_path_buf(),
            reason: "output path contains a wildcard; was the output argument forgotten?".into(),
        });
    }
    if s.is_empty() {
        return Err(Error::OutputPath { path: PathBuf::new(), reason: "empty path".into() });
    }
    Ok(())
}

/// Merge `inputs` into a new file at `output`.
///
/// The first source that opens and carries an accepted type tag defines the
/// catalog of histograms; every valid source (that one included) is then
/// folded in input order. Unreadable or untagged sources are skipped with a
/// warning, as are individual histograms a source lacks. Nothing appears at
/// `output` unless the whole run succeeds.
pub fn combine<S: Store>(
    store: &S,
    output: &Path,
    inputs: &[PathBuf],
    options: &CombineOptions,
) -> Result<CombineReport> {
    check_output_path(output)?;
    if inputs.len() < 2 {
        return Err(Error::TooFewInputs(inputs.len()));
    }
    options.rules.validate()?;

    let pool = if options.threads == 1 {
        None
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .build()
            .map_err(|e| Error::Config(format!("cannot start thread pool: {e}")))?;
        Some(pool)
    };

    let mut sink = store.create(output, options.overwrite)?;
    let mut report = CombineReport {
        output: output.display().to_string(),
        n_inputs: inputs.len(),
        ..Default::default()
    };
    let mut catalog: Option<HistogramCatalog> = None;

    for input in inputs {
        let name = input.display().to_string();
        let source = match open_tagged(store, input) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("skipping {name}: {e}");
                report.skipped.push(SkippedSource { path: name, reason: e.to_string() });
                continue;
            }
        };

        let Some(totals) = report.metadata.checked_add(&source.header().metadata) else {
            let reason = "event counts overflow when added to the running totals".to_string();
            log::warn!("skipping {name}: {reason}");
            report.skipped.push(SkippedSource { path: name, reason });
            continue;
        };

        if catalog.is_none() {
            log::info!("building histogram catalog from {name}");
            let built = HistogramCatalog::build(&source, &options.rules)?;
            prepare_output(&mut sink, &built)?;
            catalog = Some(built);
        }
        let Some(catalog) = catalog.as_mut() else { continue };

        log::info!("merging {name}");
        let entries = &mut catalog.entries;
        let steps: Vec<Step> = match &pool {
            Some(pool) => pool
                .install(|| entries.par_iter_mut().map(|e| e.accumulate_from(&source)).collect()),
            None => entries.iter_mut().map(|e| e.accumulate_from(&source)).collect(),
        };
        for (entry, step) in catalog.entries.iter().zip(steps) {
            let object = entry.object_path().to_string();
            match step {
                Step::Merged | Step::Inactive => {}
                Step::Missing => {
                    log::warn!("{name}: histogram {object} not found; not merged from this file");
                    report.missing.push(EntryIssue {
                        source: name.clone(),
                        object,
                        reason: "not found".into(),
                    });
                }
                Step::NoEntries => {
                    log::warn!(
                        "{name}: histogram {object} has zero entries but non-zero contents; \
                         not merged from this file"
                    );
                    report.missing.push(EntryIssue {
                        source: name.clone(),
                        object,
                        reason: "zero entries with non-zero contents".into(),
                    });
                }
                Step::Refused(e) => {
                    log::warn!("{name}: histogram {object} not merged from this file: {e}");
                    report.missing.push(EntryIssue {
                        source: name.clone(),
                        object,
                        reason: e.to_string(),
                    });
                }
                Step::Failed(e) => {
                    log::warn!("{name}: histogram {object} dropped from the output: {e}");
                    report.failed_entries.push(EntryIssue {
                        source: name.clone(),
                        object,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.metadata = totals;
        report.merged.push(name);
    }

    let Some(catalog) = catalog else {
        return Err(Error::NoValidInput(inputs.len()));
    };

    for merged in catalog.terminate() {
        sink.write_histogram(&merged.path, &merged.name, merged.histogram)?;
        report.histograms_written += 1;
    }

    let mut header = FileHeader::new(options.output_data_type.clone(), report.metadata);
    header.combined_files = report.merged.clone();
    sink.write_header(header)?;
    sink.finalize()?;

    log::info!("{}", report.summary());
    Ok(report)
}

fn open_tagged<S: Store>(store: &S, path: &Path) -> Result<S::Source> {
    let source = store.open(path)?;
    source.check_tag(&ACCEPTED_DATA_TYPES)?;
    Ok(source)
}

fn prepare_output<K: StructuredSink>(sink: &mut K, catalog: &HistogramCatalog) -> Result<()> {
    for group in catalog.groups() {
        sink.ensure_group(group)?;
    }
    for aux in catalog.auxiliary() {
        sink.clone_verbatim(&aux.path, &aux.name, aux.object.clone())?;
    }
    Ok(())
}
