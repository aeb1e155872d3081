use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use rb_combine::{CombineOptions, combine};
use rb_core::{
    AuxiliaryObject, DATA_TYPE_ANALYSIS, DATA_TYPE_COMBINE, Error, FileHeader, RunMetadata,
    StructuredSink, StructuredSource,
};
use rb_hist::{Axis, Histogram};
use rb_store::{ContainerFile, ContainerStore, ContainerWriter};

fn group(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn per_entry() -> Vec<String> {
    group(&["Event", "PerEntryHistograms"])
}

fn simple() -> Vec<String> {
    group(&["Event", "SimpleHistograms"])
}

/// Per-file mean histogram: one bin holding `value` with standard error `error`.
struct Mean {
    value: f64,
    error: f64,
    entries: u64,
    bins: usize,
}

fn mean(value: f64, error: f64, entries: u64) -> Mean {
    Mean { value, error, entries, bins: 1 }
}

fn write_input(path: &Path, primary: Option<Mean>, hits: f64, events: u64) {
    let mut w = ContainerWriter::create(path, true).unwrap();
    if let Some(m) = primary {
        let mut h =
            Histogram::new("Primary", "", vec![Axis::uniform(m.bins, 0.0, 1.0).unwrap()]).unwrap();
        for i in 0..m.bins as isize {
            assert!(h.set_bin(&[i], m.value, m.error));
        }
        w.write_histogram(&per_entry(), "Primary", h.with_entries(m.entries)).unwrap();
    }
    let mut h = Histogram::new("Hits", "", vec![Axis::uniform(2, 0.0, 2.0).unwrap()]).unwrap();
    assert!(h.set_bin(&[0], hits, 1.0));
    assert!(h.set_bin(&[-1], 1.0, 0.0));
    w.write_histogram(&simple(), "Hits", h.with_entries(1)).unwrap();
    w.clone_verbatim(
        &[],
        "Model",
        AuxiliaryObject {
            class_name: "Model".into(),
            payload: serde_json::json!({"file": events}),
        },
    )
    .unwrap();
    let metadata =
        RunMetadata { n_original_events: events, n_events_requested: events, ..Default::default() };
    w.write_header(FileHeader::new(DATA_TYPE_ANALYSIS, metadata)).unwrap();
    w.finalize().unwrap();
}

fn read(path: &Path, group: &[String], name: &str) -> Histogram {
    ContainerFile::open(path).unwrap().read_histogram(group, name).unwrap()
}

fn run(out: &Path, inputs: &[PathBuf]) -> rb_combine::CombineReport {
    combine(&ContainerStore, out, inputs, &CombineOptions::default()).unwrap()
}

#[test]
fn three_single_bin_means() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("in{i}.json"))).collect();
    for (i, (p, v)) in inputs.iter().zip([2.0, 4.0, 6.0]).enumerate() {
        write_input(p, Some(mean(v, 0.0, 1)), 5.0, 10 + i as u64);
    }
    let out = dir.path().join("out.json");
    let report = run(&out, &inputs);

    assert_eq!(report.merged.len(), 3);
    assert_eq!(report.histograms_written, 2);
    assert!(report.skipped.is_empty() && report.missing.is_empty());

    let primary = read(&out, &per_entry(), "Primary");
    assert_eq!(primary.entries(), 3);
    assert_relative_eq!(primary.content(&[0]).unwrap(), 4.0, max_relative = 1e-12);
    let expected_error = (8.0f64 / 6.0).sqrt();
    assert_relative_eq!(primary.error(&[0]).unwrap(), expected_error, max_relative = 1e-12);

    let hits = read(&out, &simple(), "Hits");
    assert_eq!(hits.content(&[0]), Some(15.0));
    assert_eq!(hits.content(&[-1]), Some(3.0));
    assert_relative_eq!(hits.error(&[0]).unwrap(), 3f64.sqrt(), max_relative = 1e-12);

    let f = ContainerFile::open(&out).unwrap();
    let header = f.header();
    assert_eq!(header.data_type, DATA_TYPE_COMBINE);
    assert_eq!(header.metadata.n_original_events, 33);
    assert_eq!(header.metadata.n_events_requested, 33);
    let names: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
    assert_eq!(header.combined_files, names);
    // Auxiliary data comes from the first valid source, unmerged.
    assert_eq!(f.read_auxiliary(&[], "Model").unwrap().payload, serde_json::json!({"file": 10}));
}

#[test]
fn missing_histogram_is_skipped_for_that_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let c = dir.path().join("c.json");
    write_input(&a, Some(mean(2.0, 0.5, 10)), 1.0, 10);
    write_input(&b, None, 1.0, 10);
    write_input(&c, Some(mean(6.0, 0.25, 30)), 1.0, 30);

    let out = dir.path().join("abc.json");
    let report = run(&out, &[a.clone(), b, c.clone()]);
    assert_eq!(report.merged.len(), 3);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].object, "Event/PerEntryHistograms/Primary");

    let out_ac = dir.path().join("ac.json");
    run(&out_ac, &[a, c]);

    let with_gap = read(&out, &per_entry(), "Primary");
    let without = read(&out_ac, &per_entry(), "Primary");
    assert_eq!(with_gap.entries(), 40);
    assert_eq!(with_gap.entries(), without.entries());
    assert_relative_eq!(with_gap.content(&[0]).unwrap(), 5.0, max_relative = 1e-12);
    assert_eq!(with_gap.contents(), without.contents());
    assert_eq!(with_gap.errors(), without.errors());

    // Sums still see all three files.
    assert_eq!(read(&out, &simple(), "Hits").content(&[0]), Some(3.0));
}

#[test]
fn corrupt_first_source_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let zombie = dir.path().join("zombie.json");
    std::fs::write(&zombie, b"{\"header\": {\"data_type\": ").unwrap();
    let b = dir.path().join("b.json");
    let c = dir.path().join("c.json");
    write_input(&b, Some(mean(1.0, 0.0, 1)), 1.0, 7);
    write_input(&c, Some(mean(3.0, 0.0, 1)), 1.0, 5);

    let out = dir.path().join("out.json");
    let report = run(&out, &[zombie.clone(), b, c]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, zombie.display().to_string());
    assert_eq!(report.metadata.n_original_events, 12);

    let f = ContainerFile::open(&out).unwrap();
    assert_eq!(f.header().metadata.n_original_events, 12);
    assert_eq!(f.header().combined_files.len(), 2);
    assert_eq!(f.read_auxiliary(&[], "Model").unwrap().payload, serde_json::json!({"file": 7}));
    assert_eq!(read(&out, &per_entry(), "Primary").content(&[0]), Some(2.0));
}

#[test]
fn untagged_source_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write_input(&a, Some(mean(1.0, 0.0, 1)), 1.0, 1);
    write_input(&b, Some(mean(9.0, 0.0, 1)), 1.0, 1);
    let text = std::fs::read_to_string(&b).unwrap().replace(DATA_TYPE_ANALYSIS, "SOMETHINGELSE");
    std::fs::write(&b, text).unwrap();

    let out = dir.path().join("out.json");
    let report = run(&out, &[a, b]);
    assert_eq!(report.merged.len(), 1);
    assert!(report.skipped[0].reason.contains("SOMETHINGELSE"));
    assert_eq!(read(&out, &per_entry(), "Primary").content(&[0]), Some(1.0));
}

#[test]
fn wildcard_output_fails_before_opening_sources() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("*.json");
    let inputs = vec![dir.path().join("missing1.json"), dir.path().join("missing2.json")];
    let err = combine(&ContainerStore, &out, &inputs, &CombineOptions::default()).unwrap_err();
    assert!(matches!(err, Error::OutputPath { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn too_few_and_no_valid_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.json");
    let a = dir.path().join("a.json");
    write_input(&a, Some(mean(1.0, 0.0, 1)), 1.0, 1);

    let err = combine(&ContainerStore, &out, &[a], &CombineOptions::default()).unwrap_err();
    assert!(matches!(err, Error::TooFewInputs(1)));

    let bad = vec![dir.path().join("nope1.json"), dir.path().join("nope2.json")];
    let err = combine(&ContainerStore, &out, &bad, &CombineOptions::default()).unwrap_err();
    assert!(matches!(err, Error::NoValidInput(2)));
    assert!(!out.exists());
    // Only a.json remains; the staged output was cleaned up.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn existing_output_needs_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write_input(&a, Some(mean(1.0, 0.0, 1)), 1.0, 1);
    write_input(&b, Some(mean(3.0, 0.0, 1)), 1.0, 1);
    let out = dir.path().join("out.json");
    std::fs::write(&out, "keep me").unwrap();

    let inputs = vec![a, b];
    let err = combine(&ContainerStore, &out, &inputs, &CombineOptions::default()).unwrap_err();
    assert!(matches!(err, Error::OutputPath { .. }));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "keep me");

    let opts = CombineOptions { overwrite: true, ..Default::default() };
    combine(&ContainerStore, &out, &inputs, &opts).unwrap();
    assert_eq!(read(&out, &per_entry(), "Primary").content(&[0]), Some(2.0));
}

#[test]
fn combined_outputs_combine_again() {
    let dir = tempfile::tempdir().unwrap();
    let specs = [mean(2.0, 0.3, 10), mean(4.5, 0.1, 25), mean(3.0, 0.7, 4), mean(1.0, 0.2, 12)];
    let inputs: Vec<PathBuf> = specs
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let p = dir.path().join(format!("f{i}.json"));
            write_input(&p, Some(m), i as f64, 100);
            p
        })
        .collect();

    let flat = dir.path().join("flat.json");
    run(&flat, &inputs);
    let ab = dir.path().join("ab.json");
    let cd = dir.path().join("cd.json");
    run(&ab, &inputs[..2]);
    run(&cd, &inputs[2..]);
    let nested = dir.path().join("nested.json");
    let report = run(&nested, &[ab, cd]);
    assert_eq!(report.metadata.n_original_events, 400);

    let f = read(&flat, &per_entry(), "Primary");
    let n = read(&nested, &per_entry(), "Primary");
    assert_eq!(f.entries(), 51);
    assert_eq!(n.entries(), 51);
    assert_relative_eq!(n.content(&[0]).unwrap(), f.content(&[0]).unwrap(), max_relative = 1e-9);
    assert_relative_eq!(n.error(&[0]).unwrap(), f.error(&[0]).unwrap(), max_relative = 1e-9);

    let f_hits = read(&flat, &simple(), "Hits");
    let n_hits = read(&nested, &simple(), "Hits");
    assert_eq!(f_hits.content(&[0]), Some(6.0));
    assert_eq!(n_hits.content(&[0]), Some(6.0));
}

#[test]
fn shape_mismatch_drops_only_that_histogram() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write_input(&a, Some(mean(1.0, 0.0, 1)), 1.0, 1);
    write_input(&b, Some(Mean { bins: 3, ..mean(1.0, 0.0, 1) }), 1.0, 1);

    let out = dir.path().join("out.json");
    let report = run(&out, &[a, b.clone()]);
    assert_eq!(report.failed_entries.len(), 1);
    assert_eq!(report.failed_entries[0].source, b.display().to_string());
    assert_eq!(report.histograms_written, 1);

    let f = ContainerFile::open(&out).unwrap();
    assert!(matches!(
        f.read_histogram(&per_entry(), "Primary"),
        Err(Error::MissingHistogram { .. })
    ));
    assert_eq!(f.read_histogram(&simple(), "Hits").unwrap().content(&[0]), Some(2.0));
}

#[test]
fn thread_count_does_not_change_results() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<PathBuf> = (0..4)
        .map(|i| {
            let p = dir.path().join(format!("f{i}.json"));
            write_input(&p, Some(mean(0.1 * i as f64 + 1.0, 0.01, 3 + i)), i as f64, 5);
            p
        })
        .collect();

    let seq = dir.path().join("seq.json");
    run(&seq, &inputs);
    for threads in [0, 3] {
        let par = dir.path().join(format!("par{threads}.json"));
        let opts = CombineOptions { threads, ..Default::default() };
        combine(&ContainerStore, &par, &inputs, &opts).unwrap();
        assert_eq!(read(&seq, &per_entry(), "Primary"), read(&par, &per_entry(), "Primary"));
        assert_eq!(read(&seq, &simple(), "Hits"), read(&par, &simple(), "Hits"));
    }
}

/// Input whose mean histograms are stored under `keys` but all carry the
/// internal name `h`.
fn write_shared_name_input(path: &Path, keys: &[(&str, f64)]) {
    let mut w = ContainerWriter::create(path, true).unwrap();
    w.ensure_group(&per_entry()).unwrap();
    for &(key, value) in keys {
        let mut h = Histogram::new("h", "", vec![Axis::uniform(1, 0.0, 1.0).unwrap()]).unwrap();
        assert!(h.set_bin(&[0], value, 0.0));
        w.write_histogram(&per_entry(), key, h.with_entries(1)).unwrap();
    }
    w.write_header(FileHeader::new(DATA_TYPE_ANALYSIS, RunMetadata::default())).unwrap();
    w.finalize().unwrap();
}

#[test]
fn histograms_are_written_under_their_catalogued_key() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write_shared_name_input(&a, &[("A", 1.0), ("B", 10.0)]);
    write_shared_name_input(&b, &[("A", 3.0), ("B", 20.0)]);

    let out = dir.path().join("out.json");
    let report = run(&out, &[a, b]);
    assert_eq!(report.histograms_written, 2);

    assert_eq!(read(&out, &per_entry(), "A").content(&[0]), Some(2.0));
    assert_eq!(read(&out, &per_entry(), "B").content(&[0]), Some(15.0));
    let f = ContainerFile::open(&out).unwrap();
    assert!(matches!(f.read_histogram(&per_entry(), "h"), Err(Error::MissingHistogram { .. })));
}

#[test]
fn mean_source_with_zero_entries_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write_input(&a, Some(mean(2.0, 0.0, 1)), 1.0, 1);
    write_input(&b, Some(mean(7.0, 0.5, 0)), 1.0, 1);

    let out = dir.path().join("out.json");
    let report = run(&out, &[a, b.clone()]);
    assert_eq!(report.merged.len(), 2);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].source, b.display().to_string());
    assert_eq!(report.missing[0].object, "Event/PerEntryHistograms/Primary");
    assert!(report.missing[0].reason.contains("zero entries"));

    let primary = read(&out, &per_entry(), "Primary");
    assert_eq!(primary.entries(), 1);
    assert_eq!(primary.content(&[0]), Some(2.0));
}

#[test]
fn source_overflowing_event_totals_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let c = dir.path().join("c.json");
    write_input(&a, Some(mean(1.0, 0.0, 1)), 1.0, u64::MAX);
    write_input(&b, Some(mean(5.0, 0.0, 1)), 1.0, 1);
    write_input(&c, Some(mean(3.0, 0.0, 1)), 1.0, 0);

    let out = dir.path().join("out.json");
    let report = run(&out, &[a.clone(), b.clone(), c.clone()]);
    assert_eq!(report.merged, vec![a.display().to_string(), c.display().to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, b.display().to_string());
    assert!(report.skipped[0].reason.contains("overflow"));
    assert_eq!(report.metadata.n_original_events, u64::MAX);

    // The refused file contributes nothing.
    let primary = read(&out, &per_entry(), "Primary");
    assert_eq!(primary.entries(), 2);
    assert_eq!(primary.content(&[0]), Some(2.0));
    assert_eq!(read(&out, &simple(), "Hits").content(&[0]), Some(2.0));
}
