//! Input argument expansion.

use std::path::PathBuf;

use anyhow::{Context, Result};
use glob::glob;

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Expand glob patterns among `args` (each pattern's matches sorted), keeping
/// literal paths as given and the overall argument order.
pub fn expand_inputs(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for arg in args {
        if !is_pattern(arg) {
            out.push(PathBuf::from(arg));
            continue;
        }
        let mut matched = Vec::new();
        for entry in glob(arg).with_context(|| format!("invalid input pattern '{arg}'"))? {
            match entry {
                Ok(path) => matched.push(path),
                Err(e) => tracing::warn!("error reading a match of '{arg}': {e}"),
            }
        }
        if matched.is_empty() {
            tracing::warn!("input pattern '{arg}' matched no files");
        }
        matched.sort();
        out.extend(matched);
    }
    Ok(out)
}
