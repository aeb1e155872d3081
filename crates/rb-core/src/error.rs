//! Error types for the combine workspace.

use std::path::PathBuf;

use rb_hist::HistError;
use thiserror::Error;

/// Combine error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Histogram shape or convention error
    #[error(transparent)]
    Hist(#[from] HistError),

    /// Source file missing, unreadable or corrupt
    #[error("cannot open {}: {reason}", path.display())]
    Open {
        /// Offending file.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// File opens but is not a recognised, supported output file
    #[error("{} is not a usable output file: {reason}", path.display())]
    TypeTag {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with the header.
        reason: String,
    },

    /// A catalogued histogram is absent from a source
    #[error("histogram {object} not found in {}", path.display())]
    MissingHistogram {
        /// Source file.
        path: PathBuf,
        /// `group/.../name` of the missing histogram.
        object: String,
    },

    /// Output path rejected before the run starts
    #[error("invalid output path {}: {reason}", path.display())]
    OutputPath {
        /// Requested output path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// None of the given inputs could be opened as a tagged output file
    #[error("no valid input files among the {0} given")]
    NoValidInput(usize),

    /// Fewer than two input paths were given
    #[error("at least two input files are required, got {0}")]
    TooFewInputs(usize),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Whether the error only concerns one source (or one entry of it) and the
    /// run can continue without it.
    pub fn is_source_local(&self) -> bool {
        matches!(
            self,
            Error::Open { .. }
                | Error::TypeTag { .. }
                | Error::MissingHistogram { .. }
                | Error::Hist(_)
                | Error::Json(_)
        )
    }

    /// Whether this is a binning disagreement between a catalog entry and a source.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Error::Hist(HistError::ShapeMismatch { .. }))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rb_hist::Shape;

    #[test]
    fn classification() {
        let missing = Error::MissingHistogram { path: "a.json".into(), object: "x/h".into() };
        assert!(missing.is_source_local());
        assert!(!Error::NoValidInput(3).is_source_local());
        let output = Error::OutputPath { path: "*.json".into(), reason: "glob".into() };
        assert!(!output.is_source_local());

        let mismatch: Error = HistError::ShapeMismatch {
            expected: Shape::new(&[1]).unwrap(),
            found: Shape::new(&[2]).unwrap(),
        }
        .into();
        assert!(mismatch.is_shape_mismatch());
        assert!(mismatch.to_string().contains("1D[1]"));
    }
}
