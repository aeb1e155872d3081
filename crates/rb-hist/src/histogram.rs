//! Histogram type shared by the reducer, the accumulators and the container store.

use serde::{Deserialize, Serialize};

use crate::bin_array::BinArray;
use crate::error::{HistError, Result};
use crate::shape::Shape;

/// How the per-bin errors of a histogram are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorConvention {
    /// Content is a mean over `entries` samples; error is the standard error of that mean.
    #[default]
    StandardErrorOfMean,
    /// Content is a plain sum of weights; error is `sqrt(sum of weights squared)`.
    Counting,
}

impl ErrorConvention {
    /// Short label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            ErrorConvention::StandardErrorOfMean => "standard-error-of-mean",
            ErrorConvention::Counting => "counting",
        }
    }
}

/// One histogram axis described by its bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis title (may be empty).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Bin edges (length = n_bins + 1, strictly increasing).
    pub edges: Vec<f64>,
}

impl Axis {
    /// `n_bins` equal-width bins on `[lo, hi)`.
    pub fn uniform(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 || !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(HistError::InvalidAxis(format!(
                "uniform axis needs n_bins > 0 and finite lo < hi (got {n_bins}, {lo}, {hi})"
            )));
        }
        let width = (hi - lo) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| lo + i as f64 * width).collect();
        edges.push(hi);
        Ok(Self { title: String::new(), edges })
    }

    /// Variable-width axis from explicit edges.
    pub fn variable(edges: Vec<f64>) -> Result<Self> {
        let axis = Self { title: String::new(), edges };
        axis.validate()?;
        Ok(axis)
    }

    /// Attach a title.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Number of interior bins.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    fn validate(&self) -> Result<()> {
        if self.edges.len() < 2 {
            return Err(HistError::InvalidAxis("need at least two edges".into()));
        }
        if self.edges.iter().any(|e| !e.is_finite()) {
            return Err(HistError::InvalidAxis("non-finite bin edge".into()));
        }
        if self.edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HistError::InvalidAxis("bin edges must be strictly increasing".into()));
        }
        Ok(())
    }
}

/// A 1–4 dimensional histogram with per-cell contents and errors (guard cells included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHistogram", into = "RawHistogram")]
pub struct Histogram {
    name: String,
    title: String,
    axes: Vec<Axis>,
    contents: BinArray,
    errors: BinArray,
    entries: u64,
    convention: ErrorConvention,
}

#[derive(Serialize, Deserialize)]
struct RawHistogram {
    name: String,
    #[serde(default)]
    title: String,
    axes: Vec<Axis>,
    contents: BinArray,
    errors: BinArray,
    #[serde(default)]
    entries: u64,
    #[serde(default)]
    error_convention: ErrorConvention,
}

impl TryFrom<RawHistogram> for Histogram {
    type Error = HistError;

    fn try_from(raw: RawHistogram) -> Result<Self> {
        Histogram::from_parts(
            raw.name,
            raw.title,
            raw.axes,
            raw.contents,
            raw.errors,
            raw.entries,
            raw.error_convention,
        )
    }
}

impl From<Histogram> for RawHistogram {
    fn from(h: Histogram) -> Self {
        RawHistogram {
            name: h.name,
            title: h.title,
            axes: h.axes,
            contents: h.contents,
            errors: h.errors,
            entries: h.entries,
            error_convention: h.convention,
        }
    }
}

impl Histogram {
    /// Empty histogram (all cells zero, zero entries).
    pub fn new(name: impl Into<String>, title: impl Into<String>, axes: Vec<Axis>) -> Result<Self> {
        let shape = shape_of(&axes)?;
        Ok(Self {
            name: name.into(),
            title: title.into(),
            axes,
            contents: BinArray::zeros(shape.clone()),
            errors: BinArray::zeros(shape),
            entries: 0,
            convention: ErrorConvention::default(),
        })
    }

    /// Assemble a histogram from its parts, checking that every array matches the axes.
    pub fn from_parts(
        name: String,
        title: String,
        axes: Vec<Axis>,
        contents: BinArray,
        errors: BinArray,
        entries: u64,
        convention: ErrorConvention,
    ) -> Result<Self> {
        let shape = shape_of(&axes)?;
        shape.ensure_same(contents.shape())?;
        shape.ensure_same(errors.shape())?;
        Ok(Self { name, title, axes, contents, errors, entries, convention })
    }

    /// Same metadata and binning, all cells zeroed and no entries.
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            title: self.title.clone(),
            axes: self.axes.clone(),
            contents: BinArray::zeros(self.shape().clone()),
            errors: BinArray::zeros(self.shape().clone()),
            entries: 0,
            convention: self.convention,
        }
    }

    /// Builder-style convention override.
    pub fn with_convention(mut self, convention: ErrorConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Builder-style entry count override.
    pub fn with_entries(mut self, entries: u64) -> Self {
        self.entries = entries;
        self
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Axes.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Shape shared by contents and errors.
    #[inline]
    pub fn shape(&self) -> &Shape {
        self.contents.shape()
    }

    /// Dimensionality.
    #[inline]
    pub fn dims(&self) -> usize {
        self.contents.dims()
    }

    /// Per-cell contents.
    pub fn contents(&self) -> &BinArray {
        &self.contents
    }

    /// Per-cell errors.
    pub fn errors(&self) -> &BinArray {
        &self.errors
    }

    /// Number of underlying samples (or merged sources for sums).
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Error convention.
    pub fn convention(&self) -> ErrorConvention {
        self.convention
    }

    /// Content at per-axis bin indices (`-1` / `n_bins` are the guard cells).
    pub fn content(&self, index: &[isize]) -> Option<f64> {
        self.contents.get(index)
    }

    /// Error at per-axis bin indices.
    pub fn error(&self, index: &[isize]) -> Option<f64> {
        self.errors.get(index)
    }

    /// Set content and error of one cell; returns `false` if out of range.
    pub fn set_bin(&mut self, index: &[isize], content: f64, error: f64) -> bool {
        self.contents.set(index, content) && self.errors.set(index, error)
    }

    /// Replace contents and errors wholesale.
    pub fn set_arrays(&mut self, contents: BinArray, errors: BinArray) -> Result<()> {
        self.shape().ensure_same(contents.shape())?;
        self.shape().ensure_same(errors.shape())?;
        self.contents = contents;
        self.errors = errors;
        Ok(())
    }

    /// Set the entry count.
    pub fn set_entries(&mut self, entries: u64) {
        self.entries = entries;
    }

    /// Install merged arrays whose shape the caller derived from `self`.
    pub(crate) fn into_merged(
        mut self,
        contents: BinArray,
        errors: BinArray,
        entries: u64,
        convention: ErrorConvention,
    ) -> Self {
        debug_assert_eq!(self.shape(), contents.shape());
        debug_assert_eq!(self.shape(), errors.shape());
        self.contents = contents;
        self.errors = errors;
        self.entries = entries;
        self.convention = convention;
        self
    }
}

fn shape_of(axes: &[Axis]) -> Result<Shape> {
    for axis in axes {
        axis.validate()?;
    }
    let n_bins: Vec<usize> = axes.iter().map(Axis::n_bins).collect();
    Shape::new(&n_bins)
}
