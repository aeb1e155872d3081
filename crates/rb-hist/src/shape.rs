//! Shape descriptor for 1–4 dimensional bin arrays with guard cells.
//!
//! Every axis `i` has `n_bins[i]` interior bins and two guard cells (underflow
//! at index `-1`, overflow at index `n_bins[i]`), so its extent is
//! `n_bins[i] + 2`. Cells are stored flat with axis 0 varying fastest:
//!
//! ```text
//! flat = (i0 + 1) + e0 * ((i1 + 1) + e1 * ((i2 + 1) + e2 * (i3 + 1)))
//! ```
//!
//! where `e_k = n_bins[k] + 2`. This matches the global-bin layout used by
//! ROOT-style histograms, so guard cells of every axis are addressable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HistError, Result};

/// Maximum supported dimensionality.
pub const MAX_DIMS: usize = 4;

/// Per-axis interior bin counts of a bin array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Shape {
    n_bins: Vec<usize>,
}

impl Shape {
    /// Build a shape from interior bin counts (one per axis, 1–4 axes, each ≥ 1).
    pub fn new(n_bins: &[usize]) -> Result<Self> {
        if n_bins.is_empty() || n_bins.len() > MAX_DIMS {
            return Err(HistError::InvalidShape(format!(
                "dimensionality must be 1..={MAX_DIMS}, got {}",
                n_bins.len()
            )));
        }
        if let Some(axis) = n_bins.iter().position(|&n| n == 0) {
            return Err(HistError::InvalidShape(format!("axis {axis} has zero bins")));
        }
        Ok(Self { n_bins: n_bins.to_vec() })
    }

    /// Dimensionality (number of axes).
    #[inline]
    pub fn dims(&self) -> usize {
        self.n_bins.len()
    }

    /// Interior bin counts per axis.
    #[inline]
    pub fn n_bins(&self) -> &[usize] {
        &self.n_bins
    }

    /// Extent of `axis` including both guard cells.
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        self.n_bins[axis] + 2
    }

    /// Total number of cells, guard cells included.
    pub fn n_cells(&self) -> usize {
        self.n_bins.iter().map(|n| n + 2).product()
    }

    /// Flat offset of a cell given per-axis bin indices in `-1..=n_bins[axis]`.
    ///
    /// Returns `None` when the number of indices differs from the dimensionality
    /// or any index is outside the guarded range.
    pub fn flat_index(&self, index: &[isize]) -> Option<usize> {
        if index.len() != self.dims() {
            return None;
        }
        let mut flat = 0usize;
        for axis in (0..self.dims()).rev() {
            let i = index[axis];
            if i < -1 || i > self.n_bins[axis] as isize {
                return None;
            }
            flat = flat * self.extent(axis) + (i + 1) as usize;
        }
        Some(flat)
    }

    /// Decompose a flat offset into per-axis bin indices.
    pub fn cell_index(&self, mut flat: usize) -> CellIndex {
        let mut idx = [0isize; MAX_DIMS];
        for (axis, slot) in idx.iter_mut().enumerate().take(self.dims()) {
            let e = self.extent(axis);
            *slot = (flat % e) as isize - 1;
            flat /= e;
        }
        CellIndex { idx, dims: self.dims() }
    }

    /// Iterate every cell (guards included) in storage order.
    pub fn cells(&self) -> Cells<'_> {
        Cells { shape: self, next: 0, end: self.n_cells() }
    }

    /// Fail with [`HistError::ShapeMismatch`] unless `other` is identical.
    pub fn ensure_same(&self, other: &Shape) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(HistError::ShapeMismatch { expected: self.clone(), found: other.clone() })
        }
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = HistError;

    fn try_from(n_bins: Vec<usize>) -> Result<Self> {
        Shape::new(&n_bins)
    }
}

impl From<Shape> for Vec<usize> {
    fn from(shape: Shape) -> Self {
        shape.n_bins
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D[", self.dims())?;
        for (i, n) in self.n_bins.iter().enumerate() {
            if i > 0 {
                f.write_str("x")?;
            }
            write!(f, "{n}")?;
        }
        f.write_str("]")
    }
}

/// Per-axis bin indices of one cell; guard cells are `-1` and `n_bins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellIndex {
    idx: [isize; MAX_DIMS],
    dims: usize,
}

impl CellIndex {
    /// Indices for the populated axes.
    #[inline]
    pub fn as_slice(&self) -> &[isize] {
        &self.idx[..self.dims]
    }

    /// Whether the cell is a guard (under/overflow) cell on any axis.
    pub fn is_guard(&self, shape: &Shape) -> bool {
        self.as_slice()
            .iter()
            .zip(shape.n_bins())
            .any(|(&i, &n)| i == -1 || i == n as isize)
    }
}

/// Iterator over every cell of a [`Shape`] in flat storage order.
pub struct Cells<'a> {
    shape: &'a Shape,
    next: usize,
    end: usize,
}

impl Iterator for Cells<'_> {
    type Item = (usize, CellIndex);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let flat = self.next;
        self.next += 1;
        Some((flat, self.shape.cell_index(flat)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Cells<'_> {}
