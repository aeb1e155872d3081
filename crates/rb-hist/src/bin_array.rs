//! Dense 1–4 dimensional cell storage including guard cells.

use serde::{Deserialize, Serialize};

use crate::error::{HistError, Result};
use crate::shape::{CellIndex, Shape};

/// Flat `f64` storage for every cell of a [`Shape`], guard cells included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBinArray", into = "RawBinArray")]
pub struct BinArray {
    shape: Shape,
    data: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawBinArray {
    shape: Shape,
    data: Vec<f64>,
}

impl TryFrom<RawBinArray> for BinArray {
    type Error = HistError;

    fn try_from(raw: RawBinArray) -> Result<Self> {
        BinArray::from_vec(raw.shape, raw.data)
    }
}

impl From<BinArray> for RawBinArray {
    fn from(a: BinArray) -> Self {
        RawBinArray { shape: a.shape, data: a.data }
    }
}

impl BinArray {
    /// All-zero array of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let data = vec![0.0; shape.n_cells()];
        Self { shape, data }
    }

    /// Array with every cell (guards included) set to `value`.
    pub fn filled(shape: Shape, value: f64) -> Self {
        let data = vec![value; shape.n_cells()];
        Self { shape, data }
    }

    /// Wrap flat data laid out as described in [`crate::shape`].
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Result<Self> {
        let cells = shape.n_cells();
        if data.len() != cells {
            return Err(HistError::DataLength { shape, cells, len: data.len() });
        }
        Ok(Self { shape, data })
    }

    /// Shape of the array.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Dimensionality.
    #[inline]
    pub fn dims(&self) -> usize {
        self.shape.dims()
    }

    /// Number of cells, guards included.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a valid shape; present for API symmetry with slices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat cell values.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable flat cell values.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume into the flat cell values.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Value at per-axis bin indices (`-1` and `n_bins` address the guard cells).
    pub fn get(&self, index: &[isize]) -> Option<f64> {
        self.shape.flat_index(index).map(|i| self.data[i])
    }

    /// Set the value at per-axis bin indices; returns `false` if out of range.
    pub fn set(&mut self, index: &[isize], value: f64) -> bool {
        match self.shape.flat_index(index) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// Iterate `(cell, value)` over every cell in storage order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellIndex, f64)> + '_ {
        self.shape.cells().map(move |(flat, cell)| (cell, self.data[flat]))
    }

    /// Fail with [`HistError::ShapeMismatch`] unless `other` has the same shape.
    #[inline]
    pub fn ensure_same_shape(&self, other: &BinArray) -> Result<()> {
        self.shape.ensure_same(&other.shape)
    }

    /// Elementwise `self += other`.
    pub fn add_assign(&mut self, other: &BinArray) -> Result<()> {
        self.ensure_same_shape(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        Ok(())
    }

    /// Apply `f` to every cell.
    pub fn map_in_place(&mut self, mut f: impl FnMut(f64) -> f64) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// Sum over every cell, guards included.
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }
}
