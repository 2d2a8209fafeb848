use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense 2-D matrix of `f64` in row-major (C-order) layout.
///
/// Rows are samples, columns are features. Rectangularity is the only
/// invariant; it is enforced at construction so the fit/predict code can
/// index without re-checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a matrix from flat row-major data.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> ModelResult<Self> {
        if data.len() != rows * cols {
            return Err(ModelError::DimensionMismatch {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Matrix { data, rows, cols })
    }

    /// Matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Build from nested rows; every row must have the same width.
    pub fn from_rows(rows: &[Vec<f64>]) -> ModelResult<Self> {
        if rows.is_empty() {
            return Ok(Matrix::zeros(0, 0));
        }
        let cols = rows[0].len();
        for row in rows {
            if row.len() != cols {
                return Err(ModelError::DimensionMismatch {
                    expected: cols,
                    got: row.len(),
                });
            }
        }
        let data: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Matrix::new(data, rows.len(), cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Element access. Panics when out of bounds; callers validate shape at
    /// the pipeline boundary, and debug builds check both indices so a bad
    /// column index cannot silently read the next row.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i * self.cols + j] = value;
    }

    /// Borrow a single row as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Copy out the rows named by `indices`, in order.
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matrix({} x {})", self.rows, self.cols)
    }
}

/// Dense 2-D matrix of leaf identifiers in row-major layout.
///
/// Rows are samples; each column holds the identifier of the leaf the sample
/// reached in one tree of a fitted ensemble. Identifiers are opaque
/// categorical tokens, never ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafMatrix {
    data: Vec<u32>,
    rows: usize,
    cols: usize,
}

impl LeafMatrix {
    pub fn new(data: Vec<u32>, rows: usize, cols: usize) -> ModelResult<Self> {
        if data.len() != rows * cols {
            return Err(ModelError::DimensionMismatch {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(LeafMatrix { data, rows, cols })
    }

    /// Build from one column per tree; every column must have the same
    /// number of samples.
    pub fn from_columns(columns: &[Vec<u32>]) -> ModelResult<Self> {
        if columns.is_empty() {
            return Ok(LeafMatrix {
                data: Vec::new(),
                rows: 0,
                cols: 0,
            });
        }
        let rows = columns[0].len();
        for col in columns {
            if col.len() != rows {
                return Err(ModelError::DimensionMismatch {
                    expected: rows,
                    got: col.len(),
                });
            }
        }
        let cols = columns.len();
        let mut data = vec![0u32; rows * cols];
        for (j, col) in columns.iter().enumerate() {
            for (i, &leaf) in col.iter().enumerate() {
                data[i * cols + j] = leaf;
            }
        }
        Ok(LeafMatrix { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u32 {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i * self.cols + j]
    }

    pub fn row(&self, i: usize) -> &[u32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over the identifiers in column `j`.
    pub fn column(&self, j: usize) -> impl Iterator<Item = u32> + '_ {
        (0..self.rows).map(move |i| self.data[i * self.cols + j])
    }
}
