//! Dense plaintext matrices
//!
//! Used to prepare data before slot encoding and to verify results in the
//! clear (held-out loss, plaintext reference training). A vector is a matrix
//! with one singleton dimension.

use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result};

/// Dense row-major matrix of `f64`
///
/// # Fields
///
/// * `rows` - Number of rows
/// * `cols` - Number of columns
/// * `data` - Entries in row-major order, `rows * cols` long
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlainMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl PlainMatrix {
    /// Create a zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create a matrix from row vectors
    ///
    /// # Errors
    ///
    /// Configuration error if the rows have different lengths
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(num_rows * num_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != num_cols {
                return Err(config_err!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    num_cols
                ));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: num_rows,
            cols: num_cols,
            data,
        })
    }

    /// Create an `n x 1` column vector
    pub fn column(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Check if the matrix has no entries
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry at `(i, j)`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// Set the entry at `(i, j)`
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// Row `i` as a slice
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Entries in row-major order
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Unravel a row or column vector into a flat `Vec`
    ///
    /// # Errors
    ///
    /// Configuration error if neither dimension is 1
    pub fn to_vector(&self) -> Result<Vec<f64>> {
        if self.rows != 1 && self.cols != 1 {
            return Err(config_err!(
                "{} x {} matrix is not a row or column vector",
                self.rows,
                self.cols
            ));
        }
        Ok(self.data.clone())
    }

    /// Textbook matrix product `self * other`
    pub fn matmul(&self, other: &PlainMatrix) -> Result<PlainMatrix> {
        if self.cols != other.rows {
            return Err(config_err!(
                "matmul dimension mismatch: {} x {} times {} x {}",
                self.rows,
                self.cols,
                other.rows,
                other.cols
            ));
        }
        let mut out = PlainMatrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }
        Ok(out)
    }

    /// Transpose
    pub fn transpose(&self) -> PlainMatrix {
        let mut out = PlainMatrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(j, i, self.get(i, j));
            }
        }
        out
    }

    /// Multiply every entry by `t`, in place
    pub fn scale(&mut self, t: f64) {
        self.data.iter_mut().for_each(|x| *x *= t);
    }

    /// Compute `t * self`
    pub fn scaled(&self, t: f64) -> PlainMatrix {
        let mut out = self.clone();
        out.scale(t);
        out
    }

    /// Elementwise `self - other`
    pub fn sub(&self, other: &PlainMatrix) -> Result<PlainMatrix> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Apply the logistic function to every entry, in place
    pub fn sigmoid_in_place(&mut self) {
        self.data.iter_mut().for_each(|x| *x = sigmoid(*x));
    }

    /// Apply `f` to every entry
    pub fn map(&self, f: impl Fn(f64) -> f64) -> PlainMatrix {
        PlainMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    fn zip_with(
        &self,
        other: &PlainMatrix,
        op: &str,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<PlainMatrix> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(config_err!(
                "{} dimension mismatch: {} x {} vs {} x {}",
                op,
                self.rows,
                self.cols,
                other.rows,
                other.cols
            ));
        }
        Ok(PlainMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}

/// Logistic function `1 / (1 + e^-x)`
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
