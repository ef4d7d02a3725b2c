//! Gene×cell numeric matrices backing an assay.
//!
//! Rows are features, columns are cells. Dense matrices are
//! `ndarray::Array2<f64>`, sparse ones are CSR with one compressed row per
//! feature, so pulling a single feature is a slice of the row data.

use itertools::Itertools;
use nalgebra_sparse::CsrMatrix;
use ndarray::{
    concatenate,
    Array2,
    ArrayView2,
    Axis,
};

use crate::error::{
    Result,
    TidyError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Matrix {
    Dense(Array2<f64>),
    Sparse(CsrMatrix<f64>),
}

impl From<Array2<f64>> for Matrix {
    fn from(value: Array2<f64>) -> Self {
        Matrix::Dense(value)
    }
}

impl From<CsrMatrix<f64>> for Matrix {
    fn from(value: CsrMatrix<f64>) -> Self {
        Matrix::Sparse(value)
    }
}

impl Matrix {
    /// Builds a sparse matrix from `(feature, cell, value)` triplets.
    /// Repeated coordinates are summed.
    pub fn sparse_from_triplets(
        n_features: usize,
        n_cells: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> Result<Self> {
        if let Some((row, col, _)) = triplets
            .iter()
            .find(|(row, col, _)| *row >= n_features || *col >= n_cells)
        {
            return Err(TidyError::InvalidDataset(format!(
                "triplet ({row}, {col}) out of bounds for ({n_features}, {n_cells})"
            )));
        }
        let (rows, cols, values): (Vec<_>, Vec<_>, Vec<_>) =
            triplets.into_iter().multiunzip();
        let coo = nalgebra_sparse::CooMatrix::try_from_triplets(
            n_features, n_cells, rows, cols, values,
        )
        .map_err(|e| TidyError::InvalidDataset(format!("sparse assay: {e}")))?;
        Ok(Matrix::Sparse(CsrMatrix::from(&coo)))
    }

    /// (n_features, n_cells).
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Matrix::Dense(arr) => arr.dim(),
            Matrix::Sparse(csr) => (csr.nrows(), csr.ncols()),
        }
    }

    pub fn n_features(&self) -> usize {
        self.shape().0
    }

    pub fn n_cells(&self) -> usize {
        self.shape().1
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Matrix::Sparse(_))
    }

    pub fn get(
        &self,
        feature: usize,
        cell: usize,
    ) -> Option<f64> {
        let (n_features, n_cells) = self.shape();
        if feature >= n_features || cell >= n_cells {
            return None;
        }
        match self {
            Matrix::Dense(arr) => arr.get((feature, cell)).copied(),
            Matrix::Sparse(csr) => {
                let row = csr.row(feature);
                Some(
                    row.col_indices()
                        .binary_search(&cell)
                        .map(|i| row.values()[i])
                        .unwrap_or(0.0),
                )
            },
        }
    }

    /// Values of one feature at the given cell positions, in position order.
    ///
    /// Reads a single backing row; the rest of the matrix is never touched.
    pub fn row_at(
        &self,
        feature: usize,
        cells: &[usize],
    ) -> Vec<f64> {
        match self {
            Matrix::Dense(arr) => {
                let row = arr.row(feature);
                cells.iter().map(|c| row[*c]).collect_vec()
            },
            Matrix::Sparse(csr) => {
                let row = csr.row(feature);
                let mut dense = vec![0.0; csr.ncols()];
                for (col, value) in row.col_indices().iter().zip(row.values()) {
                    dense[*col] = *value;
                }
                cells.iter().map(|c| dense[*c]).collect_vec()
            },
        }
    }

    /// Copies the given cell columns, in the given order, into a new matrix.
    pub fn take_cells(
        &self,
        cells: &[usize],
    ) -> Result<Self> {
        match self {
            Matrix::Dense(arr) => Ok(Matrix::Dense(arr.select(Axis(1), cells))),
            Matrix::Sparse(csr) => {
                let mut new_col: Vec<Option<usize>> = vec![None; csr.ncols()];
                for (new, old) in cells.iter().enumerate() {
                    new_col[*old] = Some(new);
                }
                let mut offsets = Vec::with_capacity(csr.nrows() + 1);
                let mut indices = Vec::new();
                let mut values = Vec::new();
                offsets.push(0);
                for row in csr.row_iter() {
                    let entries = row
                        .col_indices()
                        .iter()
                        .zip(row.values())
                        .filter_map(|(col, value)| new_col[*col].map(|c| (c, *value)))
                        .sorted_by_key(|(c, _)| *c);
                    for (col, value) in entries {
                        indices.push(col);
                        values.push(value);
                    }
                    offsets.push(indices.len());
                }
                let csr = CsrMatrix::try_from_csr_data(
                    csr.nrows(),
                    cells.len(),
                    offsets,
                    indices,
                    values,
                )
                .map_err(|e| TidyError::InvalidDataset(format!("sparse assay: {e}")))?;
                Ok(Matrix::Sparse(csr))
            },
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            Matrix::Dense(arr) => arr.clone(),
            Matrix::Sparse(csr) => {
                let mut dense = Array2::zeros((csr.nrows(), csr.ncols()));
                for (row, col, value) in csr.triplet_iter() {
                    dense[(row, col)] = *value;
                }
                dense
            },
        }
    }

    /// Concatenates matrices along the cell axis. The result is sparse only
    /// when every part is sparse.
    pub fn hstack(parts: &[&Matrix]) -> Result<Self> {
        let n_features = parts.first().map(|m| m.n_features()).unwrap_or(0);
        if let Some(bad) = parts.iter().find(|m| m.n_features() != n_features) {
            return Err(TidyError::cardinality(
                "assay feature axis",
                n_features,
                bad.n_features(),
            ));
        }

        if parts.iter().all(|m| m.is_sparse()) {
            let n_cells = parts.iter().map(|m| m.n_cells()).sum();
            let mut triplets = Vec::new();
            let mut offset = 0;
            for part in parts {
                if let Matrix::Sparse(csr) = part {
                    triplets.extend(
                        csr.triplet_iter()
                            .map(|(row, col, value)| (row, col + offset, *value)),
                    );
                    offset += csr.ncols();
                }
            }
            Matrix::sparse_from_triplets(n_features, n_cells, triplets)
        }
        else {
            let dense = parts.iter().map(|m| m.to_dense()).collect_vec();
            let views: Vec<ArrayView2<f64>> = dense.iter().map(|a| a.view()).collect();
            let stacked = concatenate(Axis(1), &views).map_err(|e| {
                TidyError::InvalidDataset(format!("assay concatenation: {e}"))
            })?;
            Ok(Matrix::Dense(stacked))
        }
    }
}
