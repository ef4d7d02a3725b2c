use std::sync::Arc;

use log::{
    debug,
    warn,
};
use polars::prelude::*;

use super::dataset::Dataset;
use super::embedding::{
    Embedding,
    EmbeddingStore,
};
use super::matrix::Matrix;
use super::metadata::{
    CellTable,
    FeatureTable,
};
use super::store::ColumnarStore;
use super::view::IndexView;
use crate::error::{
    Result,
    TidyError,
};

/// Builder for assembling and validating a [`Dataset`].
///
/// Identifier uniqueness is always enforced. Shape checks and the scan for
/// non-finite values can be switched off for trusted producers.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    cells:            Option<DataFrame>,
    features:         Option<DataFrame>,
    assays:           ColumnarStore,
    embeddings:       EmbeddingStore,
    default_assay:    Option<String>,
    check_dimensions: bool,
    check_finite:     bool,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::all_checks()
    }
}

impl DatasetBuilder {
    /// Creates a builder with all data validation checks enabled.
    pub fn all_checks() -> Self {
        Self {
            cells:            None,
            features:         None,
            assays:           ColumnarStore::new(),
            embeddings:       EmbeddingStore::new(),
            default_assay:    None,
            check_dimensions: true,
            check_finite:     true,
        }
    }

    /// Creates a builder with shape and value checks disabled.
    pub fn no_checks() -> Self {
        Self {
            check_dimensions: false,
            check_finite: false,
            ..Self::all_checks()
        }
    }

    crate::with_field_fn!(check_dimensions, bool);

    crate::with_field_fn!(check_finite, bool);

    /// Sets the cell metadata. Must contain a unique `cell_id` column.
    pub fn with_cells(
        mut self,
        cells: DataFrame,
    ) -> Self {
        self.cells = Some(cells);
        self
    }

    /// Sets the feature metadata. Must contain a unique `feature_id` column.
    pub fn with_features(
        mut self,
        features: DataFrame,
    ) -> Self {
        self.features = Some(features);
        self
    }

    pub fn add_assay(
        mut self,
        name: &str,
        matrix: Matrix,
    ) -> Self {
        self.assays.insert(name, matrix);
        self
    }

    pub fn add_embedding(
        mut self,
        name: &str,
        embedding: Embedding,
    ) -> Self {
        self.embeddings.insert(name, embedding);
        self
    }

    /// Overrides the default assay, which is otherwise the first one added.
    pub fn with_default_assay(
        mut self,
        name: Option<&str>,
    ) -> Self {
        self.default_assay = name.map(str::to_string);
        self
    }

    pub fn build(self) -> Result<Dataset> {
        let cells = CellTable::try_new(
            self.cells
                .ok_or_else(|| TidyError::InvalidDataset("no cell metadata".to_string()))?,
        )?;
        let features = FeatureTable::try_new(
            self.features
                .ok_or_else(|| TidyError::InvalidDataset("no feature metadata".to_string()))?,
        )?;
        let mut assays = self.assays;
        if let Some(name) = self.default_assay.as_deref() {
            assays.set_default(name)?;
        }
        if assays.is_empty() {
            warn!("Building a dataset without assays");
        }

        self.embeddings.check_unique_columns()?;
        if self.check_dimensions {
            check_dimensions(&cells, &features, &assays, &self.embeddings)?;
        }
        if self.check_finite {
            check_finite(&assays, &self.embeddings)?;
        }

        debug!(
            "Built dataset: {} cells, {} features, {} assays, {} embeddings",
            cells.height(),
            features.len(),
            assays.len(),
            self.embeddings.len()
        );
        let view = IndexView::identity(cells.height());
        Ok(unsafe {
            Dataset::from_parts_unchecked(
                Arc::new(assays),
                Arc::new(features),
                Arc::new(self.embeddings),
                cells,
                view,
            )
        })
    }
}

fn check_dimensions(
    cells: &CellTable,
    features: &FeatureTable,
    assays: &ColumnarStore,
    embeddings: &EmbeddingStore,
) -> Result<()> {
    let n_cells = cells.height();
    for (name, matrix) in assays.iter() {
        if matrix.n_cells() != n_cells {
            return Err(TidyError::cardinality(
                format!("assay '{name}' cells"),
                n_cells,
                matrix.n_cells(),
            ));
        }
        if matrix.n_features() != features.len() {
            return Err(TidyError::cardinality(
                format!("assay '{name}' features"),
                features.len(),
                matrix.n_features(),
            ));
        }
    }
    for (name, embedding) in embeddings.iter() {
        if embedding.n_cells() != n_cells {
            return Err(TidyError::cardinality(
                format!("embedding '{name}' cells"),
                n_cells,
                embedding.n_cells(),
            ));
        }
    }
    Ok(())
}

fn check_finite(
    assays: &ColumnarStore,
    embeddings: &EmbeddingStore,
) -> Result<()> {
    for (name, matrix) in assays.iter() {
        let finite = match matrix {
            Matrix::Dense(arr) => arr.iter().all(|v| v.is_finite()),
            Matrix::Sparse(csr) => csr.values().iter().all(|v| v.is_finite()),
        };
        if !finite {
            return Err(TidyError::InvalidDataset(format!(
                "assay '{name}' holds non-finite values"
            )));
        }
    }
    for (name, embedding) in embeddings.iter() {
        if !embedding.coords().iter().all(|v| v.is_finite()) {
            return Err(TidyError::InvalidDataset(format!(
                "embedding '{name}' holds non-finite values"
            )));
        }
    }
    Ok(())
}
