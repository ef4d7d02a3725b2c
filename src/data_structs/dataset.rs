use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use polars::prelude::*;

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
use crate::utils::first_duplicate;

/// A multi-assay single-cell dataset seen as one table of cells.
///
/// Assays, feature metadata and embeddings are shared read-only backing
/// storage; the dataset itself owns only its cell metadata and an
/// [`IndexView`] of retained cell positions. Cloning is cheap and never
/// copies matrix data.
#[derive(Debug, Clone)]
pub struct Dataset {
    store:      Arc<ColumnarStore>,
    features:   Arc<FeatureTable>,
    embeddings: Arc<EmbeddingStore>,
    cells:      CellTable,
    view:       IndexView,
    /// Computed columns kept visible by the last `select`; `None` shows all.
    visible:    Option<Vec<String>>,
}

impl Dataset {
    /// # Safety
    /// The caller must ensure the parts satisfy every dataset invariant:
    /// `cells` aligned with `view`, every assay shaped
    /// `(features.len(), n_backing)` and every embedding `n_backing` rows
    /// long. Use [`crate::DatasetBuilder`] for checked construction.
    pub(crate) unsafe fn from_parts_unchecked(
        store: Arc<ColumnarStore>,
        features: Arc<FeatureTable>,
        embeddings: Arc<EmbeddingStore>,
        cells: CellTable,
        view: IndexView,
    ) -> Self {
        Self {
            store,
            features,
            embeddings,
            cells,
            view,
            visible: None,
        }
    }

    // ACCESSORS
    pub fn n_cells(&self) -> usize {
        self.view.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// A zero-cell dataset is valid; verbs return it instead of failing.
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn cells(&self) -> &CellTable {
        &self.cells
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn embeddings(&self) -> &EmbeddingStore {
        &self.embeddings
    }

    pub fn store(&self) -> &ColumnarStore {
        &self.store
    }

    pub fn view(&self) -> &IndexView {
        &self.view
    }

    pub fn cell_ids(&self) -> Result<Vec<String>> {
        self.cells.ids()
    }

    pub fn assay_names(&self) -> Vec<&str> {
        self.store.names().collect_vec()
    }

    pub fn default_assay(&self) -> Option<&str> {
        self.store.default_name()
    }

    /// Raw backing matrix of an assay, covering every backing cell
    /// regardless of the current view. Intended for non-tidy consumers.
    pub fn assay(
        &self,
        name: &str,
    ) -> Result<&Matrix> {
        self.store.get(name)
    }

    /// Copy of an assay restricted to the viewed cells, in view order.
    pub fn viewed_assay(
        &self,
        name: &str,
    ) -> Result<Matrix> {
        self.store.get(name)?.take_cells(self.view.positions())
    }

    /// Whether both datasets read the same backing storage.
    pub fn shares_backing(
        &self,
        other: &Dataset,
    ) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
            && Arc::ptr_eq(&self.features, &other.features)
            && Arc::ptr_eq(&self.embeddings, &other.embeddings)
    }

    pub(crate) fn set_visible(
        &mut self,
        visible: Option<Vec<String>>,
    ) {
        self.visible = visible;
    }

    pub(crate) fn cells_mut(&mut self) -> &mut CellTable {
        &mut self.cells
    }

    pub(crate) fn with_cells(
        mut self,
        cells: CellTable,
    ) -> Self {
        self.cells = cells;
        self
    }

    // TABULAR VIEW
    /// Computed embedding columns not shadowed by a stored column.
    fn computed_columns(
        &self,
        only: Option<&[String]>,
    ) -> Vec<Column> {
        self.embeddings
            .columns_at(self.view.positions())
            .into_iter()
            .filter(|c| !self.cells.has_column(c.name().as_str()))
            .filter(|c| only.map_or(true, |names| names.iter().any(|n| n == c.name().as_str())))
            .collect_vec()
    }

    fn frame_with(
        &self,
        computed: Vec<Column>,
    ) -> Result<DataFrame> {
        let mut frame = self.cells.data().clone();
        if !computed.is_empty() {
            frame.hstack_mut(&computed)?;
        }
        Ok(frame)
    }

    /// Cell metadata plus every embedding coordinate, ignoring any prior
    /// projection. Expressions are evaluated against this frame.
    pub fn frame_all(&self) -> Result<DataFrame> {
        self.frame_with(self.computed_columns(None))
    }

    /// The tabular view: stored metadata plus the computed columns that the
    /// last `select` kept (all of them if nothing was selected).
    pub fn frame(&self) -> Result<DataFrame> {
        self.frame_with(self.computed_columns(self.visible.as_deref()))
    }

    /// Every column name an expression may reference.
    pub fn column_names_all(&self) -> Vec<String> {
        let mut names = self.cells.column_names();
        names.extend(
            self.embeddings
                .column_names()
                .into_iter()
                .filter(|n| !self.cells.has_column(n)),
        );
        names
    }

    pub fn has_column(
        &self,
        name: &str,
    ) -> bool {
        self.cells.has_column(name) || self.embeddings.column_names().iter().any(|n| n == name)
    }

    pub(crate) fn require_columns<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let known = self.column_names_all();
        for name in names {
            if !known.iter().any(|k| k == name) {
                return Err(TidyError::ColumnNotFound(name.to_string()));
            }
        }
        Ok(())
    }

    // VIEWS
    /// Derives a dataset over rows `relative` of this one. The backing
    /// storage is shared.
    pub(crate) fn reindex(
        &self,
        relative: &[usize],
    ) -> Result<Self> {
        let cells = self.cells.take(relative)?;
        let view = self.view.select(relative);
        debug!("Derived view of {} cells from {}", view.len(), self.view.len());
        Ok(Self {
            store: self.store.clone(),
            features: self.features.clone(),
            embeddings: self.embeddings.clone(),
            cells,
            view,
            visible: self.visible.clone(),
        })
    }

    /// Copies the viewed cells out of every assay and embedding. The result
    /// owns fresh backing storage and an identity view.
    pub fn collect(&self) -> Result<Self> {
        let positions = self.view.positions();
        debug!(
            "Materializing {} cells across {} assays",
            positions.len(),
            self.store.len()
        );
        Ok(Self {
            store:      Arc::new(self.store.take_cells(positions)?),
            features:   self.features.clone(),
            embeddings: Arc::new(self.embeddings.take_cells(positions)),
            cells:      self.cells.clone(),
            view:       IndexView::identity(positions.len()),
            visible:    self.visible.clone(),
        })
    }

    /// Collects first unless the view already covers the backing axis in
    /// storage order.
    fn materialized(&self) -> Result<Self> {
        let backing = self
            .store
            .iter()
            .map(|(_, m)| m.n_cells())
            .chain(self.embeddings.iter().map(|(_, e)| e.n_cells()))
            .next()
            .unwrap_or(self.view.len());
        if self.view.is_identity() && backing == self.view.len() {
            Ok(self.clone())
        }
        else {
            self.collect()
        }
    }

    // COLLABORATOR SUPPORT
    /// Adds or replaces an assay aligned with the viewed cells.
    pub fn with_assay(
        &self,
        name: &str,
        matrix: Matrix,
    ) -> Result<Self> {
        if matrix.n_cells() != self.n_cells() {
            return Err(TidyError::cardinality(
                format!("assay '{name}' cells"),
                self.n_cells(),
                matrix.n_cells(),
            ));
        }
        if matrix.n_features() != self.n_features() {
            return Err(TidyError::cardinality(
                format!("assay '{name}' features"),
                self.n_features(),
                matrix.n_features(),
            ));
        }
        let mut out = self.materialized()?;
        let mut store = (*out.store).clone();
        store.insert(name, matrix);
        out.store = Arc::new(store);
        Ok(out)
    }

    /// Adds or replaces an embedding aligned with the viewed cells.
    pub fn with_embedding(
        &self,
        name: &str,
        embedding: Embedding,
    ) -> Result<Self> {
        if embedding.n_cells() != self.n_cells() {
            return Err(TidyError::cardinality(
                format!("embedding '{name}' cells"),
                self.n_cells(),
                embedding.n_cells(),
            ));
        }
        let mut out = self.materialized()?;
        let mut embeddings = (*out.embeddings).clone();
        embeddings.insert(name, embedding);
        embeddings.check_unique_columns()?;
        out.embeddings = Arc::new(embeddings);
        Ok(out)
    }

    pub fn with_default_assay(
        &self,
        name: &str,
    ) -> Result<Self> {
        let mut store = (*self.store).clone();
        store.set_default(name)?;
        let mut out = self.clone();
        out.store = Arc::new(store);
        Ok(out)
    }

    // CONCATENATION
    /// Appends datasets along the cell axis, checking global cell id
    /// uniqueness. Parts sharing backing storage are joined as a view;
    /// otherwise every part is materialized and its matrices stacked.
    pub fn concat(parts: &[&Dataset]) -> Result<Self> {
        let Some(first) = parts.first()
        else {
            return Err(TidyError::InvalidDataset(
                "no datasets to concatenate".to_string(),
            ));
        };

        let ids = parts
            .iter()
            .map(|p| p.cell_ids())
            .collect::<Result<Vec<_>>>()?;
        if let Some(dup) = first_duplicate(ids.iter().flatten().map(String::as_str)) {
            return Err(TidyError::DuplicateCellId(dup.to_string()));
        }

        let cells = CellTable::vstack(&parts.iter().map(|p| &p.cells).collect_vec())?;

        if parts.iter().all(|p| p.shares_backing(first)) {
            let view = IndexView::concat(parts.iter().map(|p| &p.view));
            debug!("Concatenated {} views over shared backing", parts.len());
            return Ok(Self {
                store: first.store.clone(),
                features: first.features.clone(),
                embeddings: first.embeddings.clone(),
                cells,
                view,
                visible: first.visible.clone(),
            });
        }

        if let Some(bad) = parts.iter().find(|p| !p.features.same_ids(&first.features)) {
            return Err(TidyError::cardinality(
                "feature ids",
                first.n_features(),
                bad.n_features(),
            ));
        }
        let collected = parts.iter().map(|p| p.collect()).collect::<Result<Vec<_>>>()?;
        let store = ColumnarStore::concat_cells(&collected.iter().map(|d| d.store.as_ref()).collect_vec())?;
        let embeddings = EmbeddingStore::concat_cells(
            &collected.iter().map(|d| d.embeddings.as_ref()).collect_vec(),
        )?;
        debug!("Concatenated {} materialized datasets", parts.len());
        Ok(Self {
            store: Arc::new(store),
            features: first.features.clone(),
            embeddings: Arc::new(embeddings),
            view: IndexView::identity(cells.height()),
            cells,
            visible: first.visible.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::data_structs::builder::DatasetBuilder;

    fn dataset() -> Dataset {
        DatasetBuilder::default()
            .with_cells(df!("cell_id" => ["a", "b", "c"], "n" => [1i64, 2, 3]).unwrap())
            .with_features(df!("feature_id" => ["G1", "G2"]).unwrap())
            .add_assay(
                "counts",
                Matrix::Dense(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]),
            )
            .add_embedding("umap", Embedding::new("UMAP", array![[0.0, 0.1], [1.0, 1.1], [2.0, 2.1]]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_reindex_shares_backing() {
        let ds = dataset();
        let sub = ds.reindex(&[2, 0]).unwrap();
        assert!(sub.shares_backing(&ds));
        assert_eq!(sub.cell_ids().unwrap(), vec!["c", "a"]);
        assert_eq!(sub.view().positions(), &[2, 0]);
        assert!(std::ptr::eq(sub.assay("counts").unwrap(), ds.assay("counts").unwrap()));
    }

    #[test]
    fn test_collect_materializes_view() {
        let sub = dataset().reindex(&[2, 0]).unwrap();
        let collected = sub.collect().unwrap();
        assert!(!collected.shares_backing(&sub));
        assert!(collected.view().is_identity());
        assert_eq!(collected.assay("counts").unwrap().get(1, 0), Some(6.0));
        assert_eq!(collected.frame().unwrap(), sub.frame().unwrap());
    }

    #[test]
    fn test_frame_includes_embeddings() {
        let ds = dataset();
        let names = ds
            .frame()
            .unwrap()
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect_vec();
        assert_eq!(names, vec!["cell_id", "n", "UMAP_1", "UMAP_2"]);
    }

    #[test]
    fn test_with_assay_checks_shape() {
        let ds = dataset().reindex(&[0, 1]).unwrap();
        let bad = Matrix::Dense(array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]]);
        assert!(matches!(
            ds.with_assay("scaled", bad),
            Err(TidyError::CardinalityMismatch { .. })
        ));
        let good = Matrix::Dense(array![[1.0, 2.0], [3.0, 4.0]]);
        let out = ds.with_assay("scaled", good).unwrap();
        assert_eq!(out.assay("scaled").unwrap().shape(), (2, 2));
        assert_eq!(out.assay("counts").unwrap().shape(), (2, 2));
    }

    #[test]
    fn test_with_embedding_rejects_column_clash() {
        let ds = dataset();
        let coords = array![[5.0, 5.1], [6.0, 6.1], [7.0, 7.1]];
        assert!(matches!(
            ds.with_embedding("umap_harmony", Embedding::new("UMAP", coords.clone())),
            Err(TidyError::InvalidDataset(_))
        ));
        // replacing the same slot keeps the columns unique
        let replaced = ds.with_embedding("umap", Embedding::new("UMAP", coords)).unwrap();
        let first = replaced.frame_all().unwrap().column("UMAP_1").unwrap().f64().unwrap().get(2);
        assert_eq!(first, Some(7.0));
    }

    #[test]
    fn test_concat_rejects_duplicate_ids() {
        let ds = dataset();
        let a = ds.reindex(&[0, 1]).unwrap();
        let b = ds.reindex(&[1, 2]).unwrap();
        assert!(matches!(
            Dataset::concat(&[&a, &b]),
            Err(TidyError::DuplicateCellId(id)) if id == "b"
        ));
    }

    #[test]
    fn test_concat_materialized_parts() {
        let ds = dataset();
        let a = ds.reindex(&[2]).unwrap().collect().unwrap();
        let b = ds.reindex(&[0, 1]).unwrap();
        let joined = Dataset::concat(&[&a, &b]).unwrap();
        assert_eq!(joined.cell_ids().unwrap(), vec!["c", "a", "b"]);
        assert_eq!(joined.assay("counts").unwrap().get(0, 0), Some(3.0));
        assert_eq!(joined.embeddings().get("umap").unwrap().n_cells(), 3);
    }
}
