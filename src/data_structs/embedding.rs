use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use ndarray::{
    concatenate,
    Array2,
    ArrayView2,
    Axis,
};
use polars::prelude::*;

use crate::error::{
    Result,
    TidyError,
};
use crate::plsmallstr;
use crate::utils::first_duplicate;

/// Per-cell coordinates of one low-dimensional projection (cells × dims).
///
/// Coordinates surface in the tabular view as computed columns named
/// `<key>_<dim>` with 1-based dims, e.g. `UMAP_1`, `UMAP_2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    key:    String,
    coords: Array2<f64>,
}

impl Embedding {
    pub fn new(
        key: impl Into<String>,
        coords: Array2<f64>,
    ) -> Self {
        Self {
            key: key.into(),
            coords,
        }
    }

    crate::getter_fn!(key, String);

    crate::getter_fn!(coords, Array2<f64>);

    pub fn n_cells(&self) -> usize {
        self.coords.nrows()
    }

    pub fn n_dims(&self) -> usize {
        self.coords.ncols()
    }

    pub fn column_names(&self) -> Vec<String> {
        (1..=self.n_dims())
            .map(|d| format!("{}_{}", self.key, d))
            .collect_vec()
    }

    /// Coordinate columns at the given backing cell positions.
    pub fn columns_at(
        &self,
        cells: &[usize],
    ) -> Vec<Column> {
        self.column_names()
            .into_iter()
            .enumerate()
            .map(|(dim, name)| {
                let axis = self.coords.column(dim);
                let values = cells.iter().map(|c| axis[*c]).collect_vec();
                Column::from(Series::new(plsmallstr!(name.as_str()), values))
            })
            .collect_vec()
    }

    pub fn take_cells(
        &self,
        cells: &[usize],
    ) -> Self {
        Self {
            key:    self.key.clone(),
            coords: self.coords.select(Axis(0), cells),
        }
    }
}

/// Named embeddings over the backing cell axis.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    embeddings: IndexMap<String, Arc<Embedding>>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        embedding: Embedding,
    ) {
        self.embeddings.insert(name.into(), Arc::new(embedding));
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Embedding> {
        self.embeddings.get(name).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Embedding)> {
        self.embeddings.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.embeddings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Every computed coordinate column name, in store order.
    pub fn column_names(&self) -> Vec<String> {
        self.embeddings
            .values()
            .flat_map(|e| e.column_names())
            .collect_vec()
    }

    /// Fails when two embeddings emit the same coordinate column, e.g. two
    /// embeddings keyed `UMAP`.
    pub fn check_unique_columns(&self) -> Result<()> {
        let names = self.column_names();
        match first_duplicate(names.iter().map(String::as_str)) {
            Some(column) => Err(TidyError::InvalidDataset(format!(
                "embedding column '{column}' is emitted by more than one embedding"
            ))),
            None => Ok(()),
        }
    }

    pub fn columns_at(
        &self,
        cells: &[usize],
    ) -> Vec<Column> {
        self.embeddings
            .values()
            .flat_map(|e| e.columns_at(cells))
            .collect_vec()
    }

    pub fn take_cells(
        &self,
        cells: &[usize],
    ) -> Self {
        Self {
            embeddings: self
                .embeddings
                .iter()
                .map(|(name, e)| (name.clone(), Arc::new(e.take_cells(cells))))
                .collect(),
        }
    }

    /// Stacks embeddings along the cell axis. Every part must hold the same
    /// embeddings with the same dimensionality.
    pub fn concat_cells(parts: &[&EmbeddingStore]) -> Result<Self> {
        let Some(first) = parts.first()
        else {
            return Ok(Self::default());
        };
        let mut out = Self::default();
        for (name, embedding) in first.iter() {
            let mut blocks: Vec<ArrayView2<f64>> = Vec::with_capacity(parts.len());
            for part in parts {
                match part.get(name) {
                    Some(other) if other.n_dims() == embedding.n_dims() => {
                        blocks.push(other.coords.view())
                    },
                    Some(other) => {
                        return Err(TidyError::cardinality(
                            format!("embedding '{name}' dims"),
                            embedding.n_dims(),
                            other.n_dims(),
                        ))
                    },
                    None => {
                        return Err(TidyError::cardinality(
                            "embedding names",
                            first.names().join(","),
                            part.names().join(","),
                        ))
                    },
                }
            }
            let stacked = concatenate(Axis(0), &blocks).map_err(|e| {
                TidyError::InvalidDataset(format!("embedding concatenation: {e}"))
            })?;
            out.insert(name, Embedding::new(embedding.key(), stacked));
        }
        if let Some(extra) = parts.iter().find(|p| p.len() != first.len()) {
            return Err(TidyError::cardinality(
                "embedding names",
                first.names().join(","),
                extra.names().join(","),
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn umap() -> Embedding {
        Embedding::new("UMAP", array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]])
    }

    #[test]
    fn test_column_names_are_one_based() {
        assert_eq!(umap().column_names(), vec!["UMAP_1", "UMAP_2"]);
    }

    #[test]
    fn test_columns_at_view() {
        let cols = umap().columns_at(&[2, 0]);
        assert_eq!(cols.len(), 2);
        let second = cols[1].f64().unwrap().into_no_null_iter().collect_vec();
        assert_eq!(second, vec![5.0, 1.0]);
    }

    #[test]
    fn test_shared_key_columns_rejected() {
        let mut store = EmbeddingStore::new();
        store.insert("umap", umap());
        assert!(store.check_unique_columns().is_ok());
        store.insert("umap_harmony", umap());
        assert!(matches!(
            store.check_unique_columns(),
            Err(TidyError::InvalidDataset(msg)) if msg.contains("UMAP_1")
        ));
    }

    #[test]
    fn test_concat_dimension_mismatch() {
        let mut a = EmbeddingStore::new();
        a.insert("umap", umap());
        let mut b = EmbeddingStore::new();
        b.insert("umap", Embedding::new("UMAP", array![[0.0, 1.0, 2.0]]));
        assert!(EmbeddingStore::concat_cells(&[&a, &b]).is_err());
        let stacked = EmbeddingStore::concat_cells(&[&a, &a]).unwrap();
        assert_eq!(stacked.get("umap").unwrap().n_cells(), 6);
    }
}
