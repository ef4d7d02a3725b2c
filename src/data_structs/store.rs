use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;

use super::matrix::Matrix;
use crate::error::{
    Result,
    TidyError,
};

/// Named assays sharing one feature axis and one backing cell axis.
///
/// Matrices sit behind `Arc`, so cloning a store (or adding an assay to a
/// clone) never copies matrix data.
#[derive(Debug, Clone, Default)]
pub struct ColumnarStore {
    assays:  IndexMap<String, Arc<Matrix>>,
    default: Option<String>,
}

impl ColumnarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an assay. The first assay inserted becomes the
    /// default one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        matrix: impl Into<Arc<Matrix>>,
    ) {
        let name = name.into();
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.assays.insert(name, matrix.into());
    }

    pub fn set_default(
        &mut self,
        name: &str,
    ) -> Result<()> {
        if !self.assays.contains_key(name) {
            return Err(TidyError::AssayNotFound(name.to_string()));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Result<&Matrix> {
        self.assays
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| TidyError::AssayNotFound(name.to_string()))
    }

    /// Resolves an explicit assay name, falling back to the default assay.
    pub fn resolve(
        &self,
        name: Option<&str>,
    ) -> Result<(&str, &Matrix)> {
        let name = match name.or(self.default.as_deref()) {
            Some(name) => name,
            None => return Err(TidyError::AssayNotFound("<default>".to_string())),
        };
        let (key, matrix) = self
            .assays
            .get_key_value(name)
            .ok_or_else(|| TidyError::AssayNotFound(name.to_string()))?;
        Ok((key.as_str(), matrix.as_ref()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assays.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Matrix)> {
        self.assays.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.assays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assays.is_empty()
    }

    /// Copies the given cell columns out of every assay.
    pub fn take_cells(
        &self,
        cells: &[usize],
    ) -> Result<Self> {
        let assays = self
            .assays
            .iter()
            .map(|(name, matrix)| Ok((name.clone(), Arc::new(matrix.take_cells(cells)?))))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Self {
            assays,
            default: self.default.clone(),
        })
    }

    /// Concatenates stores along the cell axis. All parts must hold the
    /// same assay names.
    pub fn concat_cells(parts: &[&ColumnarStore]) -> Result<Self> {
        let Some(first) = parts.first()
        else {
            return Ok(Self::default());
        };
        let names = first.names().collect_vec();
        for part in parts.iter().skip(1) {
            let other = part.names().collect_vec();
            if other.len() != names.len() || other.iter().any(|n| !first.assays.contains_key(*n)) {
                return Err(TidyError::cardinality(
                    "assay names",
                    names.join(","),
                    other.join(","),
                ));
            }
        }

        let mut out = Self::default();
        for name in names {
            let matrices = parts
                .iter()
                .map(|p| p.get(name))
                .collect::<Result<Vec<_>>>()?;
            out.insert(name, Matrix::hstack(&matrices)?);
        }
        out.default = first.default.clone();
        Ok(out)
    }
}
