//! Per-cell and per-feature attribute tables.
//!
//! Both tables wrap a `polars::DataFrame` whose first column is the unique
//! identifier (`cell_id` / `feature_id`). The cell table is aligned with the
//! dataset's index view, so its row `i` always describes viewed cell `i`.

use indexmap::IndexMap;
use itertools::Itertools;
use polars::prelude::*;

use crate::error::{
    Result,
    TidyError,
};
use crate::utils::{
    first_duplicate,
    id_column,
    positions_to_idx,
};

pub const CELL_ID: &str = "cell_id";
pub const FEATURE_ID: &str = "feature_id";

#[derive(Debug, Clone)]
pub struct CellTable {
    data: DataFrame,
}

impl CellTable {
    /// Validates identifier uniqueness and moves `cell_id` to the front.
    pub fn try_new(data: DataFrame) -> Result<Self> {
        let ids = id_column(&data, CELL_ID)?;
        if let Some(dup) = first_duplicate(ids.iter().map(String::as_str)) {
            return Err(TidyError::DuplicateCellId(dup.to_string()));
        }
        let mut order = vec![CELL_ID.to_string()];
        order.extend(
            data.get_column_names()
                .into_iter()
                .filter(|n| n.as_str() != CELL_ID)
                .map(|n| n.to_string()),
        );
        let data = data.select(order)?;
        Ok(Self { data })
    }

    /// A table holding nothing but the given identifiers.
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Result<Self> {
        let ids = ids.iter().map(|s| s.as_ref()).collect_vec();
        Self::try_new(DataFrame::new(vec![Column::from(Series::new(
            CELL_ID.into(),
            ids,
        ))])?)
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_inner(self) -> DataFrame {
        self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        id_column(&self.data, CELL_ID)
    }

    pub fn has_column(
        &self,
        name: &str,
    ) -> bool {
        self.data.get_column_index(name).is_some()
    }

    /// Stored column names, `cell_id` first.
    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect_vec()
    }

    pub fn column(
        &self,
        name: &str,
    ) -> Result<&Column> {
        self.data
            .column(name)
            .map_err(|_| TidyError::ColumnNotFound(name.to_string()))
    }

    /// Rows at the given positions relative to this table.
    pub fn take(
        &self,
        rows: &[usize],
    ) -> Result<Self> {
        let data = self.data.take(&positions_to_idx(rows))?;
        Ok(Self { data })
    }

    /// Adds or replaces a column. `cell_id` can not be replaced.
    pub fn with_column(
        &mut self,
        column: Column,
    ) -> Result<()> {
        if column.name().as_str() == CELL_ID {
            return Err(TidyError::ProtectedColumn(CELL_ID.to_string()));
        }
        if column.len() != self.height() {
            return Err(TidyError::cardinality(
                format!("column '{}'", column.name()),
                self.height(),
                column.len(),
            ));
        }
        self.data.with_column(column)?;
        Ok(())
    }

    /// Keeps `cell_id` plus the named stored columns, in the given order.
    pub fn select(
        &self,
        names: &[String],
    ) -> Result<Self> {
        let mut order = vec![CELL_ID.to_string()];
        order.extend(names.iter().filter(|n| n.as_str() != CELL_ID).cloned());
        for name in order.iter() {
            if !self.has_column(name) {
                return Err(TidyError::ColumnNotFound(name.clone()));
            }
        }
        Ok(Self {
            data: self.data.select(order)?,
        })
    }

    pub fn drop_column(
        &self,
        name: &str,
    ) -> Result<Self> {
        if name == CELL_ID {
            return Err(TidyError::ProtectedColumn(CELL_ID.to_string()));
        }
        let data = self
            .data
            .drop(name)
            .map_err(|_| TidyError::ColumnNotFound(name.to_string()))?;
        Ok(Self { data })
    }

    pub fn rename(
        &self,
        old: &str,
        new: &str,
    ) -> Result<Self> {
        if old == CELL_ID || new == CELL_ID {
            return Err(TidyError::ProtectedColumn(CELL_ID.to_string()));
        }
        if !self.has_column(old) {
            return Err(TidyError::ColumnNotFound(old.to_string()));
        }
        let mut data = self.data.clone();
        data.rename(old, new.into())?;
        Ok(Self { data })
    }

    /// Appends tables with identical columns. Global cell id uniqueness is
    /// checked by the caller.
    pub fn vstack(parts: &[&CellTable]) -> Result<Self> {
        let Some(first) = parts.first()
        else {
            return Self::from_ids::<&str>(&[]);
        };
        let names = first.column_names();
        let mut data = first.data.clone();
        for part in parts.iter().skip(1) {
            let other = part.column_names();
            if other != names {
                return Err(TidyError::cardinality(
                    "metadata columns",
                    names.join(","),
                    other.join(","),
                ));
            }
            data.vstack_mut(&part.data)?;
        }
        data.rechunk_mut();
        Ok(Self { data })
    }
}

/// Feature attributes plus an id → backing row lookup.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    data:  DataFrame,
    index: IndexMap<String, usize>,
}

impl FeatureTable {
    pub fn try_new(data: DataFrame) -> Result<Self> {
        let ids = id_column(&data, FEATURE_ID)?;
        let mut index = IndexMap::with_capacity(ids.len());
        for (row, id) in ids.into_iter().enumerate() {
            if index.contains_key(&id) {
                return Err(TidyError::InvalidDataset(format!(
                    "duplicate feature id '{id}'"
                )));
            }
            index.insert(id, row);
        }
        Ok(Self { data, index })
    }

    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Result<Self> {
        let ids = ids.iter().map(|s| s.as_ref()).collect_vec();
        Self::try_new(DataFrame::new(vec![Column::from(Series::new(
            FEATURE_ID.into(),
            ids,
        ))])?)
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Backing row of a feature.
    pub fn position(
        &self,
        id: &str,
    ) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn same_ids(
        &self,
        other: &FeatureTable,
    ) -> bool {
        self.index.len() == other.index.len() && self.ids().eq(other.ids())
    }
}
