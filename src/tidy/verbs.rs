use hashbrown::HashMap;
use itertools::Itertools;
use log::{
    debug,
    warn,
};
use polars::prelude::*;

use super::eval::{
    evaluate,
    matching_rows,
    sorted_rows,
};
use super::group::{
    frame_keys,
    group_rows,
};
use crate::data_structs::{
    Dataset,
    CELL_ID,
};
use crate::error::{
    Result,
    TidyError,
};
use crate::plsmallstr;
use crate::utils::{
    column_as_strings,
    positions_to_idx,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl Dataset {
    /// Keeps the cells for which `predicate` is true.
    ///
    /// The predicate may read stored metadata and embedding coordinates.
    /// An empty result is returned as a valid zero-cell dataset.
    pub fn filter(
        &self,
        predicate: Expr,
    ) -> Result<Dataset> {
        let rows = matching_rows(self, predicate)?;
        if rows.is_empty() {
            warn!("Empty selection: filter retained 0 of {} cells", self.n_cells());
        }
        self.reindex(&rows)
    }

    /// Projects the tabular view onto the named columns. `cell_id` is always
    /// kept.
    ///
    /// Stored metadata columns that are not named are dropped. Embedding
    /// coordinates are computed, so they only disappear from [`Self::frame`]
    /// and stay available through [`Self::frame_all`] and expressions.
    pub fn select<S: AsRef<str>>(
        &self,
        columns: &[S],
    ) -> Result<Dataset> {
        let names = columns.iter().map(|c| c.as_ref()).unique().collect_vec();
        self.require_columns(names.iter().copied())?;
        let (stored, computed): (Vec<&str>, Vec<&str>) = names
            .into_iter()
            .filter(|n| *n != CELL_ID)
            .partition(|n| self.cells().has_column(n));

        let cells = self
            .cells()
            .select(&stored.iter().map(|s| s.to_string()).collect_vec())?;
        let mut out = self.clone().with_cells(cells);
        out.set_visible(Some(computed.iter().map(|s| s.to_string()).collect_vec()));
        Ok(out)
    }

    /// Adds or overwrites metadata column `name` with the value of `expr`.
    ///
    /// The expression is evaluated once against the current values, so the
    /// new column can never feed back into its own definition.
    pub fn mutate(
        mut self,
        name: &str,
        expr: Expr,
    ) -> Result<Dataset> {
        if name == CELL_ID {
            return Err(TidyError::ProtectedColumn(CELL_ID.to_string()));
        }
        let column = evaluate(&self, name, expr)?;
        if self.cells().has_column(name) {
            debug!("Overwriting metadata column '{name}'");
        }
        else if self.embeddings().column_names().iter().any(|n| n == name) {
            warn!("Metadata column '{name}' shadows an embedding coordinate");
        }
        self.cells_mut().with_column(column)?;
        Ok(self)
    }

    /// Reorders cells by `column`. Stable for ties; nulls first.
    pub fn arrange(
        &self,
        column: &str,
        order: SortOrder,
    ) -> Result<Dataset> {
        let rows = sorted_rows(self, column, order == SortOrder::Descending)?;
        self.reindex(&rows)
    }

    /// Renames a stored metadata column.
    pub fn rename(
        &self,
        old: &str,
        new: &str,
    ) -> Result<Dataset> {
        let cells = self.cells().rename(old, new)?;
        Ok(self.clone().with_cells(cells))
    }

    /// Cells `offset..offset + len`, clamped to the dataset size.
    pub fn slice(
        &self,
        offset: usize,
        len: usize,
    ) -> Result<Dataset> {
        let end = offset.saturating_add(len).min(self.n_cells());
        let rows = (offset.min(end)..end).collect_vec();
        self.reindex(&rows)
    }

    /// A single column of the tabular view, stored or computed.
    pub fn pull(
        &self,
        column: &str,
    ) -> Result<Series> {
        self.require_columns([column])?;
        let frame = self.frame_all()?;
        Ok(frame.column(column)?.as_materialized_series().clone())
    }

    /// Distinct combinations of the given columns, in order of first
    /// appearance.
    pub fn distinct<S: AsRef<str>>(
        &self,
        columns: &[S],
    ) -> Result<DataFrame> {
        let names = columns.iter().map(|c| c.as_ref()).collect_vec();
        self.require_columns(names.iter().copied())?;
        let frame = self.frame_all()?;
        let groups = group_rows(frame_keys(&frame, &names)?);
        let first = groups.values().map(|rows| rows[0]).collect_vec();
        Ok(frame.select(names)?.take(&positions_to_idx(&first))?)
    }

    /// Number of cells per distinct value of `column` (columns `column`, `n`).
    pub fn count(
        &self,
        column: &str,
    ) -> Result<DataFrame> {
        self.require_columns([column])?;
        let frame = self.frame_all()?;
        let groups = group_rows(frame_keys(&frame, &[column])?);
        let first = groups.values().map(|rows| rows[0]).collect_vec();
        let counts = groups.values().map(|rows| rows.len() as u32).collect_vec();
        let mut out = frame.select([column])?.take(&positions_to_idx(&first))?;
        out.with_column(Series::new(plsmallstr!("n"), counts))?;
        Ok(out)
    }

    /// Attaches the columns of an external table whose `on` column matches
    /// this dataset's `on` column. Keys are compared as strings.
    ///
    /// Unmatched cells receive nulls. A key present more than once in
    /// `table` fails with `CardinalityMismatch`, since a join may never
    /// duplicate cells.
    pub fn left_join(
        self,
        table: &DataFrame,
        on: &str,
    ) -> Result<Dataset> {
        self.require_columns([on])?;
        let table_keys = column_as_strings(
            table
                .column(on)
                .map_err(|_| TidyError::ColumnNotFound(on.to_string()))?,
        )?;

        let mut lookup: HashMap<&str, usize> = HashMap::with_capacity(table_keys.len());
        for (row, key) in table_keys.iter().enumerate() {
            if let Some(key) = key.as_deref() {
                if lookup.insert(key, row).is_some() {
                    return Err(TidyError::cardinality(
                        format!("join key '{key}'"),
                        "at most 1 row",
                        table_keys.iter().filter(|k| k.as_deref() == Some(key)).count(),
                    ));
                }
            }
        }

        let own_keys = column_as_strings(self.frame_all()?.column(on)?)?;
        let idx: IdxCa = own_keys
            .iter()
            .map(|key| {
                key.as_deref()
                    .and_then(|k| lookup.get(k))
                    .map(|row| *row as IdxSize)
            })
            .collect();
        let matched = own_keys
            .iter()
            .filter(|k| k.as_deref().is_some_and(|k| lookup.contains_key(k)))
            .count();
        debug!("left_join on '{on}': {matched} of {} cells matched", self.n_cells());

        let others = table
            .get_column_names()
            .into_iter()
            .filter(|n| n.as_str() != on)
            .cloned()
            .collect_vec();
        let joined = table.select(others)?.take(&idx)?;

        let mut out = self;
        for column in joined.get_columns() {
            out.cells_mut().with_column(column.clone())?;
        }
        Ok(out)
    }
}
