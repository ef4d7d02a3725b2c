use indexmap::IndexMap;
use itertools::Itertools;
use log::{
    debug,
    info,
};
use polars::prelude::*;
use rayon::prelude::*;

use super::group::{
    column_keys,
    group_rows,
};
use crate::data_structs::{
    Dataset,
    Payload,
    ScalarValue,
};
use crate::error::{
    Result,
    TidyError,
};
use crate::utils::{
    n_threads,
    positions_to_idx,
    THREAD_POOL,
};

/// Column holding the nested datasets produced by [`Dataset::nest`].
pub const DATA: &str = "data";

/// One row per distinct key value; every other column holds a [`Payload`]
/// per row.
#[derive(Debug, Clone)]
pub struct NestedTable {
    key:     String,
    keys:    DataFrame,
    columns: IndexMap<String, Vec<Payload>>,
    /// Zero-cell dataset returned when an empty table is unnested.
    empty:   Dataset,
}

impl Dataset {
    /// Groups cells by `key`, one nested dataset per distinct value.
    ///
    /// Groups appear in order of first appearance and nulls form a group of
    /// their own. Nested datasets share this dataset's backing storage.
    pub fn nest(
        &self,
        key: &str,
    ) -> Result<NestedTable> {
        if key == DATA {
            return Err(TidyError::ProtectedColumn(DATA.to_string()));
        }
        self.require_columns([key])?;
        let frame = self.frame_all()?;
        let key_column = frame.column(key)?;
        let groups = group_rows(column_keys(key_column)?);

        let first = groups.values().map(|rows| rows[0]).collect_vec();
        let keys = frame.select([key])?.take(&positions_to_idx(&first))?;
        let nested = groups
            .values()
            .map(|rows| self.reindex(rows).map(Payload::Dataset))
            .collect::<Result<Vec<_>>>()?;
        debug!("Nested {} cells into {} groups by '{key}'", self.n_cells(), nested.len());

        Ok(NestedTable {
            key: key.to_string(),
            keys,
            columns: IndexMap::from([(DATA.to_string(), nested)]),
            empty: self.reindex(&[])?,
        })
    }
}

impl NestedTable {
    crate::getter_fn!(keys, DataFrame);

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.keys.height()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.height() == 0
    }

    /// Key values as scalars, one per row.
    pub fn key_values(&self) -> Result<Vec<ScalarValue>> {
        column_keys(self.keys.column(&self.key)?)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(
        &self,
        name: &str,
    ) -> Result<&[Payload]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TidyError::ColumnNotFound(name.to_string()))
    }

    fn datasets(
        &self,
        column: &str,
    ) -> Result<Vec<&Dataset>> {
        self.column(column)?
            .iter()
            .enumerate()
            .map(|(row, payload)| {
                payload.as_dataset().ok_or_else(|| TidyError::PayloadMismatch {
                    column: column.to_string(),
                    row,
                    found: payload.kind().to_string(),
                })
            })
            .collect()
    }

    /// Concatenates the nested datasets of `column` back into one dataset,
    /// re-checking that cell ids are globally unique.
    pub fn unnest(
        &self,
        column: &str,
    ) -> Result<Dataset> {
        let parts = self.datasets(column)?;
        if parts.is_empty() {
            return Ok(self.empty.clone());
        }
        let out = Dataset::concat(&parts)?;
        debug!("Unnested {} groups into {} cells", parts.len(), out.n_cells());
        Ok(out)
    }

    /// Applies `function` to every nested dataset of `column` in parallel and
    /// returns a new table with the results in `new_column`.
    ///
    /// The table itself is left untouched. The first failing group fails the
    /// whole call.
    pub fn map<F>(
        &self,
        column: &str,
        new_column: &str,
        function: F,
    ) -> Result<NestedTable>
    where
        F: Fn(&Dataset) -> Result<Payload> + Sync + Send, {
        if new_column == self.key {
            return Err(TidyError::ProtectedColumn(new_column.to_string()));
        }
        let parts = self.datasets(column)?;
        info!(
            "Mapping over {} groups of '{column}' on {} threads",
            parts.len(),
            n_threads()
        );
        let results = THREAD_POOL.install(|| {
            parts
                .par_iter()
                .map(|ds| function(ds))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut out = self.clone();
        out.columns.insert(new_column.to_string(), results);
        Ok(out)
    }

    /// Keys plus a one-line summary of every payload.
    pub fn frame(&self) -> Result<DataFrame> {
        let mut frame = self.keys.clone();
        for (name, payloads) in self.columns.iter() {
            let summaries = payloads.iter().map(Payload::summary).collect_vec();
            frame.with_column(Series::new(name.as_str().into(), summaries))?;
        }
        Ok(frame)
    }

    /// Rows whose key satisfies `predicate`, as a new table.
    pub fn filter_keys<P>(
        &self,
        predicate: P,
    ) -> Result<NestedTable>
    where
        P: Fn(&ScalarValue) -> bool, {
        let rows = self
            .key_values()?
            .iter()
            .enumerate()
            .filter_map(|(row, key)| predicate(key).then_some(row))
            .collect_vec();
        let columns = self
            .columns
            .iter()
            .map(|(name, payloads)| {
                (
                    name.clone(),
                    rows.iter().map(|r| payloads[*r].clone()).collect_vec(),
                )
            })
            .collect();
        Ok(NestedTable {
            key: self.key.clone(),
            keys: self.keys.take(&positions_to_idx(&rows))?,
            columns,
            empty: self.empty.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rstest::*;

    use super::*;
    use crate::data_structs::{
        DatasetBuilder,
        Matrix,
    };

    #[fixture]
    fn dataset() -> Dataset {
        DatasetBuilder::default()
            .with_cells(
                df!(
                    "cell_id" => ["a", "b", "c", "d"],
                    "cell_type" => [Some("T"), Some("B"), None, Some("T")]
                )
                .unwrap(),
            )
            .with_features(df!("feature_id" => ["G1"]).unwrap())
            .add_assay("counts", Matrix::Dense(array![[1.0, 2.0, 3.0, 4.0]]))
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_nest_groups(dataset: Dataset) {
        let nested = dataset.nest("cell_type").unwrap();
        assert_eq!(nested.len(), 3);
        assert_eq!(nested.key_values().unwrap(), vec![
            ScalarValue::from("T"),
            ScalarValue::from("B"),
            ScalarValue::Null
        ]);
        let first = nested.column(DATA).unwrap()[0].as_dataset().unwrap();
        assert_eq!(first.cell_ids().unwrap(), vec!["a", "d"]);
        assert!(first.shares_backing(&dataset));
    }

    #[rstest]
    fn test_nest_key_cannot_be_data(dataset: Dataset) {
        let ds = dataset.mutate(DATA, col("cell_type")).unwrap();
        assert!(matches!(
            ds.nest(DATA),
            Err(TidyError::ProtectedColumn(name)) if name == DATA
        ));
    }

    #[rstest]
    fn test_unnest_round_trip(dataset: Dataset) {
        let back = dataset.nest("cell_type").unwrap().unnest(DATA).unwrap();
        let mut ids = back.cell_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[rstest]
    fn test_map_and_payload_mismatch(dataset: Dataset) {
        let nested = dataset.nest("cell_type").unwrap();
        let mapped = nested
            .map(DATA, "n", |ds| Ok(Payload::from(ds.n_cells())))
            .unwrap();
        let counts = mapped
            .column("n")
            .unwrap()
            .iter()
            .map(|p| p.as_scalar().cloned().unwrap())
            .collect_vec();
        assert_eq!(counts, vec![
            ScalarValue::Int(2),
            ScalarValue::Int(1),
            ScalarValue::Int(1)
        ]);
        assert!(nested.column("n").is_err());
        assert!(matches!(
            mapped.unnest("n"),
            Err(TidyError::PayloadMismatch { row: 0, .. })
        ));
    }

    #[rstest]
    fn test_map_error_fails_call(dataset: Dataset) {
        let nested = dataset.nest("cell_type").unwrap();
        let result = nested.map(DATA, "bad", |ds| {
            if ds.n_cells() == 1 {
                Err(TidyError::InvalidDataset("too small".to_string()))
            }
            else {
                Ok(Payload::from(true))
            }
        });
        assert!(result.is_err());
        assert_eq!(nested.column_names().count(), 1);
    }

    #[rstest]
    fn test_empty_unnest(dataset: Dataset) {
        let nested = dataset.nest("cell_type").unwrap().filter_keys(|_| false).unwrap();
        assert!(nested.is_empty());
        let back = nested.unnest(DATA).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.n_features(), 1);
    }
}
