//! Utility functions and helper macros used throughout the crate.
//!
//! - The crate-wide rayon thread pool, sized by `TIDYSC_NUM_THREADS`.
//! - Macros for common struct operations (getter functions, builder-style
//!   `with_*` methods) and `PlSmallStr` construction.
//! - Small helpers for moving between polars columns and plain vectors.

use hashbrown::HashSet;
use itertools::Itertools;
use once_cell::sync::Lazy;
use polars::prelude::*;
use rayon::{
    ThreadPool,
    ThreadPoolBuilder,
};

use crate::error::{
    Result,
    TidyError,
};

pub static THREAD_POOL: Lazy<ThreadPool> = Lazy::new(|| {
    let num_threads: Option<usize> = std::env::var("TIDYSC_NUM_THREADS")
        .ok()
        .and_then(|str| str.parse::<usize>().ok());
    ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .expect("Failed to create thread pool")
});

pub fn n_threads() -> usize {
    THREAD_POOL.current_num_threads()
}

#[macro_export]
macro_rules! plsmallstr {
    ($string: expr) => {
        PlSmallStr::from($string)
    };
    () => {
        PlSmallStr::from("")
    };
}

#[macro_export]
macro_rules! getter_fn {
    ($field_name: ident, $field_type: ty) => {
        pub fn $field_name(&self) -> &$field_type {
            &self.$field_name
        }
    };
}

#[macro_export]
macro_rules! with_field_fn {
    ($field_name: ident, $field_type: ty) => {
        paste::paste! {
            pub fn [<with_$field_name>](mut self, value: $field_type) -> Self {
                self.$field_name = value;
                self
            }
        }
    };
}

/// Converts view positions into a polars gather index.
pub(crate) fn positions_to_idx(positions: &[usize]) -> IdxCa {
    IdxCa::from_vec(
        plsmallstr!("idx"),
        positions.iter().map(|p| *p as IdxSize).collect_vec(),
    )
}

/// Reads a column as owned strings, casting non-string dtypes first.
/// Nulls become `None`.
pub(crate) fn column_as_strings(column: &Column) -> Result<Vec<Option<String>>> {
    let casted = column.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect_vec())
}

/// Returns the first value that occurs more than once, if any.
pub(crate) fn first_duplicate<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>, {
    let mut seen = HashSet::new();
    values.into_iter().find(|v| !seen.insert(*v))
}

/// Reads an identifier column (no nulls allowed) as owned strings.
pub(crate) fn id_column(
    frame: &DataFrame,
    name: &str,
) -> Result<Vec<String>> {
    let column = frame
        .column(name)
        .map_err(|_| TidyError::ColumnNotFound(name.to_string()))?;
    column_as_strings(column)?
        .into_iter()
        .enumerate()
        .map(|(row, id)| {
            id.ok_or_else(|| {
                TidyError::InvalidDataset(format!("null '{name}' at row {row}"))
            })
        })
        .collect()
}
