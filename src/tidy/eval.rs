//! Evaluation of polars expressions against a dataset's tabular view.

use itertools::Itertools;
use polars::prelude::*;

use crate::data_structs::Dataset;
use crate::error::Result;

const MASK_NAME: &str = "__tidysc_mask";
const ROW_NAME: &str = "__tidysc_row";

/// Names of every column an expression reads.
pub fn referenced_columns(expr: &Expr) -> Vec<String> {
    expr.into_iter()
        .flat_map(|node| match node {
            Expr::Column(name) => vec![name.to_string()],
            Expr::Columns(names) => names.iter().map(|n| n.to_string()).collect_vec(),
            _ => vec![],
        })
        .unique()
        .collect_vec()
}

/// Evaluates `expr` over every row; scalar results are broadcast.
pub(crate) fn evaluate(
    dataset: &Dataset,
    name: &str,
    expr: Expr,
) -> Result<Column> {
    let referenced = referenced_columns(&expr);
    dataset.require_columns(referenced.iter().map(String::as_str))?;
    let out = dataset
        .frame_all()?
        .lazy()
        .with_column(expr.alias(name))
        .select([col(name)])
        .collect()?;
    Ok(out.column(name)?.clone())
}

/// Rows (relative to the current view) for which `predicate` holds. Null
/// counts as false.
pub(crate) fn matching_rows(
    dataset: &Dataset,
    predicate: Expr,
) -> Result<Vec<usize>> {
    let mask = evaluate(dataset, MASK_NAME, predicate)?;
    let rows = mask
        .bool()?
        .into_iter()
        .enumerate()
        .filter_map(|(row, keep)| keep.unwrap_or(false).then_some(row))
        .collect_vec();
    Ok(rows)
}

/// Row permutation that sorts the tabular view by `column`. Ties keep their
/// current order and nulls come first.
pub(crate) fn sorted_rows(
    dataset: &Dataset,
    column: &str,
    descending: bool,
) -> Result<Vec<usize>> {
    dataset.require_columns([column])?;
    let options = SortMultipleOptions::default()
        .with_order_descending(descending)
        .with_maintain_order(true);
    let out = dataset
        .frame_all()?
        .lazy()
        .with_row_index(ROW_NAME, None)
        .sort_by_exprs([col(column)], options)
        .select([col(ROW_NAME)])
        .collect()?;
    let rows = out
        .column(ROW_NAME)?
        .idx()?
        .into_no_null_iter()
        .map(|i| i as usize)
        .collect_vec();
    Ok(rows)
}
