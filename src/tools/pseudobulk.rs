use itertools::Itertools;
use log::info;
use polars::prelude::*;
use rayon::prelude::*;

use crate::data_structs::{
    Dataset,
    FEATURE_ID,
};
use crate::error::Result;
use crate::tidy::group::{
    column_keys,
    group_rows,
};
use crate::utils::{
    positions_to_idx,
    THREAD_POOL,
};

pub const N_CELLS: &str = "n_cells";

/// Sums assay values per group of cells sharing `key`.
///
/// Returns one row per (group, feature) with columns `key`, `feature_id`,
/// `value` and `n_cells`, groups in order of first appearance. Features are
/// processed in parallel on the crate pool, one backing row each.
pub fn aggregate_cells(
    dataset: &Dataset,
    key: &str,
    assay: Option<&str>,
) -> Result<DataFrame> {
    dataset.require_columns([key])?;
    let frame = dataset.frame_all()?;
    let groups = group_rows(column_keys(frame.column(key)?)?);
    let (assay_name, matrix) = dataset.store().resolve(assay)?;
    let positions = dataset.view().positions();
    info!(
        "Aggregating assay '{assay_name}' over {} groups of '{key}'",
        groups.len()
    );

    let members = groups.values().collect_vec();
    // sums[feature][group]
    let sums: Vec<Vec<f64>> = THREAD_POOL.install(|| {
        (0..dataset.n_features())
            .into_par_iter()
            .map(|feature| {
                let row = matrix.row_at(feature, positions);
                members
                    .iter()
                    .map(|rows| rows.iter().map(|r| row[*r]).sum::<f64>())
                    .collect_vec()
            })
            .collect()
    });

    let n_features = dataset.n_features();
    let first = members
        .iter()
        .flat_map(|rows| std::iter::repeat(rows[0]).take(n_features))
        .collect_vec();
    let mut out = frame.select([key])?.take(&positions_to_idx(&first))?;
    let feature_ids = dataset.features().ids().collect_vec();
    let feature_col = (0..members.len())
        .flat_map(|_| feature_ids.iter().copied())
        .collect_vec();
    let value_col = (0..members.len())
        .flat_map(|group| sums.iter().map(move |per_group| per_group[group]))
        .collect_vec();
    let count_col = members
        .iter()
        .flat_map(|rows| std::iter::repeat(rows.len() as u32).take(n_features))
        .collect_vec();
    out.with_column(Series::new(FEATURE_ID.into(), feature_col))?;
    out.with_column(Series::new("value".into(), value_col))?;
    out.with_column(Series::new(N_CELLS.into(), count_col))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    use super::*;
    use crate::data_structs::{
        DatasetBuilder,
        Matrix,
    };

    #[test]
    fn test_sums_per_group() {
        let ds = DatasetBuilder::default()
            .with_cells(
                df!("cell_id" => ["a", "b", "c", "d"], "sample" => ["s1", "s2", "s1", "s2"])
                    .unwrap(),
            )
            .with_features(df!("feature_id" => ["G1", "G2"]).unwrap())
            .add_assay(
                "counts",
                Matrix::sparse_from_triplets(2, 4, vec![(0, 0, 1.0), (0, 2, 2.5), (1, 3, 4.0)])
                    .unwrap(),
            )
            .build()
            .unwrap();
        let out = aggregate_cells(&ds, "sample", None).unwrap();
        assert_eq!(out.height(), 4);
        let samples = out.column("sample").unwrap().str().unwrap().into_no_null_iter().collect_vec();
        assert_eq!(samples, vec!["s1", "s1", "s2", "s2"]);
        let values = out.column("value").unwrap().f64().unwrap().into_no_null_iter().collect_vec();
        assert_approx_eq!(values[0], 3.5);
        assert_approx_eq!(values[1], 0.0);
        assert_approx_eq!(values[3], 4.0);
        let n = out.column(N_CELLS).unwrap().u32().unwrap().get(0);
        assert_eq!(n, Some(2));
    }
}
