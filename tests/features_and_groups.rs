mod common;

use assert_approx_eq::assert_approx_eq;
use common::{
    floats,
    init_logger,
    strings,
    DemoDatasetBuilder,
    CELL_TYPES,
};
use hashbrown::HashSet;
use itertools::Itertools;
use polars::prelude::*;
use rstest::{
    fixture,
    rstest,
};
use tidysc::prelude::*;
use tidysc::tidy::Shape;

fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect_vec()
}

#[fixture]
fn dataset() -> Dataset {
    init_logger();
    DemoDatasetBuilder::new(100, 30, 7).build()
}

#[rstest]
fn wide_join_adds_one_column_per_feature(dataset: Dataset) -> anyhow::Result<()> {
    let joined = dataset
        .clone()
        .join_features(&["CD3D", "CD8A"], Shape::Wide, Some("logcounts"))?;
    assert_eq!(joined.height(), 100);
    let wide = joined.into_wide().unwrap();
    assert_eq!(wide.frame()?.width(), dataset.frame()?.width() + 2);
    let base = column_names(&dataset.frame()?);
    let added = column_names(&wide.frame()?)
        .into_iter()
        .filter(|name| !base.contains(name))
        .collect_vec();
    assert_eq!(added, vec!["CD3D", "CD8A"]);
    assert!(wide.shares_backing(&dataset));

    let cd8a = floats(&wide.pull("CD8A")?);
    let matrix = dataset.assay("logcounts")?;
    for (cell, value) in cd8a.iter().enumerate() {
        assert_approx_eq!(*value, matrix.get(1, cell).unwrap());
    }
    Ok(())
}

#[rstest]
fn long_join_replicates_rows(dataset: Dataset) -> anyhow::Result<()> {
    let long = dataset
        .clone()
        .join_features(&["CD3D", "CD8A"], Shape::Long, Some("logcounts"))?
        .into_long()
        .unwrap();
    assert_eq!(long.height(), 200);
    let mut expected = column_names(&dataset.frame()?);
    expected.extend(["feature_id".to_string(), "value".to_string()]);
    assert_eq!(column_names(&long), expected);

    let features = strings(long.column("feature_id")?.as_materialized_series());
    assert_eq!(&features[..4], &["CD3D", "CD8A", "CD3D", "CD8A"]);
    let values = floats(long.column("value")?.as_materialized_series());
    let matrix = dataset.assay("logcounts")?;
    assert_approx_eq!(values[3], matrix.get(1, 1).unwrap());
    Ok(())
}

#[rstest]
fn join_after_filter_reads_viewed_cells(dataset: Dataset) -> anyhow::Result<()> {
    let nk = dataset.filter(col("cell_type").eq(lit("NK")))?;
    let wide = nk
        .join_features(&["MS4A1"], Shape::Wide, None)?
        .into_wide()
        .unwrap();
    let counts = dataset.assay("counts")?;
    let values = floats(&wide.pull("MS4A1")?);
    // NK cells sit at positions 2, 5, 8, ...
    assert_eq!(values.len(), 33);
    assert_approx_eq!(values[1], counts.get(2, 5).unwrap());
    Ok(())
}

#[rstest]
fn join_errors(dataset: Dataset) {
    assert!(matches!(
        dataset.clone().join_features(&["CD3D", "CD3D"], Shape::Wide, None),
        Err(TidyError::DuplicateFeature(_))
    ));
    assert!(matches!(
        dataset.clone().join_features(&["CD3D"], Shape::Wide, Some("spliced")),
        Err(TidyError::AssayNotFound(_))
    ));
    assert!(matches!(
        dataset.join_features(&["XIST"], Shape::Long, Some("logcounts")),
        Err(TidyError::FeatureNotFound { feature, .. }) if feature == "XIST"
    ));
}

#[rstest]
fn nest_groups_sum_to_dataset(dataset: Dataset) -> anyhow::Result<()> {
    let nested = dataset.nest("cell_type")?;
    assert_eq!(nested.len(), CELL_TYPES.len());
    let sizes = nested
        .column(DATA)?
        .iter()
        .map(|p| p.as_dataset().unwrap().n_cells())
        .collect_vec();
    assert_eq!(sizes.iter().sum::<usize>(), dataset.n_cells());
    assert_eq!(sizes, vec![34, 33, 33]);
    Ok(())
}

#[rstest]
fn unnest_restores_cell_set(dataset: Dataset) -> anyhow::Result<()> {
    let back = dataset.nest("sample")?.unnest(DATA)?;
    assert!(back.shares_backing(&dataset));
    let original: HashSet<String> = dataset.cell_ids()?.into_iter().collect();
    let restored: HashSet<String> = back.cell_ids()?.into_iter().collect();
    assert_eq!(original, restored);

    let sorted = back.arrange("cell_id", SortOrder::Ascending)?;
    assert_eq!(sorted.frame()?, dataset.frame()?);
    Ok(())
}

#[rstest]
fn unnest_after_collect_concatenates_matrices(dataset: Dataset) -> anyhow::Result<()> {
    let nested = dataset.nest("cell_type")?;
    let collected = nested.map(DATA, "collected", |ds| Ok(Payload::from(ds.collect()?)))?;
    let back = collected.unnest("collected")?;
    assert!(!back.shares_backing(&dataset));
    assert_eq!(back.assay("counts")?.shape(), (30, 100));
    assert!(back.assay("counts")?.is_sparse());
    assert_eq!(back.cell_ids()?[..2], ["cell_000", "cell_003"]);
    Ok(())
}

#[rstest]
fn map_produces_heterogeneous_payloads(dataset: Dataset) -> anyhow::Result<()> {
    let nested = dataset.nest("cell_type")?;
    let with_means = nested.map(DATA, "mean_umi", |ds| {
        let values = ds.pull("nCount")?.cast(&DataType::Float64)?;
        Ok(Payload::from(values.mean().unwrap_or(f64::NAN)))
    })?;
    let with_tables = with_means.map(DATA, "table", |ds| {
        let artifact = DelimitedRenderer::default().render(ds, &["UMAP_1", "UMAP_2"])?;
        Ok(Payload::from(artifact))
    })?;

    assert!(nested.column("mean_umi").is_err());
    let means = with_tables.column("mean_umi")?;
    assert!(means.iter().all(|p| p.as_scalar().and_then(ScalarValue::as_f64).is_some()));
    let table = with_tables.column("table")?[0].as_artifact().unwrap();
    assert_eq!(table.media_type, "text/tab-separated-values");
    assert_eq!(String::from_utf8(table.bytes.clone())?.lines().count(), 35);

    let frame = with_tables.frame()?;
    assert_eq!(frame.width(), 4);
    assert!(matches!(
        with_tables.unnest("table"),
        Err(TidyError::PayloadMismatch { .. })
    ));
    Ok(())
}

#[rstest]
fn aggregate_matches_manual_sum(dataset: Dataset) -> anyhow::Result<()> {
    let bulk = aggregate_cells(&dataset, "cell_type", Some("counts"))?;
    assert_eq!(bulk.height(), CELL_TYPES.len() * dataset.n_features());

    let manual: f64 = (0..dataset.n_cells())
        .step_by(3)
        .map(|cell| dataset.assay("counts").unwrap().get(0, cell).unwrap())
        .sum();
    let first = floats(bulk.column("value")?.as_materialized_series())[0];
    assert_approx_eq!(first, manual);
    Ok(())
}
