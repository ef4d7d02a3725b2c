mod common;

use common::{
    init_logger,
    DemoDatasetBuilder,
};
use tidysc::prelude::*;

#[test]
fn double_toggle_restores_rendering() -> anyhow::Result<()> {
    init_logger();
    let dataset = DemoDatasetBuilder::new(100, 10, 3).build();
    let nested = dataset.nest("cell_type")?;

    let start = DisplayMode::current();
    let dataset_before = dataset.to_string();
    let nested_before = nested.to_string();

    DisplayMode::toggle();
    assert_ne!(DisplayMode::current(), start);
    assert_ne!(dataset.to_string(), dataset_before);

    DisplayMode::toggle();
    assert_eq!(DisplayMode::current(), start);
    assert_eq!(dataset.to_string(), dataset_before);
    assert_eq!(nested.to_string(), nested_before);
    Ok(())
}

#[test]
fn explicit_context_ignores_global_mode() -> anyhow::Result<()> {
    let dataset = DemoDatasetBuilder::new(20, 5, 3).build();
    let context = RenderContext::new(DisplayMode::Native).with_max_rows(3);
    let native = dataset.render(&context)?;
    assert!(native.starts_with("Dataset with 5 features across 20 cells"));
    assert!(native.contains("counts: sparse [5 × 20] (default)"));
    assert!(native.contains("umap: UMAP (2 dims)"));

    let tidy = dataset.render(&context.with_mode(DisplayMode::Tidy))?;
    assert!(tidy.contains("cell_type"));

    let json = serde_json::to_value(dataset.summary())?;
    assert_eq!(json["n_cells"], 20);
    assert_eq!(json["assays"][1]["name"], "logcounts");
    Ok(())
}
