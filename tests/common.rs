#![allow(dead_code)]

use itertools::Itertools;
use ndarray::Array2;
use polars::prelude::*;
use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use tidysc::prelude::*;

pub const CELL_TYPES: [&str; 3] = ["T", "B", "NK"];
pub const MARKERS: [&str; 3] = ["CD3D", "CD8A", "MS4A1"];

/// Synthetic dataset: `n_cells` cells, three cell types, a dense
/// `logcounts` assay, a sparse `counts` assay and a 2-d UMAP embedding.
pub struct DemoDatasetBuilder {
    n_cells:    usize,
    n_features: usize,
    seed:       u64,
}

impl DemoDatasetBuilder {
    pub fn new(
        n_cells: usize,
        n_features: usize,
        seed: u64,
    ) -> Self {
        assert!(n_features >= MARKERS.len());
        Self {
            n_cells,
            n_features,
            seed,
        }
    }

    pub fn feature_ids(&self) -> Vec<String> {
        MARKERS
            .iter()
            .map(|m| m.to_string())
            .chain((MARKERS.len()..self.n_features).map(|i| format!("GENE{i:04}")))
            .collect_vec()
    }

    pub fn build(&self) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n = self.n_cells;

        let cell_ids = (0..n).map(|i| format!("cell_{i:03}")).collect_vec();
        let cell_types = (0..n).map(|i| CELL_TYPES[i % 3]).collect_vec();
        let samples = (0..n)
            .map(|i| format!("b{}-{}", i % 2 + 1, ["x", "y", "z"][i % 3]))
            .collect_vec();
        let n_count = (0..n).map(|_| rng.gen_range(500i64..5000)).collect_vec();
        let cells = df!(
            "cell_id" => cell_ids,
            "cell_type" => cell_types,
            "sample" => samples,
            "nCount" => n_count
        )
        .unwrap();

        let features = df!("feature_id" => self.feature_ids()).unwrap();

        let logcounts = Array2::from_shape_fn((self.n_features, n), |_| {
            if rng.gen_bool(0.3) {
                0.0
            }
            else {
                rng.gen_range(0.0..5.0)
            }
        });
        let triplets = (0..self.n_features)
            .cartesian_product(0..n)
            .filter_map(|(f, c)| {
                rng.gen_bool(0.2)
                    .then(|| (f, c, rng.gen_range(1..20) as f64))
            })
            .collect_vec();
        let counts = Matrix::sparse_from_triplets(self.n_features, n, triplets).unwrap();
        let umap = Array2::from_shape_fn((n, 2), |_| rng.gen_range(-10.0..10.0));

        DatasetBuilder::default()
            .with_cells(cells)
            .with_features(features)
            .add_assay("counts", counts)
            .add_assay("logcounts", Matrix::Dense(logcounts))
            .add_embedding("umap", Embedding::new("UMAP", umap))
            .build()
            .unwrap()
    }
}

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn strings(series: &Series) -> Vec<String> {
    series
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(str::to_owned)
        .collect_vec()
}

pub fn floats(series: &Series) -> Vec<f64> {
    series
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect_vec()
}
