use itertools::Itertools;
use log::{
    debug,
    warn,
};
use polars::prelude::*;

use crate::data_structs::{
    Dataset,
    FEATURE_ID,
};
use crate::error::{
    Result,
    TidyError,
};
use crate::utils::{
    first_duplicate,
    positions_to_idx,
};

pub const VALUE: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One new metadata column per feature.
    Wide,
    /// One row per (cell, feature) pair.
    Long,
}

/// Result of [`Dataset::join_features`].
#[derive(Debug, Clone)]
pub enum Joined {
    Wide(Dataset),
    Long(DataFrame),
}

impl Joined {
    pub fn into_wide(self) -> Option<Dataset> {
        match self {
            Joined::Wide(ds) => Some(ds),
            Joined::Long(_) => None,
        }
    }

    pub fn into_long(self) -> Option<DataFrame> {
        match self {
            Joined::Long(df) => Some(df),
            Joined::Wide(_) => None,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Joined::Wide(ds) => ds.n_cells(),
            Joined::Long(df) => df.height(),
        }
    }
}

impl Dataset {
    /// Reads assay values of the given features at the viewed cells.
    ///
    /// Uses `assay` when given, the default assay otherwise. Only the
    /// requested backing rows are read.
    pub fn join_features<S: AsRef<str>>(
        self,
        features: &[S],
        shape: Shape,
        assay: Option<&str>,
    ) -> Result<Joined> {
        let ids = features.iter().map(|f| f.as_ref()).collect_vec();
        if let Some(dup) = first_duplicate(ids.iter().copied()) {
            return Err(TidyError::DuplicateFeature(dup.to_string()));
        }
        let (assay_name, matrix) = self.store().resolve(assay)?;
        let rows = ids
            .iter()
            .map(|id| {
                self.features()
                    .position(id)
                    .ok_or_else(|| TidyError::FeatureNotFound {
                        feature: id.to_string(),
                        assay:   assay_name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let positions = self.view().positions();
        let values = rows
            .iter()
            .map(|row| matrix.row_at(*row, positions))
            .collect_vec();
        debug!(
            "Joined {} features from assay '{assay_name}' over {} cells",
            ids.len(),
            positions.len()
        );

        match shape {
            Shape::Wide => {
                let mut out = self;
                for (id, column) in ids.iter().zip(values) {
                    if out.cells().has_column(id) {
                        warn!("Feature '{id}' replaces the metadata column of the same name");
                    }
                    else if out.embeddings().column_names().iter().any(|n| n == id) {
                        warn!("Feature '{id}' shadows an embedding coordinate");
                    }
                    out.cells_mut()
                        .with_column(Column::from(Series::new((*id).into(), column)))?;
                }
                Ok(Joined::Wide(out))
            },
            Shape::Long => {
                let frame = self.frame()?;
                let n_features = ids.len();
                let repeated = (0..frame.height())
                    .flat_map(|cell| std::iter::repeat(cell).take(n_features))
                    .collect_vec();
                let mut long = frame.take(&positions_to_idx(&repeated))?;
                let feature_col = (0..frame.height())
                    .flat_map(|_| ids.iter().copied())
                    .collect_vec();
                let value_col = (0..frame.height())
                    .flat_map(|cell| values.iter().map(move |v| v[cell]))
                    .collect_vec();
                long.with_column(Series::new(FEATURE_ID.into(), feature_col))?;
                long.with_column(Series::new(VALUE.into(), value_col))?;
                Ok(Joined::Long(long))
            },
        }
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
            .with_cells(df!("cell_id" => ["a", "b", "c"]).unwrap())
            .with_features(df!("feature_id" => ["G1", "G2", "G3"]).unwrap())
            .add_assay(
                "counts",
                Matrix::sparse_from_triplets(3, 3, vec![(0, 1, 5.0), (2, 2, 7.0)]).unwrap(),
            )
            .add_assay(
                "logcounts",
                Matrix::Dense(array![[0.1, 0.2, 0.3], [1.1, 1.2, 1.3], [2.1, 2.2, 2.3]]),
            )
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_wide_reads_view(dataset: Dataset) {
        let sub = dataset.reindex(&[2, 1]).unwrap();
        let joined = sub
            .join_features(&["G3", "G1"], Shape::Wide, Some("counts"))
            .unwrap()
            .into_wide()
            .unwrap();
        let g3 = joined.pull("G3").unwrap();
        assert_eq!(g3.f64().unwrap().into_iter().collect_vec(), vec![Some(7.0), Some(0.0)]);
        let g1 = joined.pull("G1").unwrap();
        assert_eq!(g1.f64().unwrap().into_iter().collect_vec(), vec![Some(0.0), Some(5.0)]);
    }

    #[rstest]
    fn test_wide_replaces_same_named_metadata(dataset: Dataset) {
        let ds = dataset
            .mutate("G2", lit("label"))
            .unwrap();
        let joined = ds
            .join_features(&["G2"], Shape::Wide, Some("logcounts"))
            .unwrap()
            .into_wide()
            .unwrap();
        let g2 = joined.pull("G2").unwrap();
        assert_eq!(g2.dtype(), &DataType::Float64);
        assert_eq!(g2.f64().unwrap().into_no_null_iter().collect_vec(), vec![1.1, 1.2, 1.3]);
        assert_eq!(joined.frame().unwrap().width(), 2);
    }

    #[rstest]
    fn test_long_is_cell_major(dataset: Dataset) {
        let long = dataset
            .join_features(&["G1", "G2"], Shape::Long, Some("logcounts"))
            .unwrap()
            .into_long()
            .unwrap();
        assert_eq!(long.height(), 6);
        let ids = long.column("cell_id").unwrap().str().unwrap().into_no_null_iter().collect_vec();
        assert_eq!(ids, vec!["a", "a", "b", "b", "c", "c"]);
        let values = long.column("value").unwrap().f64().unwrap().into_no_null_iter().collect_vec();
        assert_eq!(values, vec![0.1, 1.1, 0.2, 1.2, 0.3, 1.3]);
    }

    #[rstest]
    fn test_errors(dataset: Dataset) {
        assert!(matches!(
            dataset.clone().join_features(&["G1", "G1"], Shape::Wide, Some("nope")),
            Err(TidyError::DuplicateFeature(f)) if f == "G1"
        ));
        assert!(matches!(
            dataset.clone().join_features(&["G1"], Shape::Wide, Some("nope")),
            Err(TidyError::AssayNotFound(a)) if a == "nope"
        ));
        assert!(matches!(
            dataset.join_features(&["MS4A1"], Shape::Long, None),
            Err(TidyError::FeatureNotFound { feature, assay })
                if feature == "MS4A1" && assay == "counts"
        ));
    }
}
