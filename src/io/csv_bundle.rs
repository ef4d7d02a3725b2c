use std::path::{
    Path,
    PathBuf,
};

use hashbrown::HashMap;
use itertools::Itertools;
use log::{
    debug,
    info,
};
use ndarray::Array2;
use polars::prelude::*;

use super::Loader;
use crate::data_structs::{
    Dataset,
    DatasetBuilder,
    Embedding,
    Matrix,
    CELL_ID,
    FEATURE_ID,
};
use crate::error::{
    Result,
    TidyError,
};
use crate::utils::id_column;

const CELLS_FILE: &str = "cells.csv";
const FEATURES_FILE: &str = "features.csv";
const ASSAY_PREFIX: &str = "assay_";
const EMBEDDING_PREFIX: &str = "embedding_";

/// Loads a directory laid out as:
///
/// - `cells.csv`: cell metadata with a `cell_id` column;
/// - `features.csv`: feature metadata with a `feature_id` column;
/// - `assay_<name>.csv`: first column `feature_id`, then one column per
///   cell id;
/// - `embedding_<name>.csv`: first column `cell_id`, then one column per
///   dimension.
///
/// Rows and columns of assay and embedding files may come in any order; they
/// are realigned to the metadata tables.
#[derive(Debug, Clone)]
pub struct CsvBundleLoader {
    separator:     u8,
    sparse:        bool,
    default_assay: Option<String>,
    check_finite:  bool,
}

impl Default for CsvBundleLoader {
    fn default() -> Self {
        Self {
            separator:     b',',
            sparse:        false,
            default_assay: None,
            check_finite:  true,
        }
    }
}

impl CsvBundleLoader {
    crate::with_field_fn!(separator, u8);

    // Store assays as CSR instead of dense arrays.
    crate::with_field_fn!(sparse, bool);

    crate::with_field_fn!(default_assay, Option<String>);

    crate::with_field_fn!(check_finite, bool);

    fn read_table(
        &self,
        path: &Path,
    ) -> Result<DataFrame> {
        debug!("Reading {}", path.display());
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_separator(self.separator))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Ok(frame)
    }

    /// Files named `<prefix><name>.csv`, sorted by name.
    fn find_tables(
        dir: &Path,
        prefix: &str,
    ) -> Result<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str())
            else {
                continue;
            };
            if let Some(name) = file_name
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
            {
                found.push((name.to_string(), path.clone()));
            }
        }
        found.sort();
        Ok(found)
    }

    fn read_assay(
        &self,
        path: &Path,
        cell_ids: &[String],
        feature_ids: &[String],
    ) -> Result<Matrix> {
        let frame = self.read_table(path)?;
        let file_ids = id_column(&frame, FEATURE_ID)?;
        let rows = align_ids(path, "feature", feature_ids, &file_ids)?;

        let mut triplets = Vec::new();
        let mut dense = Array2::<f64>::zeros((feature_ids.len(), cell_ids.len()));
        for (cell, cell_id) in cell_ids.iter().enumerate() {
            let column = frame.column(cell_id).map_err(|_| {
                TidyError::InvalidDataset(format!(
                    "{}: no column for cell '{cell_id}'",
                    path.display()
                ))
            })?;
            let values = column.cast(&DataType::Float64)?;
            for (row, value) in rows.iter().zip(values.f64()?.into_iter()) {
                let value = value.unwrap_or(f64::NAN);
                if self.sparse {
                    if value != 0.0 {
                        triplets.push((*row, cell, value));
                    }
                }
                else {
                    dense[[*row, cell]] = value;
                }
            }
        }

        if self.sparse {
            Matrix::sparse_from_triplets(feature_ids.len(), cell_ids.len(), triplets)
        }
        else {
            Ok(Matrix::Dense(dense))
        }
    }

    fn read_embedding(
        &self,
        name: &str,
        path: &Path,
        cell_ids: &[String],
    ) -> Result<Embedding> {
        let frame = self.read_table(path)?;
        let file_ids = id_column(&frame, CELL_ID)?;
        let cells = align_ids(path, "cell", cell_ids, &file_ids)?;
        let dims = frame
            .get_column_names()
            .into_iter()
            .filter(|n| n.as_str() != CELL_ID)
            .map(|n| n.to_string())
            .collect_vec();
        let key = embedding_key(name, &dims);

        let mut coords = Array2::<f64>::zeros((cell_ids.len(), dims.len()));
        for (dim, dim_name) in dims.iter().enumerate() {
            let values = frame.column(dim_name)?.cast(&DataType::Float64)?;
            for (cell, value) in cells.iter().zip(values.f64()?.into_iter()) {
                coords[[*cell, dim]] = value.unwrap_or(f64::NAN);
            }
        }
        Ok(Embedding::new(key, coords))
    }
}

/// Position in `known` of every id listed in a file, in file order.
///
/// Every known id must appear exactly once; unknown and repeated ids are
/// rejected.
fn align_ids(
    path: &Path,
    what: &str,
    known: &[String],
    file_ids: &[String],
) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = known
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut seen = vec![false; known.len()];
    let mut positions = Vec::with_capacity(file_ids.len());
    for id in file_ids {
        let pos = *index.get(id.as_str()).ok_or_else(|| {
            TidyError::InvalidDataset(format!("{}: unknown {what} '{id}'", path.display()))
        })?;
        if std::mem::replace(&mut seen[pos], true) {
            return Err(TidyError::InvalidDataset(format!(
                "{}: {what} '{id}' listed more than once",
                path.display()
            )));
        }
        positions.push(pos);
    }
    if positions.len() != known.len() {
        return Err(TidyError::cardinality(
            format!("{what}s of {}", path.display()),
            known.len(),
            positions.len(),
        ));
    }
    Ok(positions)
}

/// `UMAP` for headers `UMAP_1, UMAP_2`; the upper-cased file name otherwise.
fn embedding_key(
    name: &str,
    dims: &[String],
) -> String {
    let prefixes = dims
        .iter()
        .map(|d| {
            d.rsplit_once('_')
                .filter(|(_, n)| n.parse::<usize>().is_ok())
                .map(|(p, _)| p)
        })
        .collect_vec();
    match prefixes.first() {
        Some(Some(first)) if prefixes.iter().all(|p| p == &Some(*first)) => first.to_string(),
        _ => name.to_uppercase(),
    }
}

impl Loader for CsvBundleLoader {
    fn load(
        &self,
        source: &Path,
    ) -> Result<Dataset> {
        info!("Loading CSV bundle from {}", source.display());
        let cells = self.read_table(&source.join(CELLS_FILE))?;
        let features = self.read_table(&source.join(FEATURES_FILE))?;
        let cell_ids = id_column(&cells, CELL_ID)?;
        let feature_ids = id_column(&features, FEATURE_ID)?;

        let mut builder = DatasetBuilder::default()
            .with_check_finite(self.check_finite)
            .with_cells(cells)
            .with_features(features)
            .with_default_assay(self.default_assay.as_deref());
        for (name, path) in Self::find_tables(source, ASSAY_PREFIX)? {
            let matrix = self.read_assay(&path, &cell_ids, &feature_ids)?;
            info!("Loaded assay '{name}' {:?}", matrix.shape());
            builder = builder.add_assay(&name, matrix);
        }
        for (name, path) in Self::find_tables(source, EMBEDDING_PREFIX)? {
            let embedding = self.read_embedding(&name, &path, &cell_ids)?;
            info!("Loaded embedding '{name}' ({} dims)", embedding.n_dims());
            builder = builder.add_embedding(&name, embedding);
        }
        builder.build()
    }
}
