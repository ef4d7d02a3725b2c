//! Loading datasets from external sources.
//!
//! Domain formats (h5ad, loom, mtx, ...) are handled by external loaders that
//! implement [`Loader`]. The crate itself ships [`CsvBundleLoader`] for a
//! directory of plain CSV tables.

mod csv_bundle;

use std::path::Path;

pub use csv_bundle::CsvBundleLoader;

use crate::data_structs::Dataset;
use crate::error::Result;

pub trait Loader {
    fn load(
        &self,
        source: &Path,
    ) -> Result<Dataset>;
}
