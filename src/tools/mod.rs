//! Seams for external collaborators.
//!
//! Normalization, clustering, plotting and similar algorithms live outside
//! this crate. They plug in through two narrow traits:
//!
//! - [`Transform`]: consumes a dataset and returns a new one, usually by
//!   adding an assay ([`Dataset::with_assay`]), an embedding
//!   ([`Dataset::with_embedding`]) or metadata columns.
//! - [`Renderer`]: turns a dataset and a set of columns into an opaque
//!   [`Artifact`].
//!
//! [`pseudobulk`] provides per-group assay aggregation, the usual input of
//! downstream differential-expression tools.

pub mod pseudobulk;
pub mod render;

use crate::data_structs::{
    Artifact,
    Dataset,
};
use crate::error::Result;

pub trait Transform {
    fn apply(
        &self,
        dataset: Dataset,
    ) -> Result<Dataset>;
}

impl<F> Transform for F
where
    F: Fn(Dataset) -> Result<Dataset>,
{
    fn apply(
        &self,
        dataset: Dataset,
    ) -> Result<Dataset> {
        self(dataset)
    }
}

pub trait Renderer {
    fn render(
        &self,
        dataset: &Dataset,
        columns: &[&str],
    ) -> Result<Artifact>;
}

impl Dataset {
    /// Passes the dataset through an external transform.
    pub fn pipe<T: Transform + ?Sized>(
        self,
        transform: &T,
    ) -> Result<Dataset> {
        transform.apply(self)
    }
}
