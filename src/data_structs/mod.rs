//! This module contains the core data structures of the crate: the backing
//! storage of a single-cell dataset and the [`Dataset`] value that views it.
//!
//! - [`matrix`]: gene×cell assay matrices, dense ([`ndarray`]) or sparse
//!   (CSR, [`nalgebra_sparse`]).
//! - [`store`]: the columnar store mapping assay names to matrices.
//! - [`metadata`]: per-cell and per-feature attribute tables on top of
//!   `polars::DataFrame`.
//! - [`embedding`]: named low-dimensional per-cell coordinates.
//! - [`view`]: the index view through which relational verbs act.
//! - [`Dataset`] and its validating [`DatasetBuilder`].
//! - [`Payload`]: the tagged slot type of nested-table columns.

mod builder;
mod dataset;
pub mod embedding;
pub mod matrix;
pub mod metadata;
mod payload;
pub mod store;
pub mod view;

pub use builder::DatasetBuilder;
pub use dataset::Dataset;
pub use embedding::{
    Embedding,
    EmbeddingStore,
};
pub use matrix::Matrix;
pub use metadata::{
    CellTable,
    FeatureTable,
    CELL_ID,
    FEATURE_ID,
};
pub use payload::{
    Artifact,
    Payload,
    ScalarValue,
};
pub use store::ColumnarStore;
pub use view::IndexView;
