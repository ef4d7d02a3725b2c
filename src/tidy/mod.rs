//! Relational verbs over [`crate::Dataset`].
//!
//! Every verb is an inherent method on `Dataset`, so pipelines read as method
//! chains:
//!
//! ```no_run
//! use polars::prelude::{
//!     col,
//!     lit,
//! };
//! use tidysc::prelude::*;
//!
//! # fn run(ds: Dataset) -> tidysc::Result<()> {
//! let t_cells = ds
//!     .filter(col("cell_type").eq(lit("T")))?
//!     .join_features(&["CD3D", "CD8A"], Shape::Wide, Some("logcounts"))?
//!     .into_wide()
//!     .expect("wide join");
//! let _by_sample = t_cells.nest("sample")?;
//! # Ok(())
//! # }
//! ```
//!
//! - [`verbs`]: filter, select, mutate, arrange and friends.
//! - [`strings`]: unite, extract and separate.
//! - [`join`]: reading assay rows into the tabular view.
//! - [`nest`]: grouping cells into nested datasets and mapping over them.
//!
//! Filtering, selection and ordering only derive new index views; the
//! backing matrices are never copied.

mod eval;
pub(crate) mod group;
pub mod join;
pub mod nest;
pub mod strings;
pub mod verbs;

pub use eval::referenced_columns;
pub use join::{
    Joined,
    Shape,
};
pub use nest::{
    NestedTable,
    DATA,
};
pub use verbs::SortOrder;
