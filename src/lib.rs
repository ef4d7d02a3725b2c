//! # tidysc
//!
//! `tidysc` is a tidy view layer over multi-assay single-cell datasets. A
//! [`Dataset`] bundles gene×cell assay matrices (dense or sparse), per-cell
//! and per-feature metadata and low-dimensional embeddings, and lets them be
//! manipulated with relational verbs as if they were one table of cells.
//!
//! Relational verbs never copy assay data: they derive new index views over
//! shared, read-only backing storage. Only [`Dataset::collect`] materializes
//! the viewed cells.
//!
//! ## Key Features
//!
//! * **Tabular view**: cell metadata plus embedding coordinates, exposed as
//!   computed columns (`UMAP_1`, `UMAP_2`, ...).
//! * **Verbs**: `filter`, `select`, `mutate`, `arrange`, `rename`, `slice`,
//!   `left_join`, `unite`, `extract`, `separate`, driven by `polars`
//!   expressions.
//! * **Feature joins**: pull assay rows into the table, wide or long.
//! * **Nesting**: group cells into nested datasets, map over the groups in
//!   parallel and concatenate them back.
//! * **Display modes**: tidy (tabular) or native (structured summary)
//!   rendering, switched process-wide at render time.
//!
//! Number of threads used for parallel work can be configured with the
//! `TIDYSC_NUM_THREADS` environment variable.
//!
//! ## Structure
//!
//! * [`data_structs`]: backing storage ([`Matrix`], [`ColumnarStore`],
//!   [`EmbeddingStore`]), metadata tables and the [`Dataset`] itself.
//! * [`tidy`]: the relational verbs, feature joins and nesting.
//! * [`display`]: rendering modes.
//! * [`io`]: the [`io::Loader`] trait and a CSV bundle loader.
//! * [`tools`]: seams for external transforms and renderers, pseudobulk
//!   aggregation.
//! * [`utils`]: the crate thread pool and helper macros.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use polars::prelude::{
//!     col,
//!     lit,
//! };
//! use tidysc::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ds = CsvBundleLoader::default().load(Path::new("path/to/bundle"))?;
//!
//!     let cd8 = ds
//!         .filter(col("cell_type").eq(lit("T")))?
//!         .join_features(&["CD3D", "CD8A"], Shape::Wide, Some("logcounts"))?
//!         .into_wide()
//!         .ok_or("expected a wide join")?
//!         .mutate("cd8_score", col("CD8A") - col("CD3D"))?
//!         .arrange("cd8_score", SortOrder::Descending)?;
//!     println!("{cd8}");
//!
//!     let per_sample = cd8
//!         .nest("sample")?
//!         .map(DATA, "n", |group| Ok(Payload::from(group.n_cells())))?;
//!     println!("{per_sample}");
//!     Ok(())
//! }
//! ```

#[ctor::ctor]
fn init() {
    if let Ok(n) = std::env::var("TIDYSC_NUM_THREADS") {
        std::env::set_var("POLARS_MAX_THREADS", n)
    }
}

pub mod data_structs;
pub mod display;
pub mod error;
pub mod io;
pub mod prelude;
pub mod tidy;
pub mod tools;
pub mod utils;

pub use data_structs::{
    ColumnarStore,
    Dataset,
    EmbeddingStore,
    Matrix,
};
pub use error::{
    Result,
    TidyError,
};
