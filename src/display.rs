//! Rendering of datasets and nested tables.
//!
//! A single process-wide [`DisplayMode`] decides how values are printed when
//! formatted through [`std::fmt::Display`]. The mode is only read at render
//! time; switching it never touches any dataset. The initial mode is `Tidy`
//! unless `TIDYSC_DISPLAY=native` is set.
//!
//! Code that must not depend on global state renders through an explicit
//! [`RenderContext`] instead.

use std::fmt;
use std::sync::atomic::{
    AtomicU8,
    Ordering,
};

use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::data_structs::Dataset;
use crate::error::Result;
use crate::tidy::NestedTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Cells as rows of the tabular view.
    Tidy,
    /// Structured summary of assays, metadata and embeddings.
    Native,
}

static MODE: Lazy<AtomicU8> = Lazy::new(|| {
    let mode = match std::env::var("TIDYSC_DISPLAY") {
        Ok(value) if value.eq_ignore_ascii_case("native") => DisplayMode::Native,
        _ => DisplayMode::Tidy,
    };
    AtomicU8::new(mode as u8)
});

impl DisplayMode {
    fn from_u8(value: u8) -> Self {
        if value == DisplayMode::Native as u8 {
            DisplayMode::Native
        }
        else {
            DisplayMode::Tidy
        }
    }

    pub fn current() -> Self {
        Self::from_u8(MODE.load(Ordering::SeqCst))
    }

    pub fn set(mode: DisplayMode) {
        MODE.store(mode as u8, Ordering::SeqCst);
    }

    /// Flips the global mode and returns the new one.
    pub fn toggle() -> Self {
        let previous = MODE
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(Self::from_u8(v).flipped() as u8)
            })
            .unwrap_or_else(|v| v);
        Self::from_u8(previous).flipped()
    }

    fn flipped(self) -> Self {
        match self {
            DisplayMode::Tidy => DisplayMode::Native,
            DisplayMode::Native => DisplayMode::Tidy,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    mode:     DisplayMode,
    max_rows: usize,
}

impl Default for RenderContext {
    /// Snapshot of the global mode, ten rows.
    fn default() -> Self {
        Self {
            mode:     DisplayMode::current(),
            max_rows: 10,
        }
    }
}

impl RenderContext {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    crate::getter_fn!(mode, DisplayMode);

    crate::getter_fn!(max_rows, usize);

    crate::with_field_fn!(mode, DisplayMode);

    crate::with_field_fn!(max_rows, usize);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssaySummary {
    pub name:       String,
    pub n_features: usize,
    pub n_cells:    usize,
    pub sparse:     bool,
    pub default:    bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingSummary {
    pub name:   String,
    pub key:    String,
    pub n_dims: usize,
}

/// Structure of a dataset, independent of its cell values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub n_cells:    usize,
    pub n_features: usize,
    pub assays:     Vec<AssaySummary>,
    pub metadata:   Vec<String>,
    pub embeddings: Vec<EmbeddingSummary>,
}

impl Dataset {
    pub fn summary(&self) -> DatasetSummary {
        let default = self.default_assay();
        DatasetSummary {
            n_cells:    self.n_cells(),
            n_features: self.n_features(),
            assays:     self
                .store()
                .iter()
                .map(|(name, matrix)| AssaySummary {
                    name:       name.to_string(),
                    n_features: matrix.n_features(),
                    n_cells:    self.n_cells(),
                    sparse:     matrix.is_sparse(),
                    default:    default == Some(name),
                })
                .collect_vec(),
            metadata:   self.cells().column_names(),
            embeddings: self
                .embeddings()
                .iter()
                .map(|(name, e)| EmbeddingSummary {
                    name:   name.to_string(),
                    key:    e.key().clone(),
                    n_dims: e.n_dims(),
                })
                .collect_vec(),
        }
    }

    pub fn render(
        &self,
        context: &RenderContext,
    ) -> Result<String> {
        match context.mode {
            DisplayMode::Tidy => self.render_tidy(context.max_rows),
            DisplayMode::Native => Ok(self.render_native()),
        }
    }

    fn render_tidy(
        &self,
        max_rows: usize,
    ) -> Result<String> {
        let assays = self
            .assay_names()
            .into_iter()
            .map(|name| {
                if Some(name) == self.default_assay() {
                    format!("{name} (default)")
                }
                else {
                    name.to_string()
                }
            })
            .join(", ");
        let frame = self.frame()?;
        Ok(format!(
            "# A tidy dataset: {} features × {} cells\n# Assays: {assays}\n{}",
            self.n_features(),
            self.n_cells(),
            frame.head(Some(max_rows))
        ))
    }

    fn render_native(&self) -> String {
        let summary = self.summary();
        let mut lines = vec![format!(
            "Dataset with {} features across {} cells",
            summary.n_features, summary.n_cells
        )];
        lines.push(format!("Assays ({}):", summary.assays.len()));
        for assay in summary.assays.iter() {
            lines.push(format!(
                "  {}: {} [{} × {}]{}",
                assay.name,
                if assay.sparse { "sparse" } else { "dense" },
                assay.n_features,
                assay.n_cells,
                if assay.default { " (default)" } else { "" }
            ));
        }
        lines.push(format!("Metadata: {}", summary.metadata.join(", ")));
        if summary.embeddings.is_empty() {
            lines.push("Embeddings: none".to_string());
        }
        else {
            lines.push(format!("Embeddings ({}):", summary.embeddings.len()));
            for e in summary.embeddings.iter() {
                lines.push(format!("  {}: {} ({} dims)", e.name, e.key, e.n_dims));
            }
        }
        lines.join("\n")
    }
}

impl NestedTable {
    pub fn render(
        &self,
        context: &RenderContext,
    ) -> Result<String> {
        let frame = self.frame()?;
        match context.mode {
            DisplayMode::Tidy => {
                Ok(format!(
                    "# A nested table: {} groups by '{}'\n{}",
                    self.len(),
                    self.key(),
                    frame.head(Some(context.max_rows))
                ))
            },
            DisplayMode::Native => {
                let names = self.column_names().join(", ");
                Ok(format!(
                    "Nested table with {} groups by '{}'; columns: {names}",
                    self.len(),
                    self.key()
                ))
            },
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let rendered = self.render(&RenderContext::default()).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl fmt::Display for NestedTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let rendered = self.render(&RenderContext::default()).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}
