use polars::io::csv::write::CsvWriter;
use polars::prelude::*;

use super::Renderer;
use crate::data_structs::{
    Artifact,
    Dataset,
    CELL_ID,
};
use crate::error::Result;

/// Renders the requested columns of the tabular view as delimited text.
///
/// `cell_id` always leads. Useful as a baseline renderer and for handing
/// tables to tools that only read text.
#[derive(Debug, Clone)]
pub struct DelimitedRenderer {
    separator: u8,
    header:    bool,
}

impl Default for DelimitedRenderer {
    fn default() -> Self {
        Self {
            separator: b'\t',
            header:    true,
        }
    }
}

impl DelimitedRenderer {
    crate::with_field_fn!(separator, u8);

    crate::with_field_fn!(header, bool);

    fn media_type(&self) -> &'static str {
        match self.separator {
            b',' => "text/csv",
            _ => "text/tab-separated-values",
        }
    }
}

impl Renderer for DelimitedRenderer {
    fn render(
        &self,
        dataset: &Dataset,
        columns: &[&str],
    ) -> Result<Artifact> {
        let mut names = vec![CELL_ID];
        names.extend(columns.iter().copied().filter(|c| *c != CELL_ID));
        dataset.require_columns(names.iter().copied())?;
        let mut frame = dataset.frame_all()?.select(names)?;

        let mut bytes = Vec::new();
        CsvWriter::new(&mut bytes)
            .include_header(self.header)
            .with_separator(self.separator)
            .finish(&mut frame)?;
        Ok(Artifact::new(self.media_type(), bytes))
    }
}
