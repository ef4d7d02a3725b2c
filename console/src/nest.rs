use std::path::PathBuf;

use clap::Args;
use console::style;
use tidysc::prelude::*;

use crate::utils::UtilsArgs;
use crate::{
    write_table,
    InputArgs,
};

#[derive(Args, Debug, Clone)]
pub(crate) struct NestArgs {
    #[clap(flatten)]
    input:      InputArgs,
    #[arg(short, long, required = true, help = "Metadata column to group by.")]
    by:         String,
    #[arg(
        long,
        help = "Write per-group assay sums (pseudobulk) to this CSV file."
    )]
    pseudobulk: Option<PathBuf>,
}

impl NestArgs {
    pub(crate) fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let dataset = self.input.load()?;
        let nested = dataset
            .nest(&self.by)?
            .map(DATA, "n_cells", |group| Ok(Payload::from(group.n_cells())))?;
        println!("{}", nested.render(&RenderContext::new(DisplayMode::Tidy).with_max_rows(50))?);

        if let Some(path) = self.pseudobulk.as_deref() {
            let mut bulk = aggregate_cells(&dataset, &self.by, self.input.assay.as_deref())?;
            write_table(&mut bulk, Some(path))?;
        }
        else {
            eprintln!(
                "{} groups; use {} to aggregate assay values",
                style(nested.len()).green().bold(),
                style("--pseudobulk").cyan()
            );
        }
        Ok(())
    }
}
