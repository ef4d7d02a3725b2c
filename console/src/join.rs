use std::path::PathBuf;

use clap::Args;
use log::info;
use tidysc::prelude::*;

use crate::utils::UtilsArgs;
use crate::{
    write_table,
    InputArgs,
};

#[derive(Args, Debug, Clone)]
pub(crate) struct JoinArgs {
    #[clap(flatten)]
    input:      InputArgs,
    #[arg(
        short,
        long,
        required = true,
        value_delimiter = ',',
        help = "Feature ids to join, comma separated."
    )]
    features:   Vec<String>,
    #[arg(long = "from", help = "Assay to read. Defaults to the default assay.")]
    from_assay: Option<String>,
    #[arg(long, help = "One row per (cell, feature) instead of one column per feature.")]
    long:       bool,
    #[arg(short, long, help = "Output CSV file. Defaults to stdout.")]
    output:     Option<PathBuf>,
}

impl JoinArgs {
    pub(crate) fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let dataset = self.input.load()?;
        let shape = if self.long { Shape::Long } else { Shape::Wide };
        let mut table = match dataset.join_features(
            &self.features,
            shape,
            self.from_assay.as_deref(),
        )? {
            Joined::Wide(ds) => ds.frame()?,
            Joined::Long(df) => df,
        };
        info!("Joined table: {} rows × {} columns", table.height(), table.width());
        write_table(&mut table, self.output.as_deref())
    }
}
