use clap::Args;
use tidysc::prelude::*;

use crate::utils::UtilsArgs;
use crate::InputArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct ShowArgs {
    #[clap(flatten)]
    input:  InputArgs,
    #[arg(long, help = "Print the structured summary instead of the cell table.")]
    native: bool,
    #[arg(long, help = "Print the summary as JSON.", conflicts_with = "native")]
    json:   bool,
    #[arg(short = 'n', long, default_value_t = 10, help = "Rows to print.")]
    rows:   usize,
    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Columns to show, comma separated."
    )]
    select: Vec<String>,
}

impl ShowArgs {
    pub(crate) fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut dataset = self.input.load()?;
        if !self.select.is_empty() {
            dataset = dataset.select(&self.select)?;
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&dataset.summary())?);
            return Ok(());
        }
        if self.native {
            DisplayMode::set(DisplayMode::Native);
        }
        let context = RenderContext::default().with_max_rows(self.rows);
        println!("{}", dataset.render(&context)?);
        Ok(())
    }
}
