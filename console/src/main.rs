mod join;
mod nest;
mod show;
pub mod utils;

use std::path::{
    Path,
    PathBuf,
};

use clap::{
    Args,
    Parser,
    Subcommand,
};
use console::style;
use join::JoinArgs;
use nest::NestArgs;
use polars::prelude::*;
use show::ShowArgs;
use tidysc::prelude::*;
use utils::UtilsArgs;
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// Print a dataset in tidy or native form.
    Show {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ShowArgs,
    },
    /// Read assay values of selected features into a table.
    Join {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  JoinArgs,
    },
    /// Group cells by a metadata column.
    Nest {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  NestArgs,
    },
}

/// Input options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub(crate) struct InputArgs {
    #[arg(help = "Directory holding cells.csv, features.csv, assay_*.csv and embedding_*.csv.")]
    pub bundle:    PathBuf,
    #[arg(long, default_value_t = ',', help = "Field separator of the CSV files.")]
    pub separator: char,
    #[arg(long, help = "Store assays as sparse matrices.")]
    pub sparse:    bool,
    #[arg(long, help = "Default assay. Defaults to the first assay by name.")]
    pub assay:     Option<String>,
    #[arg(
        short = 'w',
        long = "where",
        value_name = "COLUMN=VALUE",
        help = "Keep only cells whose column equals the value. May be repeated."
    )]
    pub filters:   Vec<String>,
}

impl InputArgs {
    pub(crate) fn load(&self) -> anyhow::Result<Dataset> {
        if !self.bundle.is_dir() {
            anyhow::bail!(
                "Path {} is not a directory.",
                style(self.bundle.display()).red()
            );
        }
        let mut dataset = CsvBundleLoader::default()
            .with_separator(separator_byte(self.separator)?)
            .with_sparse(self.sparse)
            .with_default_assay(self.assay.clone())
            .load(&self.bundle)?;
        for filter in self.filters.iter() {
            let (column, value) = filter
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Filter '{filter}' is not COLUMN=VALUE."))?;
            dataset = dataset.filter(col(column).cast(DataType::String).eq(lit(value)))?;
        }
        if dataset.is_empty() {
            eprintln!("{}", style("No cells left after filtering.").yellow());
        }
        Ok(dataset)
    }
}

/// CSV readers take a single byte, so only ASCII separators are accepted.
fn separator_byte(separator: char) -> anyhow::Result<u8> {
    if !separator.is_ascii() {
        anyhow::bail!(
            "Separator {} is not an ASCII character.",
            style(separator).red()
        );
    }
    Ok(separator as u8)
}

/// Writes a table as CSV to `output`, or to stdout when no path is given.
pub(crate) fn write_table(
    frame: &mut DataFrame,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            CsvWriter::new(file).include_header(true).finish(frame)?;
            eprintln!(
                "{} {}",
                style("Written").green().bold(),
                style(path.display()).bold()
            );
        },
        None => {
            CsvWriter::new(std::io::stdout().lock())
                .include_header(true)
                .finish(frame)?;
        },
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Show { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Join { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Nest { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
    }
    Ok(())
}
