use clap::Args;
use log::LevelFilter;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v info, -vv debug, -vvv trace)."
    )]
    pub verbose: u8,
    #[arg(
        short,
        long,
        global = true,
        help = "Number of threads to use. Defaults to all cores."
    )]
    pub threads: Option<usize>,
}

impl UtilsArgs {
    /// Must run before the library touches its thread pool.
    pub(crate) fn setup(&self) -> anyhow::Result<()> {
        if let Some(threads) = self.threads {
            std::env::set_var("TIDYSC_NUM_THREADS", threads.to_string());
            std::env::set_var("POLARS_MAX_THREADS", threads.to_string());
        }
        let level = match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        pretty_env_logger::formatted_builder()
            .filter_level(level)
            .try_init()?;
        Ok(())
    }
}
