mod commands;
mod filter;
mod output;

use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use clap::{Parser, ValueEnum};
use commands::Commands;
use eurostat_core::config::EurostatConfig;
use eurostat_error::{Result, ResultExt};
use eurostat_http::reqwest_client::TokioWrappedHttpClient;
use tokio::runtime::{Builder, Runtime};
use tracing::{Level, info};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl From<LogFormat> for logutil::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => logutil::LogFormat::HumanReadable,
            LogFormat::Json => logutil::LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "eurostat")]
#[clap(version)]
#[clap(about = "Query Eurostat SDMX datasets", long_about = None)]
struct Cli {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Format of log output, written to stderr.
    #[clap(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Override a setting, in the form 'name=value'.
    ///
    /// May be given multiple times. See the `settings` command for all
    /// available settings.
    #[clap(long = "set", value_name = "NAME=VALUE", global = true)]
    settings: Vec<String>,

    #[clap(subcommand)]
    command: Commands,
}

impl Cli {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) =
        logutil::configure_global_logger(cli.log_level(), cli.log_format.unwrap_or_default().into())
    {
        eprintln!("Failed to configure logger: {e}");
    }

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = EurostatConfig::default();
    for pair in &cli.settings {
        config.set_from_pair(pair)?;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting...");

    let runtime = build_runtime()?;
    let client =
        TokioWrappedHttpClient::try_from_settings(&config.http_settings(), runtime.handle().clone())?;

    let mut stdout = BufWriter::new(io::stdout());
    runtime.block_on(cli.command.run(&config, &client, &mut stdout))?;
    stdout.flush()?;

    Ok(())
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_multi_thread()
        .thread_name_fn(|| {
            static THREAD_ID: AtomicU64 = AtomicU64::new(0);
            let id = THREAD_ID.fetch_add(1, Ordering::Relaxed);
            format!("eurostat-thread-{id}")
        })
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}
