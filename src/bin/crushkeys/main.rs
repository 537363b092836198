//! crushkeys - play the computer keyboard like a bit-crushed polysynth
//!
//! Run with: cargo run -- [--config crushkeys.toml]

mod app;
mod ui;

use std::{fs::File, path::PathBuf, sync::Mutex};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crushkeys::{config::Config, PitchTable};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crushkeys")]
#[command(about = "Polyphonic keyboard synthesizer for the terminal", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file (overrides the config)
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Print the key-to-pitch table and exit
    #[arg(long)]
    keys: bool,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.keys {
        for (key, freq) in PitchTable::qwerty().iter() {
            println!("{key:<8} {freq:>9.3} Hz");
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path).wrap_err("failed to load config")?,
        None => Config::default(),
    };
    if let Some(path) = cli.log_file {
        config.logging.file = path;
    }

    init_logging(&config)?;
    app::run(config)
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(config: &Config) -> EyreResult<()> {
    let file = File::create(&config.logging.file)
        .wrap_err_with(|| format!("failed to create log file {}", config.logging.file.display()))?;
    let filter = EnvFilter::try_new(&config.logging.level)
        .wrap_err_with(|| format!("invalid log level {:?}", config.logging.level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
