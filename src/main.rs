use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use ik_herald::core::config::ConfigManager;

/// Watch an EverQuest character log and announce guild events
#[derive(Parser, Debug)]
#[command(name = "ik-herald")]
#[command(version)]
struct Args {
    /// Settings file (default: ./settings.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the character whose log is parsed
    #[arg(long)]
    character: Option<String>,

    /// Replay the test log from its start instead of tailing the live log
    #[arg(long)]
    test_mode: bool,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let manager = match &args.config {
        Some(path) => ConfigManager::with_file(path.clone()),
        None => ConfigManager::new(PathBuf::from(".")),
    };
    let mut settings = manager.load();
    if let Some(character) = args.character {
        settings.character_name = character;
    }
    if args.test_mode {
        settings.test_mode = true;
    }
    if args.save_config {
        manager.save(&settings)?;
    }

    log::info!("ik-herald v{}", env!("CARGO_PKG_VERSION"));

    let active = Arc::new(AtomicBool::new(true));
    let shutdown = active.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
            shutdown.store(false, Ordering::SeqCst);
        }
    });

    ik_herald::run(settings, active).await?;
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .init();
}
