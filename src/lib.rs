pub mod cli;
pub mod content;
pub mod db;
pub mod error;
pub mod highlight;
pub mod reader;
pub mod settings;
pub mod shell;
mod utils;

use clap::Parser;

pub use error::{HostError, SpeedReadError};
pub use reader::{ControllerConfig, ReadingController, ReadingEvent, ReadingOptions};

/// Entry point for the `speedread` binary.
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    let level = if std::env::var("SPEEDREAD_DEBUG").is_ok_and(|value| value == "1") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .init();

    let args = cli::Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(cli::run(args)) {
        log::error!("speedread failed: {err:?}");
        std::process::exit(1);
    }
}
