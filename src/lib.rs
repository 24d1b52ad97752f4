use std::env;
use clap::Parser;

use crate::config::types::ConfigOverrides;
use crate::gui::application::run_application;
use crate::error::AppRunError;

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod gui;
pub mod sim;
pub mod ui;

/// Turns pulls on a Progressor force gauge into jump key presses.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Jump threshold in kilograms, overrides the config file
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Use a simulated scale instead of searching for a Progressor
    #[arg(long)]
    pub simulate: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            threshold: self.threshold,
            simulate: self.simulate,
        }
    }
}

pub fn init_logging() {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        // btleplug is chatty at info
        .level_for("btleplug", log::LevelFilter::Warn)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

pub fn run(args: env::Args) -> Result<(), AppRunError> {
    let cli = Cli::parse_from(args);
    run_application(cli.overrides())?;
    Ok(())
}
