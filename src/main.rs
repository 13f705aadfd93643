//! Nina - A Matrix bot relaying emergency warnings to the places you care about.
//!
//! # Overview
//!
//! Nina polls public warning feeds (civil protection, weather service, flood
//! centres) and posts each warning to the Matrix rooms that registered a point
//! inside the warned area. A room is notified once per warning, and again each
//! time the warning is updated.
//!
//! # Features
//!
//! - **Point Registrations**: `register 52.51704, 13.38792` in any room the bot joined
//! - **Several Feeds**: all configured feeds are polled concurrently
//! - **Update Detection**: only new and changed warnings are sent
//! - **Retries**: notifications that could not be delivered are retried on the next poll
//! - **Persistent State**: registrations, warnings and delivery records survive restarts
//! - **End-to-End Encryption**: the bot works in encrypted rooms
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your settings (see [`config`] for all options):
//!
//! ```yaml
//! feeds:
//!   urls:
//!     - "https://warnung.bund.de/bbk.mowas/gefahrendurchsagen.json"
//!
//! matrix:
//!   user_id: "@nina:matrix.org"
//!   password: "your-password"
//!   passphrase: "your-recovery-passphrase"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `NINA_` prefix:
//!
//! ```bash
//! export NINA_MATRIX__PASSWORD="your-password"
//! export NINA_MATRIX__PASSPHRASE="your-passphrase"
//! ```

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod dispatch;
mod errors;
mod feed;
mod geo;
mod matrix;
mod poller;
mod storage;
mod subscriptions;
mod utils;
mod warnings;

/// Command-line arguments for the Nina bot.
///
/// # Examples
///
/// ```bash
/// nina-matrix --config config.yaml --data ./nina-data
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Path to the directory for storing persistent data.
    ///
    /// This directory will contain the registrations, the known warnings, the
    /// delivery records, and the Matrix session with its encryption keys. Anyone
    /// able to read it can impersonate the bot: restrict its permissions.
    #[arg(short, long)]
    data: PathBuf,
}

/// Main entry point for the Nina bot.
///
/// 1. **Logging Setup**: `info` level by default, overridable with `RUST_LOG`
/// 2. **Argument Parsing**: via `clap`
/// 3. **Configuration Loading**: YAML file with `NINA_` environment overrides
/// 4. **Bot Initialization**: loads the state files and logs in to Matrix
/// 5. **Bot Execution**: polls the feeds and answers commands until the Matrix
///    sync loop stops
///
/// Startup failures are logged and end the process.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug nina-matrix --config config.yaml --data ./nina-data
/// ```
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("starting nina {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config file: {:#}", e);
            return;
        }
    };

    let bot = match Bot::new(config, args).await {
        Ok(bot) => bot,
        Err(e) => {
            error!("failed to initialize bot: {:#}", e);
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("bot stopped: {:#}", e);
    }
}
