pub mod bot;
pub mod migrations;
pub mod poise_register;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::error;

use crate::config::Config;

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Moderation bot for a single Discord server")]
pub struct CmdArgs {
    /// Path to the YAML config file
    #[clap(long, default_value = "config.yaml")]
    pub config: PathBuf,
    #[clap(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Run the bot
    Bot,
    /// Register slash commands in the configured guild and exit
    Register,
    /// Create missing tables and exit
    Migrate,
}

pub async fn cmd_loader() {
    let args = CmdArgs::parse();

    setup_logging("serenity=error,chiya=info,sqlx=error");

    let config = match Config::load(&args.config) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let res = match args.command {
        Cmd::Bot => bot::start(config).await,
        Cmd::Register => poise_register::register_poise_commands(config).await,
        Cmd::Migrate => migrations::start(config).await,
    };

    if let Err(e) = res {
        error!("{:?} failed: {}", args.command, e);
        std::process::exit(1); // Clean exit with status code of 1
    }
}

/// Sets up env_logger. `DEBUG=true` turns on debug logging and
/// `DEBUG_OPTS=target=level,...` overrides single targets
pub fn setup_logging(default_filter: &str) {
    let debug_mode = std::env::var("DEBUG").unwrap_or_default() == "true";
    let debug_opts = std::env::var("DEBUG_OPTS").unwrap_or_default();

    let mut env_builder = env_logger::builder();

    env_builder
        .format(move |buf, record| {
            writeln!(
                buf,
                "({}) {} - {}",
                record.target(),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .parse_filters(default_filter);

    // Set custom log levels
    for (target, level) in parse_debug_opts(&debug_opts) {
        env_builder.filter(Some(target), level);
    }

    if debug_mode {
        env_builder.filter(None, log::LevelFilter::Debug);
    }

    env_builder.init();
}

fn parse_debug_opts(debug_opts: &str) -> Vec<(&str, log::LevelFilter)> {
    let mut opts = Vec::new();

    for opt in debug_opts.split(',') {
        let opt = opt.trim();

        if opt.is_empty() {
            continue;
        }

        let (target, level) = match opt.split_once('=') {
            Some((target, level)) => (target, level),
            None => (opt, "debug"),
        };

        let level = match level {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => {
                eprintln!("Invalid log level: {}", level);
                continue;
            }
        };

        opts.push((target, level));
    }

    opts
}
