//! Ambience CLI
//!
//! Command-line interface for the ambience engine.

use clap::Parser;
use env_logger::Env;
use log::info;

use ambience::cli::commands::{self, RenderOptions};
use ambience::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Ambience v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Ambience v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            out,
            seconds,
            sample_rate,
            fade_out_at,
            volume,
            config,
            seed,
        } => {
            let options = RenderOptions {
                out,
                seconds,
                sample_rate,
                fade_out_at,
                volume,
                seed,
            };
            commands::render(&options, config.as_deref())?;
        }
        Commands::Play {
            seconds,
            volume,
            config,
        } => commands::play(seconds, volume, config.as_deref())?,
        Commands::Config { config } => commands::show_config(config.as_deref())?,
    }
    Ok(())
}
