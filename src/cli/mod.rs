//! CLI Module
//!
//! Command-line interface for the ambience engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ambience - ambient noise for focus mode
#[derive(Parser, Debug)]
#[command(name = "ambience")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a focus-mode session offline to a WAV file
    #[command(name = "render")]
    Render {
        /// Output WAV file
        #[arg(short, long)]
        out: PathBuf,

        /// Session length in seconds
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,

        /// Sample rate of the render
        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,

        /// Leave focus mode after this many seconds
        #[arg(long)]
        fade_out_at: Option<f64>,

        /// Ambience volume (0.0 - 1.0)
        #[arg(long)]
        volume: Option<f32>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the noise source
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play the ambience on the default output device
    #[command(name = "play")]
    Play {
        /// Seconds to play before fading out
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,

        /// Ambience volume (0.0 - 1.0)
        #[arg(long)]
        volume: Option<f32>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration
    #[command(name = "config")]
    Config {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse_from([
            "ambience", "render", "--out", "a.wav", "--seconds", "3", "--fade-out-at", "2",
        ]);
        match cli.command {
            Some(Commands::Render {
                out,
                seconds,
                sample_rate,
                fade_out_at,
                ..
            }) => {
                assert_eq!(out, PathBuf::from("a.wav"));
                assert_eq!(seconds, 3.0);
                assert_eq!(sample_rate, 48000);
                assert_eq!(fade_out_at, Some(2.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["ambience", "config", "-v"]);
        assert!(cli.verbose);
    }
}
