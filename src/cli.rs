//! Command-line interface definition for Lipi
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot transliteration,
//! and inspecting the effective generation parameters.

use clap::{Args, Parser, Subcommand};

/// Lipi - Romanized Nepali to Devanagari transliteration chat
///
/// Sends your text to a hosted Llama 3 model on Replicate and streams the
/// Devanagari transliteration back.
#[derive(Parser, Debug, Clone)]
#[command(name = "lipi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Lipi
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive transliteration chat
    Chat {
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Transliterate a single piece of text and exit
    Once {
        #[command(flatten)]
        generation: GenerationArgs,

        /// Text to transliterate
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Print the effective model and generation parameters
    Params {
        #[command(flatten)]
        generation: GenerationArgs,
    },
}

impl Commands {
    /// Generation overrides carried by every subcommand
    pub fn generation_args(&self) -> &GenerationArgs {
        match self {
            Self::Chat { generation } | Self::Params { generation } => generation,
            Self::Once { generation, .. } => generation,
        }
    }
}

/// Model and sampling overrides shared by all subcommands
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct GenerationArgs {
    /// Model alias or Replicate owner/name identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature (0.01 - 5.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Nucleus sampling mass (0.01 - 1.0)
    #[arg(long)]
    pub top_p: Option<f64>,

    /// Maximum generated length (32 - 128, step 8)
    #[arg(long)]
    pub max_length: Option<u32>,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
