//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap, including
//! validation and default values. The program name and description can
//! also be entered interactively (see `main`).

use clap::Parser;
use std::path::PathBuf;

/// Oportuna - análisis de oportunidad de programas académicos
///
/// Combines SNIES enrollment/tuition statistics for a program with an
/// LLM-driven international benchmark and renders both into a slide
/// deck.
///
/// Examples:
///   oportuna "Doctorado Matemáticas" -d "Doctorado en matemáticas puras"
///   oportuna "Maestría en IA" --model qwen2.5:14b --format json
///   oportuna "Doctorado Física" --stats-only
///   oportuna --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Name of the academic program to analyze
    ///
    /// Prompted for interactively when omitted.
    #[arg(value_name = "PROGRAMA")]
    pub programa: Option<String>,

    /// Short description of the program
    ///
    /// Prompted for interactively when omitted.
    #[arg(short, long, value_name = "TEXTO")]
    pub descripcion: Option<String>,

    /// Ollama model to use for the research agents
    ///
    /// Can also be set via OPORTUNA_MODEL env var or .oportuna.toml.
    #[arg(short, long, env = "OPORTUNA_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Base URL of the SNIES parquet tables
    #[arg(long, value_name = "URL")]
    pub snies_url: Option<String>,

    /// Output directory for charts and the deck
    ///
    /// Defaults to Reporte_<programa> (spaces replaced by underscores).
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format for the deck (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .oportuna.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds for the research agents
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the LLM research stage (SNIES statistics only)
    #[arg(long)]
    pub stats_only: bool,

    /// Generate a default .oportuna.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Marp-flavored Markdown deck (default)
    #[default]
    Markdown,
    /// JSON report
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref url) = self.snies_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("SNIES URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref programa) = self.programa {
            if programa.trim().is_empty() {
                return Err("Program name must not be empty".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
