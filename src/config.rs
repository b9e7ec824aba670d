//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.oportuna.toml` files. CLI arguments take precedence.

use crate::models::{Region, RegionMap};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// SNIES dataset settings.
    #[serde(default)]
    pub snies: SniesConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output directory. Defaults to `Reporte_<programa>` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Planner turns before giving up on a structured report.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Executor turns per delegated subtask.
    #[serde(default = "default_subtask_iterations")]
    pub max_subtask_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_iterations: default_max_iterations(),
            max_subtask_iterations: default_subtask_iterations(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    300
}

fn default_max_iterations() -> usize {
    25
}

fn default_subtask_iterations() -> usize {
    10
}

/// SNIES dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniesConfig {
    /// Base URL the four parquet tables are fetched from.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// First composite year+term code of the analysis window.
    #[serde(default = "default_window_start")]
    pub window_start: i32,

    /// Last composite year+term code of the analysis window.
    #[serde(default = "default_window_end")]
    pub window_end: i32,

    /// Process-type label that counts as enrollment.
    #[serde(default = "default_enrollment_process")]
    pub enrollment_process: String,
}

impl Default for SniesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            enrollment_process: default_enrollment_process(),
        }
    }
}

fn default_base_url() -> String {
    crate::snies::fetch::DEFAULT_BASE_URL.to_string()
}

fn default_window_start() -> i32 {
    20211
}

fn default_window_end() -> i32 {
    20242
}

fn default_enrollment_process() -> String {
    "MATRICULADOS".to_string()
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Country name → region tag ("local", "latam", "internacional").
    /// Countries not listed here classify as LATAM.
    #[serde(default = "default_regions")]
    pub regions: BTreeMap<String, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
        }
    }
}

fn default_regions() -> BTreeMap<String, String> {
    let mut regions = BTreeMap::new();
    regions.insert("Colombia".to_string(), "local".to_string());

    for country in [
        "México",
        "Chile",
        "Argentina",
        "Brasil",
        "Perú",
        "Ecuador",
        "Uruguay",
        "Bolivia",
        "Paraguay",
        "Costa Rica",
        "Panamá",
    ] {
        regions.insert(country.to_string(), "latam".to_string());
    }

    for country in [
        "USA",
        "Estados Unidos",
        "EE.UU.",
        "Canadá",
        "España",
        "Alemania",
        "Francia",
        "Reino Unido",
        "Italia",
        "Portugal",
        "Países Bajos",
    ] {
        regions.insert(country.to_string(), "internacional".to_string());
    }

    regions
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists
    /// but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".oportuna.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence; optional arguments only override
    /// when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(ref base_url) = args.snies_url {
            self.snies.base_url = base_url.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = Some(output_dir.display().to_string());
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// The configured region classifier. Entries with an unknown region
    /// tag are skipped with a warning.
    pub fn region_map(&self) -> RegionMap {
        let mut countries = BTreeMap::new();
        for (country, tag) in &self.report.regions {
            match Region::parse(tag) {
                Some(region) => {
                    countries.insert(country.clone(), region);
                }
                None => warn!("unknown region tag '{}' for {}; skipping", tag, country),
            }
        }
        RegionMap::new(countries)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "llama3.2:latest");
        assert_eq!(config.snies.window_start, 20211);
        assert_eq!(config.snies.window_end, 20242);
        assert_eq!(config.snies.enrollment_process, "MATRICULADOS");
        assert_eq!(config.report.regions.get("Colombia").unwrap(), "local");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[model]
name = "qwen2.5:14b"
temperature = 0.1

[snies]
window_start = 20201
window_end = 20232

[report.regions]
"Japón" = "internacional"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.model.name, "qwen2.5:14b");
        assert_eq!(config.model.temperature, 0.1);
        assert_eq!(config.snies.window_start, 20201);
        assert_eq!(config.report.regions.get("Japón").unwrap(), "internacional");
    }

    #[test]
    fn test_region_map_skips_bad_tags() {
        let mut config = Config::default();
        config
            .report
            .regions
            .insert("Atlántida".to_string(), "perdida".to_string());
        let map = config.region_map();
        // the bad entry is dropped; the unmapped name falls back to LATAM
        assert_eq!(map.classify(Some("Atlántida")), Region::Latam);
        assert_eq!(map.classify(Some("España")), Region::Internacional);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[snies]"));
        assert!(toml_str.contains("[report.regions]"));
    }
}
