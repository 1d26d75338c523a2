//! Configuration management for Lipi
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::cli::GenerationArgs;
use crate::error::{LipiError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lowest accepted sampling temperature
pub const TEMPERATURE_MIN: f64 = 0.01;
/// Highest accepted sampling temperature
pub const TEMPERATURE_MAX: f64 = 5.0;
/// Lowest accepted nucleus sampling mass
pub const TOP_P_MIN: f64 = 0.01;
/// Highest accepted nucleus sampling mass
pub const TOP_P_MAX: f64 = 1.0;
/// Shortest accepted generation length
pub const MAX_LENGTH_MIN: u32 = 32;
/// Longest accepted generation length
pub const MAX_LENGTH_MAX: u32 = 128;
/// Granularity of `max_length`, counted from `MAX_LENGTH_MIN`
pub const MAX_LENGTH_STEP: u32 = 8;

/// Repetition penalty sent with every generation request
pub const REPETITION_PENALTY: f64 = 1.0;

/// Friendly model names and the Replicate model each one runs
pub const MODEL_ALIASES: &[(&str, &str)] =
    &[("Llama3-8B-instruct-FT", "meta/meta-llama-3-8b-instruct")];

/// Main configuration structure for Lipi
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Sampling parameters used for every generation call
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Interactive chat settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Replicate configuration
    #[serde(default)]
    pub replicate: ReplicateConfig,
}

/// Replicate provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    /// Base URL of the Replicate HTTP API
    ///
    /// Overridable so tests can point the provider at a mock server.
    #[serde(default = "default_replicate_api_base")]
    pub api_base: String,

    /// Model alias (see [`MODEL_ALIASES`]) or raw `owner/name` identifier
    #[serde(default = "default_replicate_model")]
    pub model: String,

    /// API token, if provided ahead of time
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_replicate_api_base() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_replicate_model() -> String {
    "Llama3-8B-instruct-FT".to_string()
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_base: default_replicate_api_base(),
            model: default_replicate_model(),
            api_token: None,
        }
    }
}

impl std::fmt::Debug for ReplicateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ReplicateConfig {
    /// Resolves the configured model to a Replicate `owner/name` identifier
    ///
    /// Aliases are matched case-insensitively; anything else must already
    /// look like `owner/name`.
    ///
    /// # Errors
    ///
    /// Returns `LipiError::Config` if the model is neither a known alias nor
    /// an `owner/name` pair
    ///
    /// # Examples
    ///
    /// ```
    /// use lipi::config::ReplicateConfig;
    ///
    /// let config = ReplicateConfig::default();
    /// assert_eq!(config.model_id().unwrap(), "meta/meta-llama-3-8b-instruct");
    /// ```
    pub fn model_id(&self) -> Result<String> {
        let name = self.model.trim();
        if let Some((_, id)) = MODEL_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        {
            return Ok((*id).to_string());
        }

        match name.split_once('/') {
            Some((owner, model))
                if !owner.is_empty() && !model.is_empty() && !model.contains('/') =>
            {
                Ok(name.to_string())
            }
            _ => Err(LipiError::Config(format!(
                "Unknown model '{}'. Use one of: {} or an owner/name identifier",
                self.model,
                MODEL_ALIASES
                    .iter()
                    .map(|(alias, _)| *alias)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .into()),
        }
    }
}

/// Sampling parameters for the remote model
///
/// Set once per session and reused for every call until changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature, `[0.01, 5.0]`
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Nucleus sampling mass, `[0.01, 1.0]`
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Maximum generated length, `[32, 128]` in steps of 8
    #[serde(default = "default_max_length")]
    pub max_length: u32,
}

fn default_temperature() -> f64 {
    0.1
}

fn default_top_p() -> f64 {
    0.9
}

fn default_max_length() -> u32 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_length: default_max_length(),
        }
    }
}

impl GenerationConfig {
    /// Checks every parameter against its range
    ///
    /// # Errors
    ///
    /// Returns `LipiError::InvalidParameter` naming the first offending field
    pub fn validate(&self) -> std::result::Result<(), LipiError> {
        check_float("temperature", self.temperature, TEMPERATURE_MIN, TEMPERATURE_MAX)?;
        check_float("top_p", self.top_p, TOP_P_MIN, TOP_P_MAX)?;
        check_max_length(self.max_length)?;
        Ok(())
    }

    /// Sets one parameter from user text, leaving the others untouched
    ///
    /// On error the configuration is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `LipiError::InvalidParameter` for unknown names, unparseable
    /// values, and values out of range
    ///
    /// # Examples
    ///
    /// ```
    /// use lipi::config::GenerationConfig;
    ///
    /// let mut generation = GenerationConfig::default();
    /// generation.set("top_p", "0.5").unwrap();
    /// assert_eq!(generation.top_p, 0.5);
    /// assert!(generation.set("top_p", "2").is_err());
    /// assert_eq!(generation.top_p, 0.5);
    /// ```
    pub fn set(&mut self, name: &str, value: &str) -> std::result::Result<(), LipiError> {
        let invalid = |reason: &str| LipiError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let mut updated = *self;
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "temperature" => {
                updated.temperature = value.trim().parse().map_err(|_| invalid("not a number"))?;
            }
            "top_p" => {
                updated.top_p = value.trim().parse().map_err(|_| invalid("not a number"))?;
            }
            "max_length" => {
                updated.max_length = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid("not a whole number"))?;
            }
            _ => {
                return Err(invalid(
                    "unknown parameter; expected temperature, top_p or max_length",
                ))
            }
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Applies any values present in `args`
    pub fn apply_overrides(&mut self, args: &GenerationArgs) {
        if let Some(temperature) = args.temperature {
            self.temperature = temperature;
        }
        if let Some(top_p) = args.top_p {
            self.top_p = top_p;
        }
        if let Some(max_length) = args.max_length {
            self.max_length = max_length;
        }
    }
}

fn check_float(name: &str, value: f64, min: f64, max: f64) -> std::result::Result<(), LipiError> {
    // NaN fails `contains` as well.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(LipiError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: format!("must be between {} and {}", min, max),
        })
    }
}

fn check_max_length(value: u32) -> std::result::Result<(), LipiError> {
    let invalid = |reason: String| LipiError::InvalidParameter {
        name: "max_length".to_string(),
        value: value.to_string(),
        reason,
    };

    if !(MAX_LENGTH_MIN..=MAX_LENGTH_MAX).contains(&value) {
        return Err(invalid(format!(
            "must be between {} and {}",
            MAX_LENGTH_MIN, MAX_LENGTH_MAX
        )));
    }
    if (value - MAX_LENGTH_MIN) % MAX_LENGTH_STEP != 0 {
        return Err(invalid(format!(
            "must be {} plus a multiple of {}",
            MAX_LENGTH_MIN, MAX_LENGTH_STEP
        )));
    }
    Ok(())
}

/// Chat mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Print a "Thinking..." line while waiting for the first fragment
    #[serde(default = "default_show_thinking")]
    pub show_thinking: bool,

    /// Greeting shown at the top of every (re)started transcript
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_show_thinking() -> bool {
    true
}

fn default_greeting() -> String {
    crate::transcript::GREETING.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            show_thinking: default_show_thinking(),
            greeting: default_greeting(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `args` - Generation/model overrides from the command line
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, args: &GenerationArgs) -> Result<Self> {
        Self::load_with_env(path, args, |key| std::env::var(key).ok())
    }

    /// Same layering as [`Config::load`], with variables read through `lookup`
    ///
    /// # Errors
    ///
    /// Returns `LipiError::Io` if the file exists but cannot be read and
    /// `LipiError::Yaml` if it is not a valid configuration document
    pub fn load_with_env(
        path: &str,
        args: &GenerationArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env(lookup);
        config.apply_cli_overrides(args);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(LipiError::Io)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(LipiError::Yaml)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("REPLICATE_API_TOKEN") {
            self.provider.replicate.api_token = Some(token);
        }

        if let Some(api_base) = lookup("LIPI_REPLICATE_API_BASE") {
            self.provider.replicate.api_base = api_base;
        }

        if let Some(model) = lookup("LIPI_MODEL") {
            self.provider.replicate.model = model;
        }

        if let Some(temperature) = lookup("LIPI_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.generation.temperature = value;
            } else {
                tracing::warn!("Invalid LIPI_TEMPERATURE: {}", temperature);
            }
        }

        if let Some(top_p) = lookup("LIPI_TOP_P") {
            if let Ok(value) = top_p.parse() {
                self.generation.top_p = value;
            } else {
                tracing::warn!("Invalid LIPI_TOP_P: {}", top_p);
            }
        }

        if let Some(max_length) = lookup("LIPI_MAX_LENGTH") {
            if let Ok(value) = max_length.parse() {
                self.generation.max_length = value;
            } else {
                tracing::warn!("Invalid LIPI_MAX_LENGTH: {}", max_length);
            }
        }
    }

    fn apply_cli_overrides(&mut self, args: &GenerationArgs) {
        if let Some(model) = &args.model {
            tracing::debug!("Using model override: {}", model);
            self.provider.replicate.model = model.clone();
        }
        self.generation.apply_overrides(args);
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set. The API token is not
    /// checked here; the chat and once commands handle its shape.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let api_base = url::Url::parse(&self.provider.replicate.api_base).map_err(|e| {
            LipiError::Config(format!(
                "Invalid provider.replicate.api_base '{}': {}",
                self.provider.replicate.api_base, e
            ))
        })?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(LipiError::Config(format!(
                "provider.replicate.api_base must use http or https, got {}",
                api_base.scheme()
            ))
            .into());
        }

        self.provider.replicate.model_id()?;
        self.generation.validate()?;

        Ok(())
    }
}
