//! Configuration loading
//!
//! Bootstrap configuration lives in a single TOML file. The file is located
//! in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `HED_BOT_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/hed-bot/config.toml` on Linux)
//! 4. No file: compiled defaults (lowest priority)
//!
//! An explicitly named file (CLI or environment) must exist and parse. A
//! missing file at the platform location is not an error: the service logs
//! a warning and starts with defaults.

use crate::validator::{Chain, FallbackStrategy, LongestKnownPrefix, NearestByName, NoFallback};
use crate::{Error, ExemptTags, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "HED_BOT_CONFIG";

/// Latest released HED standard schema
pub const DEFAULT_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/hed-standard/hed-schemas/main/standard_schema/hedxml/HEDLatest.xml";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// HTTP bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where to fetch the HED XML schema from
    #[serde(default = "default_schema_url")]
    pub schema_url: String,

    /// Local HED XML file; takes priority over `schema_url` when set
    #[serde(default)]
    pub schema_file: Option<PathBuf>,

    /// Tags the reducer never removes (top-level event types)
    ///
    /// Empty by default: which tags count as top-level event types is a
    /// deployment decision.
    #[serde(default)]
    pub exempt_tags: Vec<String>,

    /// Replacement policy for tags the schema does not define
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Schema context handed to the tag proposer
    #[serde(default)]
    pub prompt_context: PromptContext,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            schema_url: default_schema_url(),
            schema_file: None,
            exempt_tags: Vec::new(),
            fallback: FallbackConfig::default(),
            prompt_context: PromptContext::default(),
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))
    }

    /// Exemption set for the reducer
    pub fn exempt_set(&self) -> ExemptTags {
        self.exempt_tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key; `OPENAI_API_KEY` in the environment takes priority
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            temperature: default_llm_temperature(),
        }
    }
}

/// Unknown-tag replacement policy
///
/// ```toml
/// [fallback]
/// strategy = "similarity"
/// min_similarity = 0.85
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum FallbackConfig {
    /// Unknown tags are errors
    None,
    /// Deepest known component of a slash path
    #[default]
    Prefix,
    /// Nearest tag by name, then deepest known component
    Similarity {
        #[serde(default = "default_min_similarity")]
        min_similarity: f64,
    },
}

impl FallbackConfig {
    /// Build the configured strategy
    pub fn build(&self) -> Box<dyn FallbackStrategy> {
        match *self {
            FallbackConfig::None => Box::new(NoFallback),
            FallbackConfig::Prefix => Box::new(LongestKnownPrefix),
            FallbackConfig::Similarity { min_similarity } => Box::new(
                Chain::new()
                    .then(NearestByName { min_similarity })
                    .then(LongestKnownPrefix),
            ),
        }
    }
}

/// Schema context included in proposer prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptContext {
    /// Indented tag outline with descriptions
    #[default]
    Outline,
    /// The raw HED XML document
    Xml,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5731
}

fn default_schema_url() -> String {
    DEFAULT_SCHEMA_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_min_similarity() -> f64 {
    0.8
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hed-bot").join("config.toml"))
}

/// Locate the config file: CLI argument, then environment, then platform default
///
/// Returns the path and whether it was named explicitly.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<(PathBuf, bool)> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some((path.to_path_buf(), true));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some((PathBuf::from(path), true));
        }
    }

    // Priority 3: Platform config directory
    default_config_path()
        .filter(|p| p.exists())
        .map(|p| (p, false))
}

/// Configuration together with the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// `None` when compiled defaults are in use
    pub source: Option<PathBuf>,
}

/// Load configuration following the resolution order above
///
/// Callers usually run this before logging is initialized, so the chosen
/// file is returned in [`LoadedConfig::source`] for them to report.
pub fn load_config(cli_arg: Option<&Path>) -> Result<LoadedConfig> {
    match resolve_config_path(cli_arg) {
        Some((path, explicit)) => match TomlConfig::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                Ok(LoadedConfig {
                    config,
                    source: Some(path),
                })
            }
            Err(e) if explicit => Err(e),
            Err(e) => {
                warn!("Ignoring unreadable config file: {}. Using defaults.", e);
                Ok(LoadedConfig {
                    config: TomlConfig::default(),
                    source: None,
                })
            }
        },
        None => {
            warn!("No config file found, using compiled defaults");
            Ok(LoadedConfig {
                config: TomlConfig::default(),
                source: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(default_port(), 5731);
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert!(config.exempt_tags.is_empty());
        assert_eq!(config.fallback, FallbackConfig::Prefix);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_exempt_set_skips_blank_entries() {
        let config = TomlConfig {
            exempt_tags: vec![" Sensory-presentation ".into(), "".into()],
            ..Default::default()
        };
        let exempt = config.exempt_set();
        assert_eq!(exempt.len(), 1);
        assert!(exempt.contains("Sensory-presentation"));
    }
}
