//! Runtime configuration for hed-bot
//!
//! The TOML layer lives in `hed_common::config`; this module resolves the
//! values that may also come from the environment.

use hed_common::config::LlmConfig;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::OpenAiSettings;

/// Environment variable holding the language model API key
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Resolve the language model API key
///
/// **Priority:** `OPENAI_API_KEY` environment variable, then `[llm] api_key`
/// in the TOML config. A missing key is allowed for local endpoints that do
/// not authenticate.
pub fn resolve_api_key(llm: &LlmConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok().filter(|k| is_valid_key(k));
    let toml_key = llm.api_key.as_ref().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "API key found in both {} and TOML config. Using environment (highest priority).",
            API_KEY_ENV_VAR
        );
    }

    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Some(key.clone());
    }

    warn!(
        "No API key configured ({} or [llm] api_key); requests to {} are sent unauthenticated",
        API_KEY_ENV_VAR, llm.base_url
    );
    None
}

/// Check that a key is non-empty after trimming
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Proposer connection settings from the `[llm]` section
pub fn openai_settings(llm: &LlmConfig) -> OpenAiSettings {
    OpenAiSettings {
        base_url: llm.base_url.clone(),
        model: llm.model.clone(),
        api_key: resolve_api_key(llm),
        timeout: Duration::from_secs(llm.timeout_secs),
        temperature: llm.temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    fn test_openai_settings_copies_llm_section() {
        let llm = LlmConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3".to_string(),
            api_key: None,
            timeout_secs: 30,
            temperature: 0.2,
        };

        let settings = openai_settings(&llm);

        assert_eq!(settings.base_url, "http://localhost:11434/v1");
        assert_eq!(settings.model, "llama3");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.temperature, 0.2);
    }
}
