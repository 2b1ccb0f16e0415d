//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{DiskTier, DEFAULT_TTL};
use crate::conversation::DEFAULT_SESSION_IDLE_TIMEOUT;
use crate::error::ConfigError;
use crate::gateway::RetryPolicy;
use crate::llm::DEFAULT_REQUEST_TIMEOUT;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    /// Canned offline responses.
    Fake,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RendererKind {
    #[default]
    Text,
    Menu,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    /// `None` keeps the cache in memory only.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    pub session_idle_timeout: Duration,
    pub renderer: RendererKind,
    pub request_timeout: Duration,
}

impl AssistantConfig {
    /// Offline configuration: fake model, memory-only cache.
    pub fn offline() -> Self {
        Self {
            provider: ProviderKind::Fake,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            cache_dir: None,
            cache_ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            renderer: RendererKind::Text,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `MOMSHERO_LLM_PROVIDER` | `gemini` (`fake` for offline) |
    /// | `GOOGLE_API_KEY` | required for `gemini` |
    /// | `MOMSHERO_MODEL` | `gemini-1.5-flash` |
    /// | `MOMSHERO_CACHE_DIR` | `~/.momshero/llm-cache`; `none` disables the disk tier |
    /// | `MOMSHERO_CACHE_TTL_HOURS` | 24 |
    /// | `MOMSHERO_MAX_ATTEMPTS` | 3 |
    /// | `MOMSHERO_RETRY_BASE_MS` | 2000 |
    /// | `MOMSHERO_SESSION_IDLE_MINUTES` | 60 |
    /// | `MOMSHERO_RENDERER` | `text` (or `menu`) |
    /// | `MOMSHERO_REQUEST_TIMEOUT_SECS` | 60 |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("MOMSHERO_LLM_PROVIDER").as_deref() {
            None | Some("gemini") => ProviderKind::Gemini,
            Some("fake") => ProviderKind::Fake,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "MOMSHERO_LLM_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let api_key = get("GOOGLE_API_KEY");
        if provider == ProviderKind::Gemini && api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("GOOGLE_API_KEY"));
        }

        let cache_dir = match get("MOMSHERO_CACHE_DIR") {
            Some(dir) if dir.eq_ignore_ascii_case("none") => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => Some(DiskTier::default_dir()),
        };

        let renderer = match get("MOMSHERO_RENDERER").as_deref() {
            None | Some("text") => RendererKind::Text,
            Some("menu") => RendererKind::Menu,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "MOMSHERO_RENDERER",
                    value: other.to_string(),
                })
            }
        };

        let cache_ttl_hours: u64 = parse_or(&get, "MOMSHERO_CACHE_TTL_HOURS", 24)?;
        let max_attempts: u32 = parse_or(&get, "MOMSHERO_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MOMSHERO_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let retry_base_ms: u64 = parse_or(&get, "MOMSHERO_RETRY_BASE_MS", 2000)?;
        let idle_minutes: u64 = parse_or(&get, "MOMSHERO_SESSION_IDLE_MINUTES", 60)?;
        let timeout_secs: u64 = parse_or(
            &get,
            "MOMSHERO_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        )?;

        Ok(Self {
            provider,
            api_key,
            model: get("MOMSHERO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            cache_dir,
            cache_ttl: Duration::from_secs(cache_ttl_hours * 60 * 60),
            retry: RetryPolicy::default()
                .with_max_attempts(max_attempts)
                .with_base_delay(Duration::from_millis(retry_base_ms)),
            session_idle_timeout: Duration::from_secs(idle_minutes * 60),
            renderer,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AssistantConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AssistantConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_gemini_requires_key() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::MissingEnvVar("GOOGLE_API_KEY")
        );
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("GOOGLE_API_KEY", "k")]).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.cache_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.renderer, RendererKind::Text);
        assert_eq!(config.cache_dir, Some(DiskTier::default_dir()));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("MOMSHERO_LLM_PROVIDER", "fake"),
            ("MOMSHERO_CACHE_DIR", "none"),
            ("MOMSHERO_MAX_ATTEMPTS", "5"),
            ("MOMSHERO_RETRY_BASE_MS", "10"),
            ("MOMSHERO_RENDERER", "menu"),
        ])
        .unwrap();
        assert_eq!(config.provider, ProviderKind::Fake);
        assert_eq!(config.cache_dir, None);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(10));
        assert_eq!(config.renderer, RendererKind::Menu);
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[
            ("MOMSHERO_LLM_PROVIDER", "fake"),
            ("MOMSHERO_MAX_ATTEMPTS", "three"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "MOMSHERO_MAX_ATTEMPTS",
                value: "three".to_string(),
            }
        );

        assert!(config(&[("MOMSHERO_LLM_PROVIDER", "openai")]).is_err());
        assert!(config(&[
            ("MOMSHERO_LLM_PROVIDER", "fake"),
            ("MOMSHERO_MAX_ATTEMPTS", "0")
        ])
        .is_err());
    }
}
