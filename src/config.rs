use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::summarize::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, PromptStyle, api_key_var, is_anthropic_model};

pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Optional on-disk defaults; every key may be omitted
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub default_lang: Option<String>,
    pub default_model: Option<String>,
    pub max_tokens: Option<u32>,
    pub prompt_style: Option<PromptStyle>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    /// Load config from ~/.config/ytsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}

/// API keys captured once at startup
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "<set>").unwrap_or("<unset>");
        f.debug_struct("Credentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .finish()
    }
}

impl Credentials {
    /// Blank values count as unset
    pub fn new(openai_api_key: Option<String>, anthropic_api_key: Option<String>) -> Self {
        let non_blank = |k: Option<String>| k.filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: non_blank(openai_api_key),
            anthropic_api_key: non_blank(anthropic_api_key),
        }
    }
}

/// Command-line values that take priority over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub lang: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub prompt_style: Option<PromptStyle>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub lang: String,
    pub model: String,
    pub max_tokens: u32,
    pub prompt_style: PromptStyle,
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl Settings {
    /// CLI flags first, then the config file, then built-in defaults
    pub fn resolve(config: Config, overrides: Overrides, credentials: Credentials) -> Self {
        Self {
            lang: overrides
                .lang
                .or(config.default_lang)
                .unwrap_or_else(|| DEFAULT_LANG.to_string()),
            model: overrides
                .model
                .or(config.default_model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: overrides
                .max_tokens
                .or(config.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            prompt_style: overrides.prompt_style.or(config.prompt_style).unwrap_or_default(),
            host: overrides
                .host
                .or(config.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(config.port).unwrap_or(DEFAULT_PORT),
            credentials,
        }
    }

    /// Variable name of the key the configured model needs, if it is not set
    pub fn missing_api_key(&self) -> Option<&'static str> {
        let key = if is_anthropic_model(&self.model) {
            &self.credentials.anthropic_api_key
        } else {
            &self.credentials.openai_api_key
        };
        key.is_none().then(|| api_key_var(&self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
default_lang = "es"
default_model = "gpt-4o"
max_tokens = 2048
prompt_style = "code"
host = "0.0.0.0"
port = 8080
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_lang.as_deref(), Some("es"));
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.prompt_style, Some(PromptStyle::Code));
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(8080));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.default_lang.is_none());
        assert!(config.prompt_style.is_none());
    }

    #[test]
    fn test_parse_bad_prompt_style() {
        assert!(toml::from_str::<Config>(r#"prompt_style = "verbose""#).is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(Config::default(), Overrides::default(), Credentials::default());
        assert_eq!(settings.lang, "en");
        assert_eq!(settings.model, "gpt-4-turbo");
        assert_eq!(settings.max_tokens, 4096);
        assert_eq!(settings.prompt_style, PromptStyle::Concise);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn test_resolve_overrides_win() {
        let config: Config = toml::from_str(
            r#"
default_model = "gpt-4o"
max_tokens = 1000
port = 9000
"#,
        )
        .unwrap();
        let overrides = Overrides {
            model: Some("claude-sonnet-4-6".to_string()),
            port: Some(4000),
            ..Overrides::default()
        };
        let settings = Settings::resolve(config, overrides, Credentials::default());
        assert_eq!(settings.model, "claude-sonnet-4-6");
        assert_eq!(settings.max_tokens, 1000);
        assert_eq!(settings.port, 4000);
    }

    fn settings_for(model: &str, credentials: Credentials) -> Settings {
        let overrides = Overrides {
            model: Some(model.to_string()),
            ..Overrides::default()
        };
        Settings::resolve(Config::default(), overrides, credentials)
    }

    #[test]
    fn test_missing_api_key_follows_model() {
        let openai_only = Credentials::new(Some("sk-openai".to_string()), None);
        assert_eq!(settings_for("gpt-4-turbo", openai_only.clone()).missing_api_key(), None);
        assert_eq!(
            settings_for("claude-sonnet-4-6", openai_only).missing_api_key(),
            Some("ANTHROPIC_API_KEY")
        );

        let anthropic_only = Credentials::new(None, Some("sk-ant".to_string()));
        assert_eq!(settings_for("claude-sonnet-4-6", anthropic_only.clone()).missing_api_key(), None);
        assert_eq!(settings_for("gpt-4o", anthropic_only).missing_api_key(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_credentials_are_unset() {
        let creds = Credentials::new(Some("  ".to_string()), Some("sk-ant".to_string()));
        assert!(creds.openai_api_key.is_none());
        assert_eq!(creds.anthropic_api_key.as_deref(), Some("sk-ant"));
        assert!(!format!("{creds:?}").contains("sk-ant"));
    }
}
