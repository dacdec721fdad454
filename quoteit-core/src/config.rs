use crate::{ConfigError, CoreError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "QUOTEIT_CONFIG";
pub const CLIENT_SECRET_VAR: &str = "QUOTEIT_CLIENT_SECRET";
pub const PASSWORD_VAR: &str = "QUOTEIT_PASSWORD";
pub const DEFAULT_CONFIG_PATH: &str = "quoteit.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    #[serde(default)]
    pub bot: BotSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Credentials of the Reddit "script" app the bot logs in with.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub search_query: String,
    pub search_url: String,
    pub search_limit: u32,
    pub admin: String,
    pub quotes_board: String,
    pub upvote_threshold: i64,
    pub poll_interval_secs: u64,
    pub transient_backoff_secs: u64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            search_query: "\"QuoteIt!\"".to_string(),
            search_url: "https://api.pushshift.io/reddit/search".to_string(),
            search_limit: 100,
            admin: "camerongagnon".to_string(),
            quotes_board: "Quotes".to_string(),
            upvote_threshold: 10,
            poll_interval_secs: 60,
            transient_backoff_secs: 30,
        }
    }
}

impl BotSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn transient_backoff(&self) -> Duration {
        Duration::from_secs(self.transient_backoff_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://IDs.db".to_string(),
        }
    }
}

fn default_user_agent() -> String {
    "quoteit/0.1 (by /u/camerongagnon)".to_string()
}

impl AppConfig {
    /// Reads the file named by `QUOTEIT_CONFIG`, or `quoteit.toml`.
    pub fn load() -> Result<Self, CoreError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CoreError::Io(e)
            }
        })?;

        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CoreError> {
        let config: AppConfig = toml::from_str(contents).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Secrets may live in the environment instead of the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(CLIENT_SECRET_VAR).filter(|v| !v.is_empty()) {
            self.reddit.client_secret = secret;
        }
        if let Some(password) = lookup(PASSWORD_VAR).filter(|v| !v.is_empty()) {
            self.reddit.password = password;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reddit.client_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.client_id".to_string(),
            });
        }
        if self.reddit.username.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.username".to_string(),
            });
        }
        if self.reddit.client_secret.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: CLIENT_SECRET_VAR.to_string(),
            });
        }
        if self.reddit.password.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: PASSWORD_VAR.to_string(),
            });
        }
        if self.bot.search_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bot.search_limit".to_string(),
                value: "0".to_string(),
            });
        }
        if url::Url::parse(&self.bot.search_url).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "bot.search_url".to_string(),
                value: self.bot.search_url.clone(),
            });
        }
        if self.bot.admin.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bot.admin".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [reddit]
        client_id = "abc"
        client_secret = "shh"
        username = "QuoteItBot"
        password = "hunter2"
    "#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.bot.upvote_threshold, 10);
        assert_eq!(config.bot.search_limit, 100);
        assert_eq!(config.bot.quotes_board, "Quotes");
        assert_eq!(config.bot.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.bot.transient_backoff(), Duration::from_secs(30));
        assert_eq!(config.database.url, "sqlite://IDs.db");
        assert!(config.reddit.user_agent.starts_with("quoteit/"));
    }

    #[test]
    fn test_bot_section_overrides() {
        let contents = format!(
            "{MINIMAL}\n[bot]\nadmin = \"someone\"\nupvote_threshold = 25\n"
        );
        let config = AppConfig::from_toml_str(&contents).unwrap();
        assert_eq!(config.bot.admin, "someone");
        assert_eq!(config.bot.upvote_threshold, 25);
        assert_eq!(config.bot.search_limit, 100);
    }

    #[test]
    fn test_secrets_from_environment() {
        let contents = r#"
            [reddit]
            client_id = "abc"
            username = "QuoteItBot"
        "#;
        let mut config = AppConfig::from_toml_str(contents).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvironmentVariable { .. })
        ));

        config.apply_env_overrides(|name| match name {
            CLIENT_SECRET_VAR => Some("from-env".to_string()),
            PASSWORD_VAR => Some("pw".to_string()),
            _ => None,
        });
        assert_eq!(config.reddit.client_secret, "from-env");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let contents = format!("{MINIMAL}\n[bot]\nsearch_limit = 0\n");
        let config = AppConfig::from_toml_str(&contents).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let contents = format!("{MINIMAL}\n[bot]\nsearch_url = \"not a url\"\n");
        let config = AppConfig::from_toml_str(&contents).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error_and_missing_file() {
        let result = AppConfig::from_toml_str("[reddit");
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::Parse(_)))
        ));

        let result = AppConfig::load_from("/nonexistent/quoteit.toml");
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
