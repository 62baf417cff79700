//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default registration API base URL.
pub const DEFAULT_REGISTRATION_URL: &str = "http://localhost:5000";

/// Default port for the HTTP activity endpoint.
pub const DEFAULT_HTTP_PORT: u16 = 3978;

/// Which registration conversation the bot runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowMode {
    /// Two questions (name, date of birth), no submission.
    Quick,
    /// Nine-step waterfall ending with a confirm and an HTTP submission.
    Full,
}

impl std::str::FromStr for FlowMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "full" => Ok(Self::Full),
            other => Err(ConfigError::InvalidValue {
                key: "CONNECT_HUB_FLOW".to_string(),
                message: format!("expected 'quick' or 'full', got '{other}'"),
            }),
        }
    }
}

impl std::fmt::Display for FlowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The bot's own participant id; join events for it get no welcome.
    pub bot_id: String,
    /// Which conversation to run.
    pub flow: FlowMode,
    /// Base URL of the registration API (`/api/auth/register` is appended).
    pub registration_url: String,
    /// libSQL database path, or `:memory:` for volatile state.
    pub db_path: String,
    /// Port of the HTTP activity endpoint.
    pub http_port: u16,
    /// Telegram bot token; the Telegram channel is enabled when set.
    pub telegram_token: Option<SecretString>,
    /// Telegram usernames or numeric ids allowed to talk to the bot. `*` allows everyone.
    pub telegram_allowed_users: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_id: "connect-hub".to_string(),
            flow: FlowMode::Full,
            registration_url: DEFAULT_REGISTRATION_URL.to_string(),
            db_path: "./data/connect-hub.db".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            telegram_token: None,
            telegram_allowed_users: vec!["*".to_string()],
        }
    }
}

impl BotConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let flow = match lookup("CONNECT_HUB_FLOW") {
            Some(raw) => raw.parse()?,
            None => defaults.flow,
        };

        let http_port = match lookup("CONNECT_HUB_HTTP_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "CONNECT_HUB_HTTP_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => defaults.http_port,
        };

        let registration_url = lookup("CONNECT_HUB_REGISTRATION_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.registration_url);
        if !registration_url.starts_with("http://") && !registration_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "CONNECT_HUB_REGISTRATION_URL".to_string(),
                message: format!("'{registration_url}' must start with http:// or https://"),
            });
        }

        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let telegram_allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            bot_id: lookup("CONNECT_HUB_BOT_ID").unwrap_or(defaults.bot_id),
            flow,
            registration_url,
            db_path: lookup("CONNECT_HUB_DB_PATH").unwrap_or(defaults.db_path),
            http_port,
            telegram_token,
            telegram_allowed_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = BotConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.flow, FlowMode::Full);
        assert_eq!(config.http_port, 3978);
        assert_eq!(config.registration_url, "http://localhost:5000");
        assert_eq!(config.bot_id, "connect-hub");
        assert!(config.telegram_token.is_none());
        assert_eq!(config.telegram_allowed_users, vec!["*"]);
    }

    #[test]
    fn reads_overrides() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("CONNECT_HUB_FLOW", "Quick"),
            ("CONNECT_HUB_HTTP_PORT", "8080"),
            ("CONNECT_HUB_REGISTRATION_URL", "https://api.example.com/"),
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 42,"),
        ]))
        .unwrap();

        assert_eq!(config.flow, FlowMode::Quick);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.registration_url, "https://api.example.com");
        assert_eq!(
            config.telegram_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("123:ABC".to_string())
        );
        assert_eq!(config.telegram_allowed_users, vec!["alice", "42"]);
    }

    #[test]
    fn rejects_unknown_flow() {
        let err = BotConfig::from_lookup(lookup_from(&[("CONNECT_HUB_FLOW", "sideways")]))
            .unwrap_err();
        assert!(err.to_string().contains("CONNECT_HUB_FLOW"));
    }

    #[test]
    fn rejects_bad_port() {
        let err = BotConfig::from_lookup(lookup_from(&[("CONNECT_HUB_HTTP_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn rejects_url_without_scheme() {
        let err = BotConfig::from_lookup(lookup_from(&[(
            "CONNECT_HUB_REGISTRATION_URL",
            "api.example.com",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn blank_telegram_token_is_ignored() {
        let config =
            BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "  ")])).unwrap();
        assert!(config.telegram_token.is_none());
    }

    #[test]
    fn flow_mode_display_roundtrips() {
        for mode in [FlowMode::Quick, FlowMode::Full] {
            let parsed: FlowMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }
}
