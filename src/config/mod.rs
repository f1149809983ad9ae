//! Process-wide secrets, loaded once before the server starts.
//!
//! The file is TOML with three top-level credentials and an
//! `[allowed_users]` table mapping identifiers to display names. Each
//! credential falls back to the environment variable of the same name
//! when the file leaves it out.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Chat ids are numbers on Telegram's side, but operators write them
/// either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ChatId {
    Text(String),
    Number(i64),
}

impl ChatId {
    fn into_string(self) -> String {
        match self {
            ChatId::Text(s) => s,
            ChatId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSecrets {
    #[serde(rename = "GOOGLE_API_KEY")]
    google_api_key: Option<String>,
    #[serde(rename = "TELEGRAM_BOT_TOKEN")]
    telegram_bot_token: Option<String>,
    #[serde(rename = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<ChatId>,
    #[serde(default)]
    allowed_users: HashMap<String, String>,
}

/// Read-only secrets. Absent values disable the matching capability.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub google_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub admin_chat_id: Option<String>,
    pub allowed_users: HashMap<String, String>,
}

impl Secrets {
    /// Load from a TOML file, then fill gaps from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read secrets file {}", path.display()))?;
        let secrets = Self::parse(&text)
            .with_context(|| format!("failed to parse secrets file {}", path.display()))?;
        Ok(secrets.with_env_fallback(|key| std::env::var(key).ok()))
    }

    /// Parse TOML without touching the environment.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawSecrets = toml::from_str(text)?;
        Ok(Self {
            google_api_key: non_empty(raw.google_api_key),
            telegram_bot_token: non_empty(raw.telegram_bot_token),
            admin_chat_id: non_empty(raw.telegram_chat_id.map(ChatId::into_string)),
            allowed_users: raw.allowed_users,
        })
    }

    /// Fill missing credentials using `lookup` (the environment in
    /// production). Values already present are kept.
    pub fn with_env_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.google_api_key.is_none() {
            self.google_api_key = non_empty(lookup(GOOGLE_API_KEY));
        }
        if self.telegram_bot_token.is_none() {
            self.telegram_bot_token = non_empty(lookup(TELEGRAM_BOT_TOKEN));
        }
        if self.admin_chat_id.is_none() {
            self.admin_chat_id = non_empty(lookup(TELEGRAM_CHAT_ID));
        }
        self
    }

    pub fn notifications_enabled(&self) -> bool {
        self.telegram_bot_token.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        GOOGLE_API_KEY = "g-key"
        TELEGRAM_BOT_TOKEN = "123:abc"
        TELEGRAM_CHAT_ID = "999"

        [allowed_users]
        "u1" = "Alex"
        "12345" = "Sam"
    "#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_all_fields() {
        let secrets = Secrets::parse(FULL).unwrap();
        assert_eq!(secrets.google_api_key.as_deref(), Some("g-key"));
        assert_eq!(secrets.telegram_bot_token.as_deref(), Some("123:abc"));
        assert_eq!(secrets.admin_chat_id.as_deref(), Some("999"));
        assert_eq!(secrets.allowed_users.len(), 2);
        assert_eq!(secrets.allowed_users["u1"], "Alex");
        assert!(secrets.notifications_enabled());
    }

    #[test]
    fn numeric_chat_id_is_accepted() {
        let secrets = Secrets::parse("TELEGRAM_CHAT_ID = -100123").unwrap();
        assert_eq!(secrets.admin_chat_id.as_deref(), Some("-100123"));
    }

    #[test]
    fn missing_everything_is_empty_not_error() {
        let secrets = Secrets::parse("").unwrap().with_env_fallback(no_env);
        assert!(secrets.google_api_key.is_none());
        assert!(secrets.telegram_bot_token.is_none());
        assert!(secrets.admin_chat_id.is_none());
        assert!(secrets.allowed_users.is_empty());
        assert!(!secrets.notifications_enabled());
    }

    #[test]
    fn blank_values_count_as_absent() {
        let secrets = Secrets::parse(r#"TELEGRAM_BOT_TOKEN = "  ""#).unwrap();
        assert!(secrets.telegram_bot_token.is_none());
    }

    #[test]
    fn env_fills_only_gaps() {
        let secrets = Secrets::parse(r#"GOOGLE_API_KEY = "from-file""#)
            .unwrap()
            .with_env_fallback(|key| Some(format!("env-{key}")));
        assert_eq!(secrets.google_api_key.as_deref(), Some("from-file"));
        assert_eq!(
            secrets.telegram_bot_token.as_deref(),
            Some("env-TELEGRAM_BOT_TOKEN")
        );
        assert_eq!(secrets.admin_chat_id.as_deref(), Some("env-TELEGRAM_CHAT_ID"));
    }

    #[test]
    fn malformed_toml_is_error() {
        assert!(Secrets::parse("allowed_users = 3").is_err());
        assert!(Secrets::parse("[[[").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, FULL).unwrap();

        let secrets = Secrets::load(&path).unwrap();
        assert_eq!(secrets.allowed_users["12345"], "Sam");
    }

    #[test]
    fn load_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Secrets::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("nope.toml"));
    }
}
