use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{DeliveryError, Messenger};
use crate::photo::Photo;

const API_BASE: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "Markdown";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends photos through the Telegram Bot API `sendPhoto` method.
pub struct TelegramMessenger {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramMessenger {
    pub fn new(token: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            token: token.into(),
            base_url: API_BASE.to_string(),
            client,
        })
    }

    /// Point at a different host (tests run a local stand-in).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendPhoto", self.base_url, self.token)
    }

    fn build_form(chat_id: &str, photo: &Photo, caption: &str) -> Result<Form, DeliveryError> {
        let part = Part::bytes(photo.bytes().to_vec())
            .file_name(photo.file_name().to_string())
            .mime_str(photo.media_type().mime())
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", PARSE_MODE)
            .part("photo", part))
    }
}

/// Telegram's error envelope. Only `description` is read.
#[derive(Deserialize)]
struct ApiError {
    description: Option<String>,
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_photo(
        &self,
        chat_id: &str,
        photo: &Photo,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        let form = Self::build_form(chat_id, photo, caption)?;

        let resp = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            // Drop the URL: it embeds the bot token.
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let description = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.description)
            .unwrap_or(body);
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_token() {
        let messenger = TelegramMessenger::new("123:abc")
            .unwrap()
            .with_base_url("http://localhost:9/");
        assert_eq!(messenger.endpoint(), "http://localhost:9/bot123:abc/sendPhoto");
    }

    #[test]
    fn default_base_is_telegram() {
        let messenger = TelegramMessenger::new("t").unwrap();
        assert_eq!(messenger.endpoint(), "https://api.telegram.org/bott/sendPhoto");
    }

    #[test]
    fn form_builds_for_each_media_type() {
        for name in ["a.jpg", "b.png"] {
            let photo = Photo::from_upload(name, vec![1, 2, 3]).unwrap();
            assert!(TelegramMessenger::build_form("1", &photo, "hi").is_ok());
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error_without_token() {
        let messenger = TelegramMessenger::new("secret-token")
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let photo = Photo::from_upload("a.jpg", vec![1]).unwrap();
        let err = messenger.send_photo("1", &photo, "c").await.unwrap_err();
        match err {
            DeliveryError::Transport(msg) => assert!(!msg.contains("secret-token")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
