//! Relays the photo and verdict to the subscriber and a copy to the admin.
//!
//! Delivery to the subscriber can fail visibly; delivery to the admin is
//! best effort and never changes what the subscriber sees.

pub mod mock;
pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::Identity;
use crate::photo::Photo;

/// A chat platform that can send a captioned photo.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_photo(&self, chat_id: &str, photo: &Photo, caption: &str)
    -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("rejected ({status}): {description}")]
    Rejected { status: u16, description: String },
}

/// What happened to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(DeliveryError),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No bot token configured.
    NotConfigured,
    /// No admin chat configured.
    NoAdmin,
    /// The admin is the subscriber; one copy is enough.
    SameAsUser,
}

/// Per-recipient outcomes of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub user: DeliveryOutcome,
    pub admin: DeliveryOutcome,
}

impl Delivery {
    /// Message for the subscriber when their own copy did not arrive.
    pub fn user_error(&self) -> Option<String> {
        match &self.user {
            DeliveryOutcome::Failed(e) => Some(format!(
                "Could not message you on Telegram. Make sure you have clicked START on the bot! Error: {e}"
            )),
            _ => None,
        }
    }
}

pub fn user_caption(result: &str) -> String {
    format!(
        "💎 **Your Analysis**\n\n{}\n\n_Thank you for subscribing!_",
        escape_markdown(result)
    )
}

pub fn admin_caption(identity: &Identity, result: &str) -> String {
    format!(
        "👤 **User:** {} (`{}`)\n📊 **Result:** {}",
        escape_markdown(&identity.name),
        // Code spans are literal; only a backtick can end one early.
        identity.id.replace('`', ""),
        escape_markdown(result)
    )
}

/// Backslash-escape the characters Telegram's legacy Markdown treats as
/// entity delimiters. Unbalanced ones make `sendPhoto` fail with 400.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Sends to the subscriber first, then the admin copy.
#[derive(Clone, Default)]
pub struct Dispatcher {
    messenger: Option<Arc<dyn Messenger>>,
    admin_chat: Option<String>,
}

impl Dispatcher {
    /// `messenger` is `None` when no bot token is configured, which
    /// silently disables all delivery.
    pub fn new(messenger: Option<Arc<dyn Messenger>>, admin_chat: Option<String>) -> Self {
        Self {
            messenger,
            admin_chat,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.messenger.is_some()
    }

    pub fn admin_chat(&self) -> Option<&str> {
        self.admin_chat.as_deref()
    }

    pub async fn dispatch(&self, identity: &Identity, photo: &Photo, result: &str) -> Delivery {
        let Some(messenger) = &self.messenger else {
            return Delivery {
                user: DeliveryOutcome::Skipped(SkipReason::NotConfigured),
                admin: DeliveryOutcome::Skipped(SkipReason::NotConfigured),
            };
        };

        let user = match messenger
            .send_photo(&identity.id, photo, &user_caption(result))
            .await
        {
            Ok(()) => DeliveryOutcome::Sent,
            Err(e) => {
                tracing::warn!(error = %e, "delivery to subscriber failed");
                DeliveryOutcome::Failed(e)
            }
        };

        let admin = match self.admin_chat.as_deref() {
            None => DeliveryOutcome::Skipped(SkipReason::NoAdmin),
            Some(admin) if admin == identity.id => DeliveryOutcome::Skipped(SkipReason::SameAsUser),
            Some(admin) => match messenger
                .send_photo(admin, photo, &admin_caption(identity, result))
                .await
            {
                Ok(()) => DeliveryOutcome::Sent,
                Err(e) => {
                    tracing::warn!(error = %e, "admin copy failed");
                    DeliveryOutcome::Failed(e)
                }
            },
        };

        Delivery { user, admin }
    }
}
