//! Access gate: a pre-shared link token checked against a closed list.
//!
//! The backing store is behind [`AllowList`] so the gate does not care
//! whether subscribers live in the secrets file or in a database.

pub mod sqlite;

use std::collections::HashMap;

use anyhow::Result;

pub use sqlite::SqliteAllowList;

/// Read-only lookup of subscriber identifiers.
pub trait AllowList: Send + Sync {
    /// Display name for `id`, or `None` if it is not a subscriber.
    fn lookup(&self, id: &str) -> Result<Option<String>>;

    /// Number of subscribers (for the startup banner).
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Allow-list held in memory, built from the `[allowed_users]` table.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowList {
    users: HashMap<String, String>,
}

impl StaticAllowList {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticAllowList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl AllowList for StaticAllowList {
    fn lookup(&self, id: &str) -> Result<Option<String>> {
        Ok(self.users.get(id).cloned())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.users.len())
    }
}

/// An authorized caller. Fixed for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

/// The caller has no valid subscription link. Terminal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("access denied")]
pub struct AccessDenied;

impl AccessDenied {
    pub const TITLE: &'static str = "⛔ Access Denied";
    pub const REASON: &'static str = "You need a personal subscription link to use this tool.";
    pub const CONTACT: &'static str = "Contact the admin on Telegram to buy a pass.";
}

/// Resolve the link token to an identity, failing closed.
///
/// Absent, blank and unknown tokens are treated identically. A backend
/// error also denies; it is only visible in the logs.
pub fn authorize(uid: Option<&str>, list: &dyn AllowList) -> Result<Identity, AccessDenied> {
    let Some(id) = uid.filter(|id| !id.is_empty()) else {
        tracing::debug!("denied: no uid in link");
        return Err(AccessDenied);
    };

    match list.lookup(id) {
        Ok(Some(name)) => Ok(Identity {
            id: id.to_string(),
            name,
        }),
        Ok(None) => {
            tracing::debug!("denied: uid not on allow-list");
            Err(AccessDenied)
        }
        Err(e) => {
            tracing::error!(error = %e, "allow-list lookup failed");
            Err(AccessDenied)
        }
    }
}
