use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{DeliveryError, Messenger};
use crate::photo::Photo;

/// One recorded `send_photo` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPhoto {
    pub chat_id: String,
    pub caption: String,
    pub bytes: Vec<u8>,
}

/// A messenger for tests. Records successful sends and fails for the
/// chat ids it was told to.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentPhoto>>,
    failing: HashSet<String>,
    attempts: Mutex<usize>,
}

impl RecordingMessenger {
    pub fn failing_for<I, S>(chat_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: chat_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sends that went through, in order.
    pub fn sent(&self) -> Vec<SentPhoto> {
        self.sent.lock().unwrap().clone()
    }

    /// All calls, including failed ones.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_photo(
        &self,
        chat_id: &str,
        photo: &Photo,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing.contains(chat_id) {
            return Err(DeliveryError::Rejected {
                status: 403,
                description: "Forbidden: bot can't initiate conversation with a user".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentPhoto {
            chat_id: chat_id.to_string(),
            caption: caption.to_string(),
            bytes: photo.bytes().to_vec(),
        });
        Ok(())
    }
}
