use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Analyzer;
use crate::photo::Photo;

/// A scripted analyzer for tests. Returns pre-defined replies in order.
pub struct MockAnalyzer {
    replies: Vec<Result<String, String>>,
    index: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies,
            index: AtomicUsize::new(0),
        }
    }

    /// Succeeds with each text in turn.
    pub fn replying<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    /// Fails once with `message`.
    pub fn failing(message: &str) -> Self {
        Self::new(vec![Err(message.to_string())])
    }

    /// How many times `analyze` was called.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, _photo: &Photo) -> Result<String> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(i) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(anyhow::anyhow!("{message}")),
            None => Err(anyhow::anyhow!(
                "MockAnalyzer: no more replies (called {} times)",
                i + 1
            )),
        }
    }
}
