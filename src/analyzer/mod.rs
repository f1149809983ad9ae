pub mod gemini;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::consts::FALLBACK_TEXT;
use crate::photo::Photo;

/// Where the analysis text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Verbatim model output.
    Model,
    /// The model call failed; the text is [`FALLBACK_TEXT`].
    Fallback { reason: String },
}

/// The verdict carried to the page and the captions.
///
/// Downstream consumers only read `text`. `kind` is kept so tests and
/// logs can tell a failed call from a model that happened to answer with
/// the fallback sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub text: String,
    pub kind: AnalysisKind,
}

impl Analysis {
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnalysisKind::Model,
        }
    }

    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            kind: AnalysisKind::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, AnalysisKind::Fallback { .. })
    }
}

/// A hosted model that rates a photo. Could be Gemini or a test script.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, photo: &Photo) -> Result<String>;
}

/// Run one analysis, replacing any failure with the fallback text.
pub async fn analyze_or_fallback(analyzer: &dyn Analyzer, photo: &Photo) -> Analysis {
    match analyzer.analyze(photo).await {
        Ok(text) => Analysis::model(text),
        Err(e) => {
            tracing::warn!(error = %e, "analysis failed, using fallback text");
            Analysis::fallback(format!("{e:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockAnalyzer;
    use super::*;

    fn photo() -> Photo {
        Photo::from_upload("p.jpg", vec![0xFF, 0xD8, 0xFF]).unwrap()
    }

    #[tokio::test]
    async fn success_is_verbatim() {
        let analyzer = MockAnalyzer::replying(["  Medium. Soft but visible.\n"]);
        let analysis = analyze_or_fallback(&analyzer, &photo()).await;
        assert_eq!(analysis.text, "  Medium. Soft but visible.\n");
        assert_eq!(analysis.kind, AnalysisKind::Model);
    }

    #[tokio::test]
    async fn output_is_not_validated_against_categories() {
        let analyzer = MockAnalyzer::replying(["I like turtles"]);
        let analysis = analyze_or_fallback(&analyzer, &photo()).await;
        assert_eq!(analysis, Analysis::model("I like turtles"));
    }

    #[tokio::test]
    async fn error_becomes_fallback() {
        let analyzer = MockAnalyzer::failing("quota exceeded");
        let analysis = analyze_or_fallback(&analyzer, &photo()).await;
        assert_eq!(analysis.text, FALLBACK_TEXT);
        assert!(analysis.is_fallback());
        match analysis.kind {
            AnalysisKind::Fallback { reason } => assert!(reason.contains("quota exceeded")),
            AnalysisKind::Model => panic!("expected Fallback"),
        }
    }

    #[tokio::test]
    async fn fallback_text_matches_genuine_reply_with_same_text() {
        let failed = analyze_or_fallback(&MockAnalyzer::failing("boom"), &photo()).await;
        let genuine = analyze_or_fallback(&MockAnalyzer::replying([FALLBACK_TEXT]), &photo()).await;
        assert_eq!(failed.text, genuine.text);
        assert_ne!(failed.kind, genuine.kind);
    }
}
