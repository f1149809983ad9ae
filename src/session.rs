//! One subscriber's interaction, from identity resolution to the final
//! displayed outcome.
//!
//! ```text
//! open ──► Denied (terminal)
//!   └────► Ready ──attach──► UploadPresent ──analyze──► Analyzing ──► Complete
//!                                ▲                                       │
//!                                └──────────────attach───────────────────┘
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::analyzer::{Analysis, Analyzer, analyze_or_fallback};
use crate::auth::{AccessDenied, AllowList, Identity, authorize};
use crate::notify::{Delivery, Dispatcher};
use crate::photo::Photo;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error("upload a photo first")]
    NoUpload,
    #[error("an analysis is already in progress")]
    Busy,
    #[error("analysis was cancelled")]
    Cancelled,
}

/// Final status shown to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The subscriber's own copy did not arrive. Carries the message to show.
    PartialFailure(String),
}

/// Everything one analysis produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub analysis: Analysis,
    pub delivery: Delivery,
}

impl Report {
    pub fn status(&self) -> Status {
        match self.delivery.user_error() {
            Some(message) => Status::PartialFailure(message),
            None => Status::Success,
        }
    }

    pub fn preview(&self) -> &str {
        &self.analysis.text
    }
}

/// Inference then delivery, strictly in sequence.
#[derive(Clone)]
pub struct Pipeline {
    analyzer: Arc<dyn Analyzer>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(analyzer: Arc<dyn Analyzer>, dispatcher: Dispatcher) -> Self {
        Self {
            analyzer,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one analysis. Cancellation is only checked between and during
    /// the network calls; nothing is rolled back.
    pub async fn run(
        &self,
        identity: &Identity,
        photo: &Photo,
        cancel: &CancellationToken,
    ) -> Result<Report, SessionError> {
        let analysis = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            analysis = analyze_or_fallback(self.analyzer.as_ref(), photo) => analysis,
        };

        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            delivery = self.dispatcher.dispatch(identity, photo, &analysis.text) => delivery,
        };

        tracing::info!(
            fallback = analysis.is_fallback(),
            user = ?delivery.user,
            admin = ?delivery.admin,
            "analysis complete"
        );

        Ok(Report { analysis, delivery })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Denied,
    Ready,
    UploadPresent(Photo),
    Analyzing,
    Complete(Report),
}

/// A single session. Identity is resolved once and never changes.
#[derive(Debug)]
pub struct Session {
    identity: Option<Identity>,
    state: SessionState,
}

impl Session {
    pub fn open(uid: Option<&str>, allow_list: &dyn AllowList) -> Self {
        match authorize(uid, allow_list) {
            Ok(identity) => Self {
                identity: Some(identity),
                state: SessionState::Ready,
            },
            Err(AccessDenied) => Self {
                identity: None,
                state: SessionState::Denied,
            },
        }
    }

    pub fn identity(&self) -> Result<&Identity, SessionError> {
        self.identity.as_ref().ok_or(SessionError::Denied(AccessDenied))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Hold a new upload. Replaces any earlier photo or result.
    pub fn attach(&mut self, photo: Photo) -> Result<(), SessionError> {
        match self.state {
            SessionState::Denied => Err(SessionError::Denied(AccessDenied)),
            SessionState::Analyzing => Err(SessionError::Busy),
            _ => {
                self.state = SessionState::UploadPresent(photo);
                Ok(())
            }
        }
    }

    /// Explicit trigger. Runs the pipeline and leaves the session Complete.
    ///
    /// The photo is dropped once the run finishes. On cancellation the
    /// session goes back to Ready.
    pub async fn analyze(
        &mut self,
        pipeline: &Pipeline,
        cancel: &CancellationToken,
    ) -> Result<Report, SessionError> {
        let identity = self.identity()?.clone();
        let photo = match std::mem::replace(&mut self.state, SessionState::Analyzing) {
            SessionState::UploadPresent(photo) => photo,
            SessionState::Analyzing => return Err(SessionError::Busy),
            other => {
                self.state = other;
                return Err(SessionError::NoUpload);
            }
        };

        match pipeline.run(&identity, &photo, cancel).await {
            Ok(report) => {
                self.state = SessionState::Complete(report.clone());
                Ok(report)
            }
            Err(e) => {
                self.state = SessionState::Ready;
                Err(e)
            }
        }
    }
}
