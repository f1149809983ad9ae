//! HTTP front end.
//!
//! Every request is its own session: the `uid` link token is checked on
//! each hit, the upload lives only for the duration of the POST, and the
//! pipeline runs inline before the response is rendered.

mod in_flight;
pub mod pages;

use std::convert::Infallible;
use std::sync::Arc;

use bytes::BufMut;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

pub use in_flight::{InFlight, InFlightGuard};

use crate::auth::{AccessDenied, AllowList};
use crate::photo::{Photo, UploadError};
use crate::session::{Pipeline, Session, SessionError};
use pages::Pages;

/// Name of the multipart field carrying the photo.
pub const PHOTO_FIELD: &str = "photo";

/// Shared, read-only after startup (apart from the in-flight set).
pub struct AppState {
    allow_list: Arc<dyn AllowList>,
    pipeline: Pipeline,
    pages: Pages,
    in_flight: Arc<InFlight>,
    shutdown: CancellationToken,
    max_upload_bytes: u64,
}

impl AppState {
    pub fn new(
        allow_list: Arc<dyn AllowList>,
        pipeline: Pipeline,
        shutdown: CancellationToken,
        max_upload_bytes: u64,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            allow_list,
            pipeline,
            pages: Pages::new()?,
            in_flight: Arc::new(InFlight::default()),
            shutdown,
            max_upload_bytes,
        })
    }

    pub fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }
}

#[derive(Debug, Default, Deserialize)]
struct EntryQuery {
    uid: Option<String>,
}

// Rejection raised by the gate, rendered as the denial page.
impl warp::reject::Reject for AccessDenied {}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let max_upload = state.max_upload_bytes;
    let denied_state = state.clone();
    let with_state = warp::any().map(move || state.clone());

    // A malformed query string counts as a missing uid.
    let entry = warp::query::<EntryQuery>()
        .or(warp::any().map(EntryQuery::default))
        .unify();
    let gate = entry.and(with_state.clone()).and_then(open_session);

    let index = warp::path::end()
        .and(warp::get())
        .and(gate.clone())
        .and(with_state.clone())
        .then(index_page);

    // The gate runs before the body is looked at.
    let analyze = warp::path("analyze")
        .and(warp::path::end())
        .and(warp::post())
        .and(gate)
        .and(warp::multipart::form().max_length(max_upload))
        .and(with_state)
        .then(analyze_upload);

    let health = warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "ok".into_response());

    index
        .or(analyze)
        .unify()
        .or(health)
        .unify()
        .recover(move |rejection: Rejection| recover(rejection, denied_state.clone()))
        .unify()
}

async fn open_session(query: EntryQuery, state: Arc<AppState>) -> Result<Session, Rejection> {
    let session = Session::open(query.uid.as_deref(), state.allow_list.as_ref());
    match session.identity() {
        Ok(_) => Ok(session),
        Err(_) => Err(warp::reject::custom(AccessDenied)),
    }
}

async fn index_page(session: Session, state: Arc<AppState>) -> Response {
    let Ok(identity) = session.identity() else {
        return html(StatusCode::FORBIDDEN, state.pages.denied());
    };
    tracing::info!(user = %identity.name, "session opened");
    html(StatusCode::OK, state.pages.upload(identity, true, None))
}

async fn analyze_upload(mut session: Session, form: FormData, state: Arc<AppState>) -> Response {
    let Ok(identity) = session.identity().cloned() else {
        return html(StatusCode::FORBIDDEN, state.pages.denied());
    };

    let photo = match read_photo(form).await {
        Ok(photo) => photo,
        Err(e) => {
            let message = e.to_string();
            return html(
                StatusCode::BAD_REQUEST,
                state.pages.upload(&identity, false, Some(&message)),
            );
        }
    };
    let photo_uri = photo.data_uri();

    let Some(_guard) = state.in_flight.try_begin(&identity.id) else {
        let message = SessionError::Busy.to_string();
        return html(
            StatusCode::CONFLICT,
            state.pages.upload(&identity, false, Some(&message)),
        );
    };

    let cancel = state.shutdown.child_token();
    let result = match session.attach(photo) {
        Ok(()) => session.analyze(&state.pipeline, &cancel).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => html(
            StatusCode::OK,
            state.pages.result(&identity, &photo_uri, &report),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "analysis did not complete");
            let message = e.to_string();
            html(
                StatusCode::SERVICE_UNAVAILABLE,
                state.pages.upload(&identity, false, Some(&message)),
            )
        }
    }
}

/// Pull the photo field out of the multipart body.
async fn read_photo(form: FormData) -> Result<Photo, UploadError> {
    let mut form = std::pin::pin!(form);
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| UploadError::Read(e.to_string()))?
    {
        if part.name() != PHOTO_FIELD {
            continue;
        }
        let file_name = part.filename().unwrap_or_default().to_string();
        let bytes = part
            .stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.put(chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| UploadError::Read(e.to_string()))?;
        return Photo::from_upload(&file_name, bytes);
    }
    Err(UploadError::Missing)
}

fn html(status: StatusCode, body: anyhow::Result<String>) -> Response {
    match body {
        Ok(body) => warp::reply::with_status(warp::reply::html(body), status).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render page");
            warp::reply::with_status("internal error", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}

async fn recover(rejection: Rejection, state: Arc<AppState>) -> Result<Response, Infallible> {
    if rejection.find::<AccessDenied>().is_some() {
        return Ok(html(StatusCode::FORBIDDEN, state.pages.denied()));
    }
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found")
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "photo is too large")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        tracing::debug!(?rejection, "bad request");
        (StatusCode::BAD_REQUEST, "bad request")
    };
    Ok(warp::reply::with_status(message, status).into_response())
}
