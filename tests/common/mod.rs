#![allow(dead_code)]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use jawline::analyzer::mock::MockAnalyzer;
use jawline::auth::StaticAllowList;
use jawline::notify::Dispatcher;
use jawline::notify::mock::RecordingMessenger;
use jawline::session::Pipeline;
use jawline::web::AppState;

pub const BOUNDARY: &str = "jawline-test-boundary";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR-test-pixels";

/// One subscriber, "u1" → "Alex".
pub fn allow_list() -> StaticAllowList {
    [("u1", "Alex"), ("u2", "Sam")].into_iter().collect()
}

/// A web app wired to scripted collaborators.
pub struct Harness {
    pub analyzer: Arc<MockAnalyzer>,
    pub messenger: Arc<RecordingMessenger>,
    pub state: Arc<AppState>,
}

pub struct HarnessConfig {
    pub analyzer: MockAnalyzer,
    pub messenger: RecordingMessenger,
    pub bot_configured: bool,
    pub admin: Option<&'static str>,
    pub max_upload_bytes: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            analyzer: MockAnalyzer::replying(["Blade. Sharp, well-defined jaw."]),
            messenger: RecordingMessenger::default(),
            bot_configured: true,
            admin: None,
            max_upload_bytes: 1024 * 1024,
        }
    }
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let analyzer = Arc::new(config.analyzer);
        let messenger = Arc::new(config.messenger);
        let dispatcher = Dispatcher::new(
            config
                .bot_configured
                .then(|| messenger.clone() as Arc<dyn jawline::notify::Messenger>),
            config.admin.map(str::to_string),
        );
        let pipeline = Pipeline::new(analyzer.clone(), dispatcher);
        let state = AppState::new(
            Arc::new(allow_list()),
            pipeline,
            CancellationToken::new(),
            config.max_upload_bytes,
        )
        .unwrap();
        Self {
            analyzer,
            messenger,
            state: Arc::new(state),
        }
    }

    pub async fn get(&self, path: &str) -> warp::http::Response<bytes::Bytes> {
        warp::test::request()
            .method("GET")
            .path(path)
            .reply(&jawline::web::routes(self.state.clone()))
            .await
    }

    pub async fn upload(
        &self,
        path: &str,
        file_name: &str,
        content: &[u8],
    ) -> warp::http::Response<bytes::Bytes> {
        warp::test::request()
            .method("POST")
            .path(path)
            .header("content-type", multipart_content_type())
            .body(multipart_body("photo", file_name, content))
            .reply(&jawline::web::routes(self.state.clone()))
            .await
    }
}

impl Harness {
    /// POST an arbitrary body.
    pub async fn post(
        &self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> warp::http::Response<bytes::Bytes> {
        warp::test::request()
            .method("POST")
            .path(path)
            .header("content-type", content_type)
            .body(body)
            .reply(&jawline::web::routes(self.state.clone()))
            .await
    }
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// A single-file multipart body.
pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn text(resp: &warp::http::Response<bytes::Bytes>) -> String {
    String::from_utf8_lossy(resp.body()).into_owned()
}
