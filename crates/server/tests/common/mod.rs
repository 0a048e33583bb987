//! Common test utilities for in-process API testing with mocks.
//!
//! The fixture wires the router to mock media collaborators and a mock text
//! detector, so no ffmpeg or tesseract is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use deepbrief_core::{
    analysis::{AnalysisConfig, PipelineCoordinator},
    progress::ProgressTracker,
    testing::{
        MockAudioExtractor, MockFrameExtractor, MockSceneDetector, MockTextDetector,
        MockValidator, RecordingSink,
    },
    Config,
};
use deepbrief_server::{api::WsBroadcaster, state::AppState};

/// Re-export fixtures for test convenience
pub use deepbrief_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_analyze() {
///     let fixture = TestFixture::new();
///
///     let response = fixture
///         .post("/api/v1/analyze", json!({ "video_path": "/v/talk.mp4" }))
///         .await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub validator: Arc<MockValidator>,
    pub audio: Arc<MockAudioExtractor>,
    pub scenes: Arc<MockSceneDetector>,
    pub frames: Arc<MockFrameExtractor>,
    pub text_detector: Arc<MockTextDetector>,
    /// Every progress event emitted through the tracker
    pub sink: RecordingSink,
    pub ws_broadcaster: WsBroadcaster,
    /// Scratch space for output directories
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_analysis_config(AnalysisConfig::default())
    }

    pub fn with_analysis_config(analysis: AnalysisConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let validator = Arc::new(MockValidator::new());
        let audio = Arc::new(MockAudioExtractor::new());
        let scenes = Arc::new(MockSceneDetector::new());
        let frames = Arc::new(MockFrameExtractor::new());
        let text_detector = Arc::new(MockTextDetector::new());

        let sink = RecordingSink::new();
        let ws_broadcaster = WsBroadcaster::default();
        let tracker = Arc::new(
            ProgressTracker::new()
                .with_sink(Arc::new(sink.clone()))
                .with_sink(Arc::new(ws_broadcaster.clone())),
        );

        let config = Config {
            analysis: analysis.clone(),
            ..Config::default()
        };

        let coordinator = PipelineCoordinator::new(
            analysis,
            validator.clone(),
            audio.clone(),
            scenes.clone(),
            frames.clone(),
        )
        .with_progress_tracker(Arc::clone(&tracker));

        let state = Arc::new(AppState::new(
            config,
            coordinator,
            text_detector.clone(),
            tracker,
            ws_broadcaster.clone(),
        ));

        Self {
            router: deepbrief_server::api::create_router(state),
            validator,
            audio,
            scenes,
            frames,
            text_detector,
            sink,
            ws_broadcaster,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).to_string()))
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
