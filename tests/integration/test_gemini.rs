//! Integration tests for the Gemini HTTP transport.
//!
//! An axum server impersonates the hosted model API so the real `reqwest`
//! client is exercised: request shapes, the API key header, status mapping,
//! refusals, and a full lesson generated over HTTP.

use std::sync::{Arc, Mutex};

use academy_core::{
    AcademyError, Config, ErrorClass, GeminiClient, ImageModel, ImageRequest, LessonGenerator,
    LessonRequest, TextModel, TextRequest, TransportErrorKind, IMAGE_PROMPT_PREFIX,
};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};

// ============================================================================
// Fake model service
// ============================================================================

/// A request received by the fake service.
#[derive(Debug, Clone)]
struct Recorded {
    call: String,
    api_key: Option<String>,
    body: Value,
}

/// Canned replies for both endpoints plus a log of received requests.
struct FakeService {
    text_reply: (u16, Value),
    image_reply: (u16, Value),
    requests: Mutex<Vec<Recorded>>,
}

impl FakeService {
    fn new(text_reply: (u16, Value), image_reply: (u16, Value)) -> Arc<Self> {
        Arc::new(Self {
            text_reply,
            image_reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

async fn handle_model_call(
    State(service): State<Arc<FakeService>>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    service
        .requests
        .lock()
        .expect("lock poisoned")
        .push(Recorded {
            call: call.clone(),
            api_key,
            body,
        });

    let (status, reply) = if call.ends_with(":generateContent") {
        service.text_reply.clone()
    } else if call.ends_with(":predict") {
        service.image_reply.clone()
    } else {
        (404, json!({ "error": { "code": 404, "message": "unknown method" } }))
    };

    (
        StatusCode::from_u16(status).expect("valid status"),
        Json(reply),
    )
}

/// Spawns the fake service and returns its base URL.
async fn spawn_fake(service: Arc<FakeService>) -> String {
    let router = Router::new()
        .route("/v1beta/models/:call", post(handle_model_call))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    format!("http://{addr}")
}

fn client_for(base_url: &str) -> GeminiClient {
    let config = Config {
        api_base_url: base_url.to_string(),
        ..Config::default()
    };
    GeminiClient::from_config(&config).expect("client should build")
}

fn key() -> SecretString {
    SecretString::from("fake-api-key")
}

fn text_reply(text: &str) -> (u16, Value) {
    (
        200,
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }),
    )
}

fn image_reply(data: &str) -> (u16, Value) {
    (
        200,
        json!({
            "predictions": [{ "bytesBase64Encoded": data, "mimeType": "image/png" }]
        }),
    )
}

fn error_reply(status: u16, message: &str) -> (u16, Value) {
    (
        status,
        json!({ "error": { "code": status, "message": message, "status": "ERROR" } }),
    )
}

fn text_request() -> TextRequest {
    TextRequest::structured(
        "You are the Headmaster.",
        "Please create a complete lesson about: Photosynthesis.",
        json!({ "type": "OBJECT" }),
    )
}

// ============================================================================
// Text endpoint
// ============================================================================

#[tokio::test]
async fn test_generate_text_success() {
    let service = FakeService::new(text_reply("{\"ok\":true}"), image_reply("AAAA"));
    let base_url = spawn_fake(Arc::clone(&service)).await;
    let client = client_for(&base_url);

    let text = client
        .generate_text(&key(), &text_request())
        .await
        .expect("text call should succeed");
    assert_eq!(text, "{\"ok\":true}");

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    let recorded = &requests[0];
    assert_eq!(recorded.call, "gemini-2.5-flash:generateContent");
    assert_eq!(recorded.api_key.as_deref(), Some("fake-api-key"));
    assert_eq!(
        recorded.body["systemInstruction"]["parts"][0]["text"],
        "You are the Headmaster."
    );
    assert_eq!(recorded.body["contents"][0]["role"], "user");
    assert_eq!(
        recorded.body["contents"][0]["parts"][0]["text"],
        "Please create a complete lesson about: Photosynthesis."
    );
    assert_eq!(
        recorded.body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(
        recorded.body["generationConfig"]["responseSchema"]["type"],
        "OBJECT"
    );
}

#[tokio::test]
async fn test_generate_text_status_mapping() {
    let cases = [
        (401, TransportErrorKind::Authentication),
        (403, TransportErrorKind::Authentication),
        (429, TransportErrorKind::RateLimit),
        (500, TransportErrorKind::Server),
        (503, TransportErrorKind::Server),
        (400, TransportErrorKind::Other),
    ];

    for (status, expected) in cases {
        let service = FakeService::new(error_reply(status, "nope"), image_reply("AAAA"));
        let base_url = spawn_fake(service).await;
        let client = client_for(&base_url);

        let err = client
            .generate_text(&key(), &text_request())
            .await
            .expect_err("error status must fail");
        assert_eq!(err.kind, expected, "status {status}");
        assert!(err.message.contains(&status.to_string()), "status {status}");
    }
}

#[tokio::test]
async fn test_generate_text_extracts_error_message() {
    let service = FakeService::new(
        error_reply(401, "API key not valid. Please pass a valid API key."),
        image_reply("AAAA"),
    );
    let base_url = spawn_fake(service).await;

    let err = client_for(&base_url)
        .generate_text(&key(), &text_request())
        .await
        .expect_err("401 must fail");

    assert!(err.message.contains("API key not valid"));
    assert!(!err.message.contains("fake-api-key"));
}

#[tokio::test]
async fn test_blocked_prompt_is_refusal() {
    let service = FakeService::new(
        (200, json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        image_reply("AAAA"),
    );
    let base_url = spawn_fake(service).await;

    let err = client_for(&base_url)
        .generate_text(&key(), &text_request())
        .await
        .expect_err("blocked prompt must fail");

    assert_eq!(err.kind, TransportErrorKind::Refusal);
    assert!(err.message.contains("SAFETY"));
}

#[tokio::test]
async fn test_empty_candidate_is_refusal() {
    let service = FakeService::new(
        (
            200,
            json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "RECITATION" }] }),
        ),
        image_reply("AAAA"),
    );
    let base_url = spawn_fake(service).await;

    let err = client_for(&base_url)
        .generate_text(&key(), &text_request())
        .await
        .expect_err("empty candidate must fail");

    assert_eq!(err.kind, TransportErrorKind::Refusal);
    assert!(err.message.contains("RECITATION"));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);

    let err = client_for(&format!("http://{addr}"))
        .generate_text(&key(), &text_request())
        .await
        .expect_err("closed port must fail");

    assert_eq!(err.kind, TransportErrorKind::Network);
}

// ============================================================================
// Image endpoint
// ============================================================================

#[tokio::test]
async fn test_generate_images_success() {
    let service = FakeService::new(text_reply("{}"), image_reply("iVBORw0KGgo="));
    let base_url = spawn_fake(Arc::clone(&service)).await;
    let client = client_for(&base_url);

    let request = ImageRequest::panel(format!("{IMAGE_PROMPT_PREFIX} an owl at a blackboard"));
    let images = client
        .generate_images(&key(), &request)
        .await
        .expect("image call should succeed");

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].to_data_uri(), "data:image/png;base64,iVBORw0KGgo=");

    let requests = service.requests();
    let recorded = &requests[0];
    assert_eq!(recorded.call, "imagen-4.0-generate-001:predict");
    assert_eq!(recorded.api_key.as_deref(), Some("fake-api-key"));
    assert_eq!(
        recorded.body["instances"][0]["prompt"],
        format!("{IMAGE_PROMPT_PREFIX} an owl at a blackboard")
    );
    assert_eq!(recorded.body["parameters"]["sampleCount"], 1);
    assert_eq!(recorded.body["parameters"]["aspectRatio"], "1:1");
    assert_eq!(
        recorded.body["parameters"]["outputOptions"]["mimeType"],
        "image/png"
    );
}

#[tokio::test]
async fn test_filtered_predictions_yield_no_images() {
    let service = FakeService::new(
        text_reply("{}"),
        (200, json!({ "predictions": [{ "raiFilteredReason": "filtered" }] })),
    );
    let base_url = spawn_fake(service).await;

    let images = client_for(&base_url)
        .generate_images(&key(), &ImageRequest::panel("anything"))
        .await
        .expect("filtered response is still a response");

    assert!(images.is_empty());
}

// ============================================================================
// Full lesson over HTTP
// ============================================================================

fn lesson_body(panels: usize) -> String {
    let script: Vec<Value> = (0..panels)
        .map(|i| {
            json!({
                "narrative": format!("Owl draws diagram {i}."),
                "image_prompt": format!("{IMAGE_PROMPT_PREFIX} an owl drawing diagram {i}")
            })
        })
        .collect();

    json!({
        "quote": { "text": "Education is the kindling of a flame.", "author": "Socrates" },
        "explanation": "Gravity pulls masses together.\n\nIt keeps the [Moon](https://en.wikipedia.org/wiki/Moon) in orbit.",
        "recommended_reading": ["Hawking, S. (1988). A Brief History of Time. Bantam."],
        "comic_script": script,
        "flashcards": [{ "term": "Mass", "definition": "The **amount of matter** in an object." }],
        "mind_map": { "title": "Gravity", "children": [{ "title": "Newton" }, { "title": "Einstein" }] }
    })
    .to_string()
}

#[tokio::test]
async fn test_lesson_over_http() {
    let service = FakeService::new(text_reply(&lesson_body(4)), image_reply("UE5H"));
    let base_url = spawn_fake(Arc::clone(&service)).await;
    let client = client_for(&base_url);

    let gen = LessonGenerator::new(client.clone(), client, Config::default())
        .with_credential(key());
    let lesson = gen
        .generate_lesson(&LessonRequest::new("Gravity"))
        .await
        .expect("lesson should generate over HTTP");

    assert_eq!(lesson.topic, "Gravity");
    assert_eq!(lesson.comic_panels.len(), 4);
    assert!(lesson
        .comic_panels
        .iter()
        .all(|p| p.image_url == "data:image/png;base64,UE5H"));

    let requests = service.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(
        requests
            .iter()
            .filter(|r| r.call.ends_with(":predict"))
            .count(),
        4
    );
    assert!(requests
        .iter()
        .all(|r| r.api_key.as_deref() == Some("fake-api-key")));
}

#[tokio::test]
async fn test_image_auth_failure_fails_lesson() {
    let service = FakeService::new(
        text_reply(&lesson_body(4)),
        error_reply(403, "Imagen API has not been enabled for this project."),
    );
    let base_url = spawn_fake(service).await;
    let client = client_for(&base_url);

    let gen = LessonGenerator::new(client.clone(), client, Config::default())
        .with_credential(key());
    let err = gen
        .generate_lesson(&LessonRequest::new("Gravity"))
        .await
        .expect_err("image failure must fail the lesson");

    assert_eq!(err.class(), ErrorClass::ImageGeneration);
    assert!(matches!(
        err,
        AcademyError::ImageGeneration {
            kind: Some(TransportErrorKind::Authentication),
            ..
        }
    ));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("Imagen API has not been enabled"));
}

#[tokio::test]
async fn test_text_rate_limit_fails_before_images() {
    let service = FakeService::new(
        error_reply(429, "Resource has been exhausted."),
        image_reply("UE5H"),
    );
    let base_url = spawn_fake(Arc::clone(&service)).await;
    let client = client_for(&base_url);

    let gen = LessonGenerator::new(client.clone(), client, Config::default())
        .with_credential(key());
    let err = gen
        .generate_lesson(&LessonRequest::new("Gravity"))
        .await
        .expect_err("rate limit must fail the lesson");

    assert_eq!(err.class(), ErrorClass::Transport);
    assert!(err.is_transient());
    assert_eq!(service.requests().len(), 1);
}
