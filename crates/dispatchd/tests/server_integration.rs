//! Integration tests for the HTTP hook server.
//!
//! Drives the router end to end: transform events with inline and on-disk
//! descriptors, semantic lookups through a stub collaborator, and the manual
//! select endpoint.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use dispatch_core::report::REPORT_PATH;
use dispatch_core::Config;
use dispatchd::generator::{GenerateRequest, GenerateResponse, GeneratorError, TextGenerator};
use dispatchd::server::{create_router, AppState};
use dispatchd::Dispatcher;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Collaborator that always answers with the same reply.
#[derive(Debug)]
struct FixedReply {
    reply: String,
    calls: AtomicUsize,
}

impl FixedReply {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for FixedReply {
    async fn generate_text(
        &self,
        _request: GenerateRequest,
    ) -> Result<GenerateResponse, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerateResponse {
            text: Some(self.reply.clone()),
            content: None,
        })
    }
}

fn create_test_app(config: Config, generator: Option<Arc<dyn TextGenerator>>) -> axum::Router {
    let state = Arc::new(AppState {
        dispatcher: Arc::new(Dispatcher::new(&config, generator)),
        config: Arc::new(config),
        auth_token: None,
    });
    create_router(state)
}

async fn body_to_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post(app: axum::Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response: Response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response).await)
}

fn descriptor(name: &str, description: &str) -> String {
    format!("---\nname: {name}\ndescription: \"{description}\"\n---\n\n# {name}\n")
}

fn write_skill(root: &Path, name: &str, description: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("SKILL.md"), descriptor(name, description)).unwrap();
}

fn record_paths(json: &Value) -> Vec<String> {
    json["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| match r {
            Value::String(path) => path.clone(),
            other => other["path"].as_str().unwrap().to_string(),
        })
        .collect()
}

// --- Transform ---

#[tokio::test]
async fn transform_with_inline_descriptors() {
    let app = create_test_app(Config::default(), None);
    let body = json!({
        "messages": [
            { "role": "user", "content": "earlier question about docx" },
            { "role": "assistant", "content": "sure" },
            { "role": "user", "content": [
                { "type": "text", "text": "please merge these spreadsheets" },
                { "type": "text", "text": "and export with xlsx" }
            ]}
        ],
        "records": [
            "AGENTS.md",
            { "path": "skills/xlsx/SKILL.md", "content": descriptor("xlsx", "Spreadsheet editing") },
            { "path": "skills/docx/SKILL.md", "content": descriptor("docx", "Word documents") },
            "skills/docx/template.docx",
            { "path": "skills/qmd/SKILL.md", "content": descriptor("qmd", "Markdown search") }
        ]
    });

    let (status, json) = post(app, "/hooks/transform", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["kind"], "rewritten");
    assert_eq!(json["outcome"]["selected"], json!(["qmd", "xlsx"]));
    assert_eq!(json["outcome"]["removed"], 2);
    assert_eq!(
        record_paths(&json),
        vec![
            "AGENTS.md",
            "skills/xlsx/SKILL.md",
            "skills/qmd/SKILL.md",
            REPORT_PATH
        ]
    );

    let report = json["records"][3]["content"].as_str().unwrap();
    assert!(report.contains("xlsx"));
    assert!(report.contains("Threshold: 60"));
}

#[tokio::test]
async fn transform_uses_semantic_recommendation() {
    let stub = FixedReply::new("Relevant skills:\n```json\n[\"docx\", \"made-up\"]\n```");
    let generator: Arc<dyn TextGenerator> = Arc::clone(&stub) as Arc<dyn TextGenerator>;
    let app = create_test_app(Config::default(), Some(generator));
    let body = json!({
        "messages": [{ "role": "user", "content": "draft a cover letter" }],
        "records": [
            { "path": "skills/docx/SKILL.md", "content": descriptor("docx", "Word documents") },
            { "path": "skills/pdf/SKILL.md", "content": descriptor("pdf", "PDF forms") }
        ]
    });

    let (status, json) = post(app, "/hooks/transform", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["selected"], json!(["docx"]));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transform_reads_descriptors_from_disk() {
    let tmp = TempDir::new().unwrap();
    let skills = tmp.path().join("skills");
    write_skill(&skills, "pdf", "Fill and extract PDF forms");
    write_skill(&skills, "pptx", "Slide decks");

    let app = create_test_app(Config::default(), None);
    let pdf = skills.join("pdf/SKILL.md");
    let pptx = skills.join("pptx/SKILL.md");
    let body = json!({
        "messages": [{ "role": "user", "content": "extract the pdf forms" }],
        "records": [pdf.to_str().unwrap(), pptx.to_str().unwrap()]
    });

    let (_, json) = post(app, "/hooks/transform", &body).await;
    assert_eq!(json["outcome"]["selected"], json!(["pdf"]));
    assert_eq!(json["outcome"]["removed"], 1);
}

#[tokio::test]
async fn transform_accepts_non_text_content_and_reads_disk() {
    let tmp = TempDir::new().unwrap();
    let skills = tmp.path().join("skills");
    write_skill(&skills, "pdf", "Fill and extract PDF forms");
    write_skill(&skills, "pptx", "Slide decks");

    let app = create_test_app(Config::default(), None);
    let pdf = skills.join("pdf/SKILL.md");
    let pptx = skills.join("pptx/SKILL.md");
    let body = json!({
        "messages": [{ "role": "user", "content": "extract the pdf forms" }],
        "records": [
            { "path": pdf.to_str().unwrap(), "content": { "type": "buffer", "data": [45, 45, 45] } },
            { "path": pptx.to_str().unwrap(), "content": null }
        ]
    });

    let (status, json) = post(app, "/hooks/transform", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["selected"], json!(["pdf"]));
    assert_eq!(json["records"][0], body["records"][0]);

    let report = json["records"][1]["content"].as_str().unwrap();
    assert!(report.contains("Description keywords"));
}

#[tokio::test]
async fn transform_with_nothing_selected_drops_all_skills() {
    let config = Config {
        exemptions: Vec::new(),
        ..Config::default()
    };
    let app = create_test_app(config, None);
    let body = json!({
        "messages": [{ "role": "user", "content": "what time is it" }],
        "records": ["notes.md", "skills/pdf/SKILL.md"]
    });

    let (_, json) = post(app, "/hooks/transform", &body).await;
    assert_eq!(json["outcome"]["kind"], "rewritten");
    assert_eq!(json["outcome"]["report_appended"], false);
    assert_eq!(record_paths(&json), vec!["notes.md"]);
}

#[tokio::test]
async fn transform_is_idempotent() {
    let body = json!({
        "messages": [{ "role": "user", "content": "convert pdf to docx" }],
        "records": [
            { "path": "skills/docx/SKILL.md", "content": descriptor("docx", "Word") },
            { "path": "skills/pdf/SKILL.md", "content": descriptor("pdf", "PDF") },
            { "path": "skills/xlsx/SKILL.md", "content": descriptor("xlsx", "Sheets") }
        ]
    });

    let first = post(create_test_app(Config::default(), None), "/hooks/transform", &body).await;
    let second = post(create_test_app(Config::default(), None), "/hooks/transform", &body).await;
    assert_eq!(first, second);
}

// --- Manual select ---

#[tokio::test]
async fn select_scans_skills_directories() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();
    write_skill(project.path(), "pdf", "PDF forms");
    write_skill(global.path(), "pdf", "Shadowed copy");
    write_skill(global.path(), "zesty-dispatcher", "Routing");

    let config = Config {
        enable_tool: true,
        skills_dirs: vec![project.path().to_path_buf(), global.path().to_path_buf()],
        ..Config::default()
    };
    let app = create_test_app(config, None);

    let (status, json) = post(app, "/select", &json!({ "query": "fill a pdf" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["candidates"], json!(["pdf", "zesty-dispatcher"]));
    assert_eq!(
        json["selection"]["selected"],
        json!(["pdf", "zesty-dispatcher"])
    );
    assert_eq!(json["selection"]["scores"]["zesty-dispatcher"]["score"], 999);
    assert_eq!(json["selection"]["recommendation"]["status"], "unavailable");
}

#[tokio::test]
async fn select_accepts_directory_override() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "xlsx", "Spreadsheets");

    let config = Config {
        enable_tool: true,
        skills_dirs: Vec::new(),
        ..Config::default()
    };
    let app = create_test_app(config, None);
    let body = json!({ "query": "open the xlsx", "skills_dirs": [tmp.path()] });

    let (status, json) = post(app, "/select", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["selection"]["selected"], json!(["xlsx"]));
}
