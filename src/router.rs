use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::app::OcrApp;
use crate::error::AppError;
use crate::models::{CompartmentRequest, ProfilesResponse, SelectModelRequest, SelectProfileRequest, SessionView};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub struct RouterState {
  pub started_at: Instant,
  pub app: OcrApp,
}

pub fn build_router(state: RouterState) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/health", get(health))
    .route("/api/profiles", get(profiles))
    .route("/api/sessions", post(create_session))
    .route("/api/sessions/:id", get(session))
    .route("/api/sessions/:id/profile", post(select_profile))
    .route("/api/sessions/:id/compartment", post(enter_compartment))
    .route("/api/sessions/:id/model", post(select_model))
    .route("/api/sessions/:id/image", post(upload_image))
    .route("/api/sessions/:id/submit", post(submit))
    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .with_state(Arc::new(state))
}

pub async fn run_router(listener: TcpListener, state: RouterState) -> anyhow::Result<()> {
  listener.set_nonblocking(true)?;
  let listener = tokio::net::TcpListener::from_std(listener)?;
  axum::serve(listener, build_router(state)).await?;
  Ok(())
}

type Shared = State<Arc<RouterState>>;

async fn index() -> Html<&'static str> {
  Html(INDEX_HTML)
}

async fn health(State(state): Shared) -> Json<serde_json::Value> {
  let uptime = state.started_at.elapsed().as_millis();
  Json(serde_json::json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
    "uptime_ms": uptime,
    "sessions": state.app.session_count().await
  }))
}

async fn profiles(State(state): Shared) -> Json<ProfilesResponse> {
  Json(ProfilesResponse {
    profiles: state.app.profiles(),
  })
}

async fn create_session(State(state): Shared) -> Response {
  respond(state.app.create_session().await)
}

async fn session(State(state): Shared, Path(id): Path<Uuid>) -> Response {
  respond(state.app.view(id, None).await)
}

async fn select_profile(
  State(state): Shared,
  Path(id): Path<Uuid>,
  Json(req): Json<SelectProfileRequest>,
) -> Response {
  respond(state.app.select_profile(id, &req.profile).await)
}

async fn enter_compartment(
  State(state): Shared,
  Path(id): Path<Uuid>,
  Json(req): Json<CompartmentRequest>,
) -> Response {
  respond(state.app.enter_compartment(id, &req.compartment_id).await)
}

async fn select_model(
  State(state): Shared,
  Path(id): Path<Uuid>,
  Json(req): Json<SelectModelRequest>,
) -> Response {
  respond(state.app.select_model(id, &req.label).await)
}

async fn upload_image(State(state): Shared, Path(id): Path<Uuid>, mut multipart: Multipart) -> Response {
  let mut upload: Option<(String, Vec<u8>)> = None;
  loop {
    let field = match multipart.next_field().await {
      Ok(Some(field)) => field,
      Ok(None) => break,
      Err(err) => return error_response(StatusCode::BAD_REQUEST, "multipart_error", &err.to_string()),
    };
    if field.name() != Some("file") {
      continue;
    }
    let filename = field.file_name().unwrap_or_default().to_string();
    match field.bytes().await {
      Ok(bytes) => upload = Some((filename, bytes.to_vec())),
      Err(err) => return error_response(StatusCode::BAD_REQUEST, "multipart_error", &err.to_string()),
    }
  }

  let Some((filename, bytes)) = upload else {
    return respond(Err(AppError::InputMissing("Missing file in multipart form".to_string())));
  };
  respond(state.app.upload_image(id, &filename, &bytes).await)
}

async fn submit(State(state): Shared, Path(id): Path<Uuid>) -> Response {
  respond(state.app.submit(id).await)
}

fn respond(result: Result<SessionView, AppError>) -> Response {
  match result {
    Ok(view) => (StatusCode::OK, Json(view)).into_response(),
    Err(err) => error_response(err.status(), err.code(), &err.to_string()),
  }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
  let body = Json(serde_json::json!({ "error": message, "code": code }));
  (status, body).into_response()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  use crate::config::AppConfig;
  use crate::flow::FlowState;
  use crate::models::{ModelSummary, Outcome};
  use crate::testing::MockService;

  struct Server {
    base: String,
    http: reqwest::Client,
    _oci_config: tempfile::NamedTempFile,
  }

  async fn start(service: MockService) -> Server {
    let mut oci_config = tempfile::NamedTempFile::new().unwrap();
    oci_config.write_all(b"[DEFAULT]\n[WORK]\n").unwrap();
    let config = AppConfig {
      oci_config_path: oci_config.path().display().to_string(),
      ..AppConfig::default()
    };

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let state = RouterState {
      started_at: Instant::now(),
      app: OcrApp::new(config, Arc::new(service)),
    };
    tokio::spawn(async move {
      run_router(listener, state).await.unwrap();
    });

    Server {
      base,
      http: reqwest::Client::new(),
      _oci_config: oci_config,
    }
  }

  fn vision_models() -> MockService {
    MockService::default().with_models(vec![ModelSummary {
      id: "ocid1.generativeaimodel.oc1.us-chicago-1.v1".to_string(),
      display_name: "Vision1".to_string(),
      vendor: "V1".to_string(),
      capabilities: vec!["CHAT".to_string()],
      lifecycle_state: Some("ACTIVE".to_string()),
    }])
  }

  impl Server {
    async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
      self.http.post(format!("{}{path}", self.base)).json(&body).send().await.unwrap()
    }
  }

  #[tokio::test]
  async fn serves_page_and_health() {
    let server = start(MockService::default()).await;
    let page = server.http.get(&server.base).send().await.unwrap();
    assert_eq!(page.status(), 200);
    let html = page.text().await.unwrap();
    assert!(html.contains("OCI Vision OCR using Generative AI"));

    let health: serde_json::Value = server
      .http
      .get(format!("{}/health", server.base))
      .send()
      .await
      .unwrap()
      .json()
      .await
      .unwrap();
    assert_eq!(health["status"], "ok");
  }

  #[tokio::test]
  async fn profiles_come_from_oci_config() {
    let server = start(MockService::default()).await;
    let body: ProfilesResponse = server
      .http
      .get(format!("{}/api/profiles", server.base))
      .send()
      .await
      .unwrap()
      .json()
      .await
      .unwrap();
    assert_eq!(body.profiles, vec!["DEFAULT", "WORK"]);
  }

  #[tokio::test]
  async fn full_flow_over_http() {
    let server = start(vision_models()).await;
    let view: SessionView = server.post_json("/api/sessions", serde_json::json!({})).await.json().await.unwrap();
    let id = view.session_id;

    let view: SessionView = server
      .post_json(&format!("/api/sessions/{id}/compartment"), serde_json::json!({ "compartment_id": "c1" }))
      .await
      .json()
      .await
      .unwrap();
    assert_eq!(view.models[0].label, "Vision1 (V1)");

    let resp = server
      .post_json(&format!("/api/sessions/{id}/model"), serde_json::json!({ "label": "Vision1 (V1)" }))
      .await;
    assert_eq!(resp.status(), 200);

    let form = reqwest::multipart::Form::new().part(
      "file",
      reqwest::multipart::Part::bytes(b"\x89PNG\r\n".to_vec()).file_name("scan.png"),
    );
    let resp = server
      .http
      .post(format!("{}/api/sessions/{id}/image", server.base))
      .multipart(form)
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 200);

    let view: SessionView = server
      .post_json(&format!("/api/sessions/{id}/submit"), serde_json::json!({}))
      .await
      .json()
      .await
      .unwrap();
    assert_eq!(view.state, FlowState::Succeeded);
    assert_eq!(
      view.outcome,
      Some(Outcome::Markdown {
        text: "# Extracted".to_string()
      })
    );
  }

  #[tokio::test]
  async fn gated_submit_is_a_client_error() {
    let server = start(vision_models()).await;
    let view: SessionView = server.post_json("/api/sessions", serde_json::json!({})).await.json().await.unwrap();

    let resp = server
      .post_json(&format!("/api/sessions/{}/submit", view.session_id), serde_json::json!({}))
      .await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "input_missing");
  }

  #[tokio::test]
  async fn unknown_session_is_rejected() {
    let server = start(MockService::default()).await;
    let resp = server
      .http
      .get(format!("{}/api/sessions/{}", server.base, Uuid::new_v4()))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 400);
  }

  #[tokio::test]
  async fn profile_change_then_relist_needs_a_fresh_upload() {
    let server = start(vision_models()).await;
    let view: SessionView = server.post_json("/api/sessions", serde_json::json!({})).await.json().await.unwrap();
    let id = view.session_id;
    let upload = || {
      let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"\x89PNG\r\n".to_vec()).file_name("scan.png"),
      );
      server
        .http
        .post(format!("{}/api/sessions/{id}/image", server.base))
        .multipart(form)
        .send()
    };

    server
      .post_json(&format!("/api/sessions/{id}/compartment"), serde_json::json!({ "compartment_id": "c1" }))
      .await;
    server
      .post_json(&format!("/api/sessions/{id}/model"), serde_json::json!({ "label": "Vision1 (V1)" }))
      .await;
    assert_eq!(upload().await.unwrap().status(), 200);

    let view: SessionView = server
      .post_json(&format!("/api/sessions/{id}/profile"), serde_json::json!({ "profile": "WORK" }))
      .await
      .json()
      .await
      .unwrap();
    assert!(view.models.is_empty());
    assert_eq!(view.compartment_id, None);

    let view: SessionView = server
      .post_json(&format!("/api/sessions/{id}/compartment"), serde_json::json!({ "compartment_id": "c1" }))
      .await
      .json()
      .await
      .unwrap();
    assert_eq!(view.models.len(), 1);
    let view: SessionView = server
      .post_json(&format!("/api/sessions/{id}/model"), serde_json::json!({ "label": "Vision1 (V1)" }))
      .await
      .json()
      .await
      .unwrap();
    assert_eq!(view.state, FlowState::ModelSelected);
    assert_eq!(view.image, None);

    let view: SessionView = upload().await.unwrap().json().await.unwrap();
    assert_eq!(view.state, FlowState::ImageUploaded);
    assert_eq!(view.image.as_deref(), Some("scan.png"));
  }

  #[tokio::test]
  async fn page_keeps_inputs_in_step_with_the_session() {
    let server = start(MockService::default()).await;
    let html = server.http.get(&server.base).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("return listModels();"));
    assert!(html.contains("view = await uploadFile();"));
    assert!(html.contains("$(\"file\").value = \"\";"));
  }
}
