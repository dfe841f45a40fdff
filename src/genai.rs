//! Client for the OCI Generative AI management and inference APIs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{ChatDetails, ChatResult, ModelCollection, ModelSummary};
use crate::profiles::{load_profile, OciProfile};
use crate::signer::RequestSigner;

const API_VERSION: &str = "20231130";

#[async_trait]
pub trait GenAiService: Send + Sync {
  async fn list_models(&self, profile: &str, compartment_id: &str) -> Result<Vec<ModelSummary>, AppError>;

  async fn chat(&self, profile: &str, details: &ChatDetails) -> Result<ChatResult, AppError>;
}

pub struct OciGenAiClient {
  http: reqwest::Client,
  oci_config_path: PathBuf,
  inference_endpoint: Url,
  management_endpoint: Option<Url>,
}

impl OciGenAiClient {
  pub fn new(config: &AppConfig) -> Result<Self, AppError> {
    // reqwest never retries on its own; the timeouts are the only guard.
    let http = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
      .read_timeout(Duration::from_secs(config.read_timeout_secs))
      .build()
      .map_err(|err| AppError::ConfigMissing(format!("cannot build HTTP client: {err}")))?;

    let inference_endpoint = parse_endpoint(&config.inference_endpoint)?;
    let management_endpoint = config
      .management_endpoint
      .as_deref()
      .map(parse_endpoint)
      .transpose()?;

    Ok(Self {
      http,
      oci_config_path: config.oci_config_path(),
      inference_endpoint,
      management_endpoint,
    })
  }

  fn credentials(&self, profile: &str) -> Result<(OciProfile, RequestSigner), AppError> {
    let profile = load_profile(&self.oci_config_path, profile)?;
    let signer = RequestSigner::from_profile(&profile)?;
    Ok((profile, signer))
  }

  fn management_base(&self, profile: &OciProfile) -> Result<Url, AppError> {
    match &self.management_endpoint {
      Some(url) => Ok(url.clone()),
      None => parse_endpoint(&format!(
        "https://generativeai.{}.oci.oraclecloud.com",
        profile.region
      )),
    }
  }

  async fn send<T: DeserializeOwned>(
    &self,
    signer: &RequestSigner,
    method: Method,
    url: Url,
    body: Option<Vec<u8>>,
  ) -> Result<T, AppError> {
    let headers = signer.sign(&method, &url, body.as_deref())?;
    let mut request = self.http.request(method, url).headers(headers);
    if let Some(body) = body {
      request = request.body(body);
    }

    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      return Err(AppError::RemoteRejected {
        status: status.as_u16(),
        message: service_message(&text),
      });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| AppError::ResponseMalformed(err.to_string()))
  }
}

#[async_trait]
impl GenAiService for OciGenAiClient {
  async fn list_models(&self, profile: &str, compartment_id: &str) -> Result<Vec<ModelSummary>, AppError> {
    let (profile, signer) = self.credentials(profile)?;
    let mut url = join(&self.management_base(&profile)?, &format!("{API_VERSION}/models"))?;
    url.query_pairs_mut().append_pair("compartmentId", compartment_id);

    let collection: ModelCollection = self.send(&signer, Method::GET, url, None).await?;
    Ok(collection.items)
  }

  async fn chat(&self, profile: &str, details: &ChatDetails) -> Result<ChatResult, AppError> {
    let (_, signer) = self.credentials(profile)?;
    let url = join(&self.inference_endpoint, &format!("{API_VERSION}/actions/chat"))?;
    let body = serde_json::to_vec(details)
      .map_err(|err| AppError::InputMissing(format!("cannot encode chat request: {err}")))?;

    self.send(&signer, Method::POST, url, Some(body)).await
  }
}

fn parse_endpoint(raw: &str) -> Result<Url, AppError> {
  let mut url = Url::parse(raw)
    .map_err(|err| AppError::ConfigMissing(format!("invalid endpoint {raw}: {err}")))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url, AppError> {
  base
    .join(path)
    .map_err(|err| AppError::ConfigMissing(format!("invalid endpoint {base}: {err}")))
}

/// Error bodies are `{"code": ..., "message": ...}`; fall back to the raw text.
fn service_message(body: &str) -> String {
  serde_json::from_str::<serde_json::Value>(body)
    .ok()
    .and_then(|v| v["message"].as_str().map(str::to_string))
    .unwrap_or_else(|| body.trim().to_string())
}
