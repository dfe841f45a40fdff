//! HTTP Signatures for OCI API requests (`rsa-sha256`, signature version 1).

use base64::Engine;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST};
use reqwest::{Method, Url};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::profiles::OciProfile;

const X_CONTENT_SHA256: &str = "x-content-sha256";

pub struct RequestSigner {
  key_id: String,
  private_key: RsaPrivateKey,
}

impl std::fmt::Debug for RequestSigner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RequestSigner").field("key_id", &self.key_id).finish_non_exhaustive()
  }
}

impl RequestSigner {
  pub fn new(key_id: String, private_key: RsaPrivateKey) -> Self {
    Self { key_id, private_key }
  }

  pub fn from_profile(profile: &OciProfile) -> Result<Self, AppError> {
    if profile.pass_phrase.is_some() {
      return Err(AppError::ConfigMissing(format!(
        "profile {} uses a passphrase-protected key, which is not supported",
        profile.name
      )));
    }
    let pem = std::fs::read_to_string(&profile.key_file).map_err(|err| {
      AppError::ConfigMissing(format!("cannot read key_file {}: {err}", profile.key_file.display()))
    })?;
    let private_key = parse_private_key(&pem).map_err(|msg| {
      AppError::ConfigMissing(format!("invalid key_file {}: {msg}", profile.key_file.display()))
    })?;
    Ok(Self::new(profile.key_id(), private_key))
  }

  /// Headers to attach to the request, including `authorization`.
  pub fn sign(&self, method: &Method, url: &Url, body: Option<&[u8]>) -> Result<HeaderMap, AppError> {
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    self.sign_at(method, url, body, &date)
  }

  fn sign_at(
    &self,
    method: &Method,
    url: &Url,
    body: Option<&[u8]>,
    date: &str,
  ) -> Result<HeaderMap, AppError> {
    let host = host_header(url)?;
    let mut signed: Vec<(&str, String)> = vec![
      ("date", date.to_string()),
      ("(request-target)", request_target(method, url)),
      ("host", host.clone()),
    ];

    let mut headers = HeaderMap::new();
    headers.insert(DATE, header_value(date)?);
    headers.insert(HOST, header_value(&host)?);

    if *method == Method::POST || *method == Method::PUT {
      let body = body.unwrap_or_default();
      let digest = base64::engine::general_purpose::STANDARD.encode(Sha256::digest(body));
      signed.push(("content-length", body.len().to_string()));
      signed.push(("content-type", "application/json".to_string()));
      signed.push((X_CONTENT_SHA256, digest.clone()));

      headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
      headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
      headers.insert(HeaderName::from_static(X_CONTENT_SHA256), header_value(&digest)?);
    }

    let names = signed.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(" ");
    let signature = self.signature(&signing_string(&signed))?;
    let authorization = format!(
      "Signature version=\"1\",headers=\"{names}\",keyId=\"{}\",algorithm=\"rsa-sha256\",signature=\"{signature}\"",
      self.key_id
    );
    headers.insert(AUTHORIZATION, header_value(&authorization)?);
    Ok(headers)
  }

  fn signature(&self, signing_string: &str) -> Result<String, AppError> {
    let hashed = Sha256::digest(signing_string.as_bytes());
    let raw = self
      .private_key
      .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
      .map_err(|err| AppError::ConfigMissing(format!("signing failed: {err}")))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(raw))
  }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, String> {
  if pem.contains("ENCRYPTED") {
    return Err("encrypted keys are not supported".to_string());
  }
  RsaPrivateKey::from_pkcs8_pem(pem)
    .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
    .map_err(|err| err.to_string())
}

fn request_target(method: &Method, url: &Url) -> String {
  let mut target = format!("{} {}", method.as_str().to_lowercase(), url.path());
  if let Some(query) = url.query() {
    target.push('?');
    target.push_str(query);
  }
  target
}

fn host_header(url: &Url) -> Result<String, AppError> {
  let host = url
    .host_str()
    .ok_or_else(|| AppError::ConfigMissing(format!("endpoint {url} has no host")))?;
  Ok(match url.port() {
    Some(port) => format!("{host}:{port}"),
    None => host.to_string(),
  })
}

fn signing_string(signed: &[(&str, String)]) -> String {
  signed
    .iter()
    .map(|(name, value)| format!("{name}: {value}"))
    .collect::<Vec<_>>()
    .join("\n")
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
  HeaderValue::from_str(value)
    .map_err(|err| AppError::ConfigMissing(format!("invalid header value: {err}")))
}
