//! Recording stand-in for the Generative AI service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use crate::error::AppError;
use crate::genai::GenAiService;
use crate::models::{ChatDetails, ChatResult, ModelSummary};

pub struct MockService {
  models: Vec<ModelSummary>,
  list_error: Option<AppError>,
  queued_listings: Mutex<VecDeque<Vec<ModelSummary>>>,
  held_listing: Option<(usize, Arc<Notify>)>,
  chat_gate: Option<Arc<Notify>>,
  chat_reply: Result<serde_json::Value, AppError>,
  listed: Mutex<Vec<String>>,
  chats: Mutex<Vec<(String, ChatDetails)>>,
}

impl Default for MockService {
  fn default() -> Self {
    Self {
      models: Vec::new(),
      list_error: None,
      queued_listings: Mutex::default(),
      held_listing: None,
      chat_gate: None,
      chat_reply: Ok(text_reply("# Extracted")),
      listed: Mutex::default(),
      chats: Mutex::default(),
    }
  }
}

pub fn text_reply(text: &str) -> serde_json::Value {
  json!({
    "modelId": "m1",
    "chatResponse": {
      "apiFormat": "GENERIC",
      "choices": [{ "index": 0, "message": { "role": "ASSISTANT", "content": [{ "type": "TEXT", "text": text }] } }]
    }
  })
}

impl MockService {
  pub fn with_models(mut self, models: Vec<ModelSummary>) -> Self {
    self.models = models;
    self
  }

  pub fn fail_listing(mut self, err: AppError) -> Self {
    self.list_error = Some(err);
    self
  }

  /// Replies to the next listing calls in order, then falls back to `models`.
  pub fn queue_listing(self, models: Vec<ModelSummary>) -> Self {
    self.queued_listings.lock().unwrap().push_back(models);
    self
  }

  /// Makes the `nth` listing call (counting from 1) wait for `gate`.
  pub fn hold_listing_call(mut self, nth: usize, gate: Arc<Notify>) -> Self {
    self.held_listing = Some((nth, gate));
    self
  }

  /// Makes every chat call wait for `gate`.
  pub fn hold_chat(mut self, gate: Arc<Notify>) -> Self {
    self.chat_gate = Some(gate);
    self
  }

  pub fn reply_with(mut self, body: serde_json::Value) -> Self {
    self.chat_reply = Ok(body);
    self
  }

  pub fn fail_chat(mut self, err: AppError) -> Self {
    self.chat_reply = Err(err);
    self
  }

  pub fn list_calls(&self) -> usize {
    self.listed.lock().unwrap().len()
  }

  pub fn listed_compartments(&self) -> Vec<String> {
    self.listed.lock().unwrap().clone()
  }

  pub fn chat_calls(&self) -> Vec<(String, ChatDetails)> {
    self.chats.lock().unwrap().clone()
  }
}

#[async_trait]
impl GenAiService for MockService {
  async fn list_models(&self, _profile: &str, compartment_id: &str) -> Result<Vec<ModelSummary>, AppError> {
    let call = {
      let mut listed = self.listed.lock().unwrap();
      listed.push(compartment_id.to_string());
      listed.len()
    };
    let reply = self.queued_listings.lock().unwrap().pop_front();
    if let Some((nth, gate)) = &self.held_listing {
      if *nth == call {
        gate.notified().await;
      }
    }
    match &self.list_error {
      Some(err) => Err(err.clone()),
      None => Ok(reply.unwrap_or_else(|| self.models.clone())),
    }
  }

  async fn chat(&self, profile: &str, details: &ChatDetails) -> Result<ChatResult, AppError> {
    self.chats.lock().unwrap().push((profile.to_string(), details.clone()));
    if let Some(gate) = &self.chat_gate {
      gate.notified().await;
    }
    let body = self.chat_reply.clone()?;
    serde_json::from_value(body).map_err(|err| AppError::ResponseMalformed(err.to_string()))
  }
}
