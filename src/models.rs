use serde::{Deserialize, Serialize};

use crate::flow::FlowState;

// Generative AI management API

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
  pub id: String,
  pub display_name: String,
  pub vendor: String,
  #[serde(default)]
  pub capabilities: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lifecycle_state: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ModelCollection {
  #[serde(default)]
  pub items: Vec<ModelSummary>,
}

// Generative AI inference API

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetails {
  pub compartment_id: String,
  pub serving_mode: ServingMode,
  pub chat_request: GenericChatRequest,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "servingType")]
pub enum ServingMode {
  #[serde(rename = "ON_DEMAND", rename_all = "camelCase")]
  OnDemand { model_id: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenericChatRequest {
  pub api_format: String,
  pub messages: Vec<ChatMessage>,
  pub max_tokens: u32,
  pub temperature: f64,
  pub frequency_penalty: f64,
  pub presence_penalty: f64,
  pub top_p: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
  pub role: String,
  #[serde(default)]
  pub content: Vec<ChatContent>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ChatContent {
  Text {
    text: String,
  },
  Image {
    #[serde(rename = "imageUrl")]
    image_url: ImageUrl,
  },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageUrl {
  pub url: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatResult {
  #[serde(default)]
  pub model_id: Option<String>,
  #[serde(default)]
  pub model_version: Option<String>,
  pub chat_response: ChatResponse,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
  #[serde(default)]
  pub api_format: Option<String>,
  #[serde(default)]
  pub choices: Vec<ChatChoice>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatChoice {
  #[serde(default)]
  pub index: Option<u32>,
  pub message: ChatMessage,
  #[serde(default)]
  pub finish_reason: Option<String>,
}

// Page API

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelOption {
  pub label: String,
  pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
  Warning,
  Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Warning,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Error,
      message: message.into(),
    }
  }
}

/// What the output area shows after a submission.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
  Markdown { text: String },
  Error { message: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionView {
  pub session_id: String,
  pub state: FlowState,
  pub profiles: Vec<String>,
  pub profile: Option<String>,
  pub compartment_id: Option<String>,
  pub models: Vec<ModelOption>,
  pub selected_model: Option<String>,
  pub image: Option<String>,
  pub outcome: Option<Outcome>,
  pub notice: Option<Notice>,
}

#[derive(Serialize, Deserialize)]
pub struct ProfilesResponse {
  pub profiles: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SelectProfileRequest {
  pub profile: String,
}

#[derive(Serialize, Deserialize)]
pub struct CompartmentRequest {
  #[serde(default)]
  pub compartment_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct SelectModelRequest {
  pub label: String,
}
