use std::time::Instant;

use crate::config::GenerationParams;
use crate::error::AppError;
use crate::genai::GenAiService;
use crate::image::EncodedImage;
use crate::models::{ChatContent, ChatDetails, ChatMessage, ChatResult, GenericChatRequest, ImageUrl, ServingMode};

pub const MARKDOWN_PROMPT: &str = "Convert the provided image into Markdown format. Ensure that all content from the page is included, \
such as headers, footers, subtexts, images (with alt text if possible), tables, and any other elements.\n\n\
Requirements:\n\
- Output Only Markdown: Return solely the Markdown content without any additional explanations or comments.\n\
- No Delimiters: Do not use code fences or delimiters like ```markdown.\n\
- Complete Content: Do not omit any part of the page, including headers, footers, and subtext.";

pub fn build_chat_details(
  compartment_id: &str,
  model_id: &str,
  image: &EncodedImage,
  params: &GenerationParams,
) -> ChatDetails {
  let message = ChatMessage {
    role: "USER".to_string(),
    content: vec![
      ChatContent::Text {
        text: MARKDOWN_PROMPT.to_string(),
      },
      ChatContent::Image {
        image_url: ImageUrl { url: image.data_url() },
      },
    ],
  };

  ChatDetails {
    compartment_id: compartment_id.to_string(),
    serving_mode: ServingMode::OnDemand {
      model_id: model_id.to_string(),
    },
    chat_request: GenericChatRequest {
      api_format: "GENERIC".to_string(),
      messages: vec![message],
      max_tokens: params.max_tokens,
      temperature: params.temperature,
      frequency_penalty: params.frequency_penalty,
      presence_penalty: params.presence_penalty,
      top_p: params.top_p,
    },
  }
}

/// Text of the first content item of the first choice.
pub fn extract_markdown(result: &ChatResult) -> Result<String, AppError> {
  let choice = result
    .chat_response
    .choices
    .first()
    .ok_or_else(|| AppError::ResponseMalformed("response contained no choices".to_string()))?;
  match choice.message.content.first() {
    Some(ChatContent::Text { text }) => Ok(text.clone()),
    Some(ChatContent::Image { .. }) => Err(AppError::ResponseMalformed(
      "first content item is not text".to_string(),
    )),
    None => Err(AppError::ResponseMalformed(
      "first choice has no content".to_string(),
    )),
  }
}

/// One chat call, no retry.
pub async fn run_extraction(
  service: &dyn GenAiService,
  profile: &str,
  compartment_id: &str,
  model_id: &str,
  image: &EncodedImage,
  params: &GenerationParams,
) -> Result<String, AppError> {
  let details = build_chat_details(compartment_id, model_id, image, params);
  let started = Instant::now();
  tracing::info!(model_id, image = %image.filename, "analyzing image");

  let result = service
    .chat(profile, &details)
    .await
    .and_then(|result| extract_markdown(&result));
  let elapsed_ms = started.elapsed().as_millis() as u64;
  match &result {
    Ok(text) => tracing::info!(model_id, elapsed_ms, chars = text.len(), "extraction complete"),
    Err(err) => tracing::warn!(model_id, elapsed_ms, code = err.code(), "extraction failed: {err}"),
  }
  result
}
