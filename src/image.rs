use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const FALLBACK_MIME: &str = "image/jpeg";
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// An uploaded image, held in memory until it is sent for extraction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EncodedImage {
  pub filename: String,
  pub mime: String,
  pub base64: String,
}

impl EncodedImage {
  pub fn data_url(&self) -> String {
    format!("data:{};base64,{}", self.mime, self.base64)
  }
}

pub fn guess_mime_type(filename: &str) -> &'static str {
  mime_guess::from_path(filename)
    .first_raw()
    .unwrap_or(FALLBACK_MIME)
}

pub fn is_supported_upload(filename: &str) -> bool {
  std::path::Path::new(filename)
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
    .unwrap_or(false)
}

pub fn encode_image(filename: &str, bytes: &[u8]) -> EncodedImage {
  EncodedImage {
    filename: filename.to_string(),
    mime: guess_mime_type(filename).to_string(),
    base64: base64::engine::general_purpose::STANDARD.encode(bytes),
  }
}

/// Validates an upload from the page and encodes it.
pub fn prepare_upload(filename: &str, bytes: &[u8]) -> Result<EncodedImage, AppError> {
  if !is_supported_upload(filename) {
    return Err(AppError::InputMissing(format!(
      "Unsupported file {filename}; upload a png, jpg or jpeg image"
    )));
  }
  if bytes.is_empty() {
    return Err(AppError::InputMissing("Image file is empty".to_string()));
  }
  Ok(encode_image(filename, bytes))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn guesses_mime_from_extension() {
    assert_eq!(guess_mime_type("scan.png"), "image/png");
    assert_eq!(guess_mime_type("photo.JPG"), "image/jpeg");
    assert_eq!(guess_mime_type("no_extension"), FALLBACK_MIME);
    assert_eq!(guess_mime_type("weird.zzqx"), FALLBACK_MIME);
  }

  #[test]
  fn encoded_payload_decodes_to_original_bytes() {
    let bytes: Vec<u8> = (0..=255).collect();
    let image = encode_image("page.png", &bytes);
    let decoded = base64::engine::general_purpose::STANDARD
      .decode(&image.base64)
      .unwrap();
    assert_eq!(decoded, bytes);
  }

  #[test]
  fn data_url_carries_mime_and_payload() {
    let image = encode_image("page.png", b"\x89PNG");
    assert_eq!(image.data_url(), "data:image/png;base64,iVBORw==");
  }

  #[test]
  fn uploads_are_limited_to_png_and_jpeg() {
    assert!(is_supported_upload("a.png"));
    assert!(is_supported_upload("a.JPEG"));
    assert!(is_supported_upload("dir/a.jpg"));
    assert!(!is_supported_upload("a.gif"));
    assert!(!is_supported_upload("png"));
  }

  #[test]
  fn prepare_upload_rejects_empty_and_unsupported_files() {
    assert!(matches!(
      prepare_upload("a.gif", b"GIF89a"),
      Err(AppError::InputMissing(_))
    ));
    assert!(matches!(prepare_upload("a.png", b""), Err(AppError::InputMissing(_))));
    assert_eq!(prepare_upload("a.jpg", b"x").unwrap().mime, "image/jpeg");
  }
}
