use axum::http::StatusCode;

/// Every failure the app surfaces to the page falls into one of these kinds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
  /// The OCI config file, a profile, or its signing key could not be used.
  #[error("{0}")]
  ConfigMissing(String),

  /// The user has not supplied something the current step needs.
  #[error("{0}")]
  InputMissing(String),

  /// The service could not be reached or did not answer in time.
  #[error("{0}")]
  RemoteUnavailable(String),

  /// The service answered with a non-success status.
  #[error("HTTP {status}: {message}")]
  RemoteRejected { status: u16, message: String },

  /// The service answered successfully but the body had an unexpected shape.
  #[error("{0}")]
  ResponseMalformed(String),
}

impl AppError {
  pub fn code(&self) -> &'static str {
    match self {
      AppError::ConfigMissing(_) => "config_missing",
      AppError::InputMissing(_) => "input_missing",
      AppError::RemoteUnavailable(_) => "remote_unavailable",
      AppError::RemoteRejected { .. } => "remote_rejected",
      AppError::ResponseMalformed(_) => "response_malformed",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::ConfigMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::InputMissing(_) => StatusCode::BAD_REQUEST,
      AppError::RemoteUnavailable(_) => StatusCode::GATEWAY_TIMEOUT,
      AppError::RemoteRejected { .. } | AppError::ResponseMalformed(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return AppError::ResponseMalformed(err.to_string());
    }
    if let Some(status) = err.status() {
      return AppError::RemoteRejected {
        status: status.as_u16(),
        message: err.to_string(),
      };
    }
    AppError::RemoteUnavailable(err.to_string())
  }
}
