//! The page's operations, one per control, each answering with a fresh view.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::AppConfig;
use crate::discovery::discover_models;
use crate::error::AppError;
use crate::flow::{FlowEvent, FlowState};
use crate::genai::GenAiService;
use crate::image::prepare_upload;
use crate::inference::run_extraction;
use crate::models::{Notice, Outcome, SessionView};
use crate::profiles::list_profiles;
use crate::session::SessionStore;

pub const NO_MODELS: &str = "No models found in the specified compartment";
pub const SUBMIT_GATED: &str = "Select a vision model and upload an image first";
pub const STILL_RUNNING: &str = "A request is still running";

pub struct OcrApp {
  config: AppConfig,
  service: Arc<dyn GenAiService>,
  sessions: Arc<SessionStore>,
}

impl OcrApp {
  pub fn new(config: AppConfig, service: Arc<dyn GenAiService>) -> Self {
    let sessions = SessionStore::new(
      Duration::from_secs(config.session_idle_secs),
      config.max_sessions,
    );
    Self {
      config,
      service,
      sessions: Arc::new(sessions),
    }
  }

  pub fn profiles(&self) -> Vec<String> {
    list_profiles(&self.config.oci_config_path())
  }

  pub async fn session_count(&self) -> usize {
    self.sessions.len().await
  }

  pub async fn create_session(&self) -> Result<SessionView, AppError> {
    let (id, evicted) = self.sessions.create().await;
    let profiles = self.profiles();
    tracing::info!(session = %id, profiles = profiles.len(), evicted, "session created");

    match profiles.first() {
      Some(first) => self.select_profile(id, first).await,
      None => self.view(id, None).await,
    }
  }

  pub async fn view(&self, id: Uuid, notice: Option<Notice>) -> Result<SessionView, AppError> {
    let profiles = self.profiles();
    self
      .sessions
      .with(id, |s| Ok(s.view(id, profiles, notice)))
      .await
  }

  pub async fn select_profile(&self, id: Uuid, profile: &str) -> Result<SessionView, AppError> {
    let profiles = self.profiles();
    if !profiles.iter().any(|p| p == profile) {
      return Err(AppError::InputMissing(format!("Unknown profile {profile}")));
    }

    self
      .sessions
      .with(id, |s| {
        if !s.apply(FlowEvent::ProfileChosen) {
          return Err(AppError::InputMissing(STILL_RUNNING.to_string()));
        }
        s.profile = Some(profile.to_string());
        s.compartment_id = None;
        s.clear_models();
        tracing::info!(session = %id, profile, "profile selected");
        Ok(s.view(id, profiles, None))
      })
      .await
  }

  /// Stores the compartment and lists its models. Listing problems become a
  /// notice on the view rather than an error.
  pub async fn enter_compartment(&self, id: Uuid, compartment_id: &str) -> Result<SessionView, AppError> {
    let compartment_id = compartment_id.trim().to_string();
    let event = if compartment_id.is_empty() {
      FlowEvent::CompartmentCleared
    } else {
      FlowEvent::CompartmentEntered
    };

    let profile = self
      .sessions
      .with(id, |s| {
        let profile = s
          .profile
          .clone()
          .ok_or_else(|| AppError::InputMissing("Select an OCI config profile first".to_string()))?;
        if !s.apply(event) {
          return Err(AppError::InputMissing(STILL_RUNNING.to_string()));
        }
        s.compartment_id = (!compartment_id.is_empty()).then(|| compartment_id.clone());
        s.clear_models();
        Ok(profile)
      })
      .await?;

    let listed = discover_models(self.service.as_ref(), &profile, &compartment_id).await;

    let profiles = self.profiles();
    self
      .sessions
      .with(id, |s| {
        let current = s.state == FlowState::CompartmentEntered
          && s.profile.as_deref() == Some(profile.as_str())
          && s.compartment_id.as_deref() == Some(compartment_id.as_str());
        let notice = match listed {
          Err(AppError::InputMissing(message)) => Some(Notice::warning(message)),
          _ if !current => {
            tracing::debug!(session = %id, "discarding stale model listing");
            None
          }
          Ok(models) => {
            let count = models.len();
            s.models = models;
            s.apply(FlowEvent::ModelsListed { count });
            (count == 0).then(|| Notice::warning(NO_MODELS))
          }
          Err(err) => {
            tracing::warn!(session = %id, code = err.code(), "model listing failed: {err}");
            Some(Notice::error(format!("Error fetching models: {err}")))
          }
        };
        Ok(s.view(id, profiles, notice))
      })
      .await
  }

  pub async fn select_model(&self, id: Uuid, label: &str) -> Result<SessionView, AppError> {
    let profiles = self.profiles();
    self
      .sessions
      .with(id, |s| {
        if s.state == FlowState::Submitting {
          return Err(AppError::InputMissing(STILL_RUNNING.to_string()));
        }
        if !s.models.contains_key(label) {
          return Err(AppError::InputMissing(format!("Unknown model {label}")));
        }
        if !s.apply(FlowEvent::ModelChosen) {
          return Err(AppError::InputMissing("List the compartment's models first".to_string()));
        }
        s.selected_model = Some(label.to_string());
        s.outcome = None;
        tracing::info!(session = %id, model = label, "model selected");
        Ok(s.view(id, profiles, None))
      })
      .await
  }

  pub async fn upload_image(&self, id: Uuid, filename: &str, bytes: &[u8]) -> Result<SessionView, AppError> {
    let image = prepare_upload(filename, bytes)?;
    let profiles = self.profiles();
    self
      .sessions
      .with(id, |s| {
        if s.state == FlowState::Submitting {
          return Err(AppError::InputMissing(STILL_RUNNING.to_string()));
        }
        if !s.apply(FlowEvent::ImageUploaded) {
          return Err(AppError::InputMissing(
            "Select a vision model before uploading an image".to_string(),
          ));
        }
        tracing::info!(session = %id, filename, mime = %image.mime, bytes = bytes.len(), "image uploaded");
        s.image = Some(image);
        s.outcome = None;
        Ok(s.view(id, profiles, None))
      })
      .await
  }

  /// Sends the image once. A failed call is shown as the outcome; the user
  /// may submit again.
  pub async fn submit(&self, id: Uuid) -> Result<SessionView, AppError> {
    let (profile, compartment_id, model_id, image) = self
      .sessions
      .with(id, |s| {
        let ready = match (&s.profile, &s.compartment_id, s.model_id(), &s.image) {
          (Some(p), Some(c), Some(m), Some(i)) => Some((p.clone(), c.clone(), m.to_string(), i.clone())),
          _ => None,
        };
        if s.state == FlowState::Submitting {
          return Err(AppError::InputMissing(STILL_RUNNING.to_string()));
        }
        match ready {
          Some(ready) if s.apply(FlowEvent::SubmitClicked) => Ok(ready),
          _ => Err(AppError::InputMissing(SUBMIT_GATED.to_string())),
        }
      })
      .await?;

    // The call runs on its own task so the session leaves Submitting even when
    // the request that started it is dropped.
    let service = self.service.clone();
    let sessions = self.sessions.clone();
    let params = self.config.generation.clone();
    let call = tokio::spawn(async move {
      let result = run_extraction(
        service.as_ref(),
        &profile,
        &compartment_id,
        &model_id,
        &image,
        &params,
      )
      .await;
      let (event, outcome) = match result {
        Ok(text) => (FlowEvent::CallSucceeded, Outcome::Markdown { text }),
        Err(err) => (
          FlowEvent::CallFailed,
          Outcome::Error {
            message: format!("Error: {err}"),
          },
        ),
      };
      let stored = sessions
        .with(id, |s| {
          s.apply(event);
          s.outcome = Some(outcome);
          Ok(())
        })
        .await;
      if let Err(err) = &stored {
        tracing::debug!(session = %id, "dropping extraction result: {err}");
      }
      stored
    });

    match call.await {
      Ok(stored) => stored?,
      Err(err) => {
        tracing::error!(session = %id, "extraction task failed: {err}");
        self
          .sessions
          .with(id, |s| {
            if s.apply(FlowEvent::CallFailed) {
              s.outcome = Some(Outcome::Error {
                message: format!("Error: {err}"),
              });
            }
            Ok(())
          })
          .await?;
      }
    }
    self.view(id, None).await
  }
}
