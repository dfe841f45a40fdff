//! Gating of the page controls.
//!
//! Each step unlocks the next one: a profile, then a compartment, then a listed
//! and selected model, then an uploaded image, and only then a submission.
//! `transition` is pure so the rules can be checked without a server.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
  Idle,
  ProfileSelected,
  CompartmentEntered,
  ModelsListed,
  ModelSelected,
  ImageUploaded,
  Submitting,
  Succeeded,
  Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowEvent {
  ProfileChosen,
  CompartmentEntered,
  CompartmentCleared,
  ModelsListed { count: usize },
  ModelChosen,
  ImageUploaded,
  SubmitClicked,
  CallSucceeded,
  CallFailed,
}

/// Next state, or `None` when the event is not accepted in `state`.
pub fn transition(state: FlowState, event: FlowEvent) -> Option<FlowState> {
  use FlowEvent as E;
  use FlowState as S;

  match (state, event) {
    (S::Submitting, E::CallSucceeded) => Some(S::Succeeded),
    (S::Submitting, E::CallFailed) => Some(S::Failed),
    (S::Submitting, _) => None,

    (_, E::ProfileChosen) => Some(S::ProfileSelected),

    (S::Idle, E::CompartmentEntered | E::CompartmentCleared) => None,
    (_, E::CompartmentEntered) => Some(S::CompartmentEntered),
    (_, E::CompartmentCleared) => Some(S::ProfileSelected),

    (S::CompartmentEntered, E::ModelsListed { count: 0 }) => Some(S::CompartmentEntered),
    (S::CompartmentEntered, E::ModelsListed { .. }) => Some(S::ModelsListed),

    (S::ModelsListed | S::ModelSelected, E::ModelChosen) => Some(S::ModelSelected),
    (S::ImageUploaded | S::Succeeded | S::Failed, E::ModelChosen) => Some(S::ImageUploaded),

    (S::ModelSelected | S::ImageUploaded | S::Succeeded | S::Failed, E::ImageUploaded) => {
      Some(S::ImageUploaded)
    }

    (S::ImageUploaded | S::Succeeded | S::Failed, E::SubmitClicked) => Some(S::Submitting),

    _ => None,
  }
}
