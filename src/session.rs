use std::collections::HashMap;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;
use crate::flow::{transition, FlowEvent, FlowState};
use crate::image::EncodedImage;
use crate::models::{ModelOption, Notice, Outcome, SessionView};

/// Everything one page has picked so far. The uploaded image lives here rather
/// than on disk, so sessions never share it.
#[derive(Debug)]
pub struct Session {
  pub state: FlowState,
  pub profile: Option<String>,
  pub compartment_id: Option<String>,
  pub models: IndexMap<String, String>,
  pub selected_model: Option<String>,
  pub image: Option<EncodedImage>,
  pub outcome: Option<Outcome>,
}

impl Default for Session {
  fn default() -> Self {
    Self {
      state: FlowState::Idle,
      profile: None,
      compartment_id: None,
      models: IndexMap::new(),
      selected_model: None,
      image: None,
      outcome: None,
    }
  }
}

impl Session {
  /// Applies `event` if the current state accepts it.
  pub fn apply(&mut self, event: FlowEvent) -> bool {
    match transition(self.state, event) {
      Some(next) => {
        self.state = next;
        true
      }
      None => false,
    }
  }

  pub fn model_id(&self) -> Option<&str> {
    let label = self.selected_model.as_ref()?;
    self.models.get(label).map(String::as_str)
  }

  /// Drops everything chosen after the compartment.
  pub fn clear_models(&mut self) {
    self.models.clear();
    self.selected_model = None;
    self.image = None;
    self.outcome = None;
  }

  pub fn view(&self, id: Uuid, profiles: Vec<String>, notice: Option<Notice>) -> SessionView {
    SessionView {
      session_id: id.to_string(),
      state: self.state,
      profiles,
      profile: self.profile.clone(),
      compartment_id: self.compartment_id.clone(),
      models: self
        .models
        .iter()
        .map(|(label, id)| ModelOption {
          label: label.clone(),
          id: id.clone(),
        })
        .collect(),
      selected_model: self.selected_model.clone(),
      image: self.image.as_ref().map(|image| image.filename.clone()),
      outcome: self.outcome.clone(),
      notice,
    }
  }
}

struct Entry {
  session: Session,
  last_seen: Instant,
  touched: u64,
}

#[derive(Default)]
struct Entries {
  by_id: HashMap<Uuid, Entry>,
  clock: u64,
}

/// Sessions keyed by id. Sessions idle for longer than `idle_ttl` are dropped
/// when a new one is created, and the least recently used go first once
/// `max_sessions` is reached.
pub struct SessionStore {
  entries: Mutex<Entries>,
  idle_ttl: Duration,
  max_sessions: usize,
}

impl Default for SessionStore {
  fn default() -> Self {
    Self::new(Duration::from_secs(3600), 64)
  }
}

impl SessionStore {
  pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
    Self {
      entries: Mutex::default(),
      idle_ttl,
      max_sessions: max_sessions.max(1),
    }
  }

  /// Returns the new id and how many sessions were evicted to make room.
  pub async fn create(&self) -> (Uuid, usize) {
    let mut entries = self.entries.lock().await;
    let before = entries.by_id.len();
    let now = Instant::now();
    entries
      .by_id
      .retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_ttl);

    while entries.by_id.len() >= self.max_sessions {
      let oldest = entries
        .by_id
        .iter()
        .min_by_key(|(_, entry)| entry.touched)
        .map(|(id, _)| *id);
      match oldest {
        Some(id) => entries.by_id.remove(&id),
        None => break,
      };
    }
    let evicted = before - entries.by_id.len();

    let id = Uuid::new_v4();
    entries.clock += 1;
    let touched = entries.clock;
    entries.by_id.insert(
      id,
      Entry {
        session: Session::default(),
        last_seen: now,
        touched,
      },
    );
    (id, evicted)
  }

  /// Runs `f` against the session while holding the lock. Never await inside.
  pub async fn with<R>(
    &self,
    id: Uuid,
    f: impl FnOnce(&mut Session) -> Result<R, AppError>,
  ) -> Result<R, AppError> {
    let mut entries = self.entries.lock().await;
    entries.clock += 1;
    let touched = entries.clock;
    let entry = entries
      .by_id
      .get_mut(&id)
      .ok_or_else(|| AppError::InputMissing(format!("Unknown session {id}")))?;
    entry.last_seen = Instant::now();
    entry.touched = touched;
    f(&mut entry.session)
  }

  pub async fn len(&self) -> usize {
    self.entries.lock().await.by_id.len()
  }
}
