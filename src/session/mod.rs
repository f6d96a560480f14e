//! Conversation state for one browser or terminal session.
//!
//! A [`Session`] owns its [`Transcript`], the user's credential and a small
//! state machine (`Idle -> Processing -> Idle`). Sessions live in memory only.

mod controller;
mod store;

pub use controller::TurnController;
pub use store::SessionStore;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::Credential;
use crate::error::Error;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Label used when flattening the transcript into a prompt
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// One message of the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    role: TurnRole,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: TurnRole::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: TurnRole::Assistant, text: text.into() }
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered history of turns. Starts with a greeting and only ever grows.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn seeded(greeting: impl Into<String>) -> Self {
        Self { turns: vec![Turn::assistant(greeting)] }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true for a seeded transcript; here for API completeness.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Append one user turn and its reply together.
    fn commit_exchange(&mut self, user: Turn, reply: Turn) {
        self.turns.push(user);
        self.turns.push(reply);
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Waiting for input
    Idle,
    /// A turn is running
    Processing,
}

/// Per-session state, passed explicitly to the turn controller and renderers.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    transcript: Transcript,
    credential: Credential,
    state: SessionState,
}

impl Session {
    pub fn new(greeting: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            transcript: Transcript::seeded(greeting),
            credential: Credential::default(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
    }

    /// `Idle -> Processing`. Only one turn runs at a time.
    fn begin_turn(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Processing;
                Ok(())
            }
            SessionState::Processing => Err(Error::Session(
                "A message is already being processed for this session".to_string(),
            )),
        }
    }

    /// `Processing -> Idle`, committing the exchange if the turn produced a reply.
    fn finish_turn(&mut self, exchange: Option<(Turn, Turn)>) {
        if let Some((user, reply)) = exchange {
            self.transcript.commit_exchange(user, reply);
        }
        self.state = SessionState::Idle;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            state: self.state,
            has_credential: !self.credential.is_empty(),
            transcript: self.transcript.turns.clone(),
        }
    }
}

/// Serializable view of a session for the web UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
    pub has_credential: bool,
    pub transcript: Vec<Turn>,
}
