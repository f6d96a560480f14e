//! Turn controller: one user submission in, one assistant turn out.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::agent::{Context, DefaultReasonerFactory, ReasonerFactory, Reply, TurnObserver};
use crate::auth::Credential;
use crate::config::Config;
use crate::error::Error;
use crate::Result;

use super::{Session, Turn};

/// Runs turns against sessions.
///
/// The session lock is held only while reading or committing state, never
/// while the model is working. A failed turn commits nothing: the transcript
/// keeps its previous length and the session returns to `Idle`, also when the
/// reasoner panics.
#[derive(Clone)]
pub struct TurnController {
    context: Context,
    factory: Arc<dyn ReasonerFactory>,
}

impl TurnController {
    pub fn new(config: &Config) -> Self {
        Self::with_parts(Context::new(config), Arc::new(DefaultReasonerFactory::new(config)))
    }

    pub fn with_parts(context: Context, factory: Arc<dyn ReasonerFactory>) -> Self {
        Self { context, factory }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Process one user message for `session` and return the reply.
    ///
    /// The text is stored as typed; surrounding whitespace only matters for
    /// rejecting a blank message.
    pub async fn submit(
        &self,
        session: &Mutex<Session>,
        text: &str,
        observer: &dyn TurnObserver,
    ) -> Result<Reply> {
        if text.trim().is_empty() {
            return Err(Error::Session("Message cannot be empty".to_string()));
        }

        let user = Turn::user(text);

        let (prompt, credential, session_id) = {
            let mut s = session.lock().await;
            s.credential().require()?;
            s.begin_turn()?;

            let mut staged = s.transcript().turns().to_vec();
            staged.push(user.clone());
            let prompt = self.context.build_prompt(&staged, text);
            (prompt, s.credential().clone(), s.id().to_string())
        };

        info!("Session {} processing turn ({} chars)", session_id, text.len());

        // A panic must not leave the session stuck in `Processing`
        let outcome = match AssertUnwindSafe(self.reason(&credential, &prompt, observer))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(Error::Other(format!("Turn aborted: {}", panic_message(&*panic)))),
        };

        let mut s = session.lock().await;
        match outcome {
            Ok(reply) => {
                s.finish_turn(Some((user, Turn::assistant(reply.text.clone()))));
                info!(
                    "Session {} turn done: {} rounds, {:?}",
                    session_id, reply.rounds, reply.finish
                );
                Ok(reply)
            }
            Err(e) => {
                s.finish_turn(None);
                warn!("Session {} turn failed: {}", session_id, e);
                Err(e)
            }
        }
    }

    async fn reason(
        &self,
        credential: &Credential,
        prompt: &str,
        observer: &dyn TurnObserver,
    ) -> Result<Reply> {
        let reasoner = self.factory.create(credential)?;
        reasoner
            .reason(
                prompt,
                &self.context.tool_runner,
                self.context.agent.max_iterations,
                observer,
            )
            .await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("reasoner panicked")
}
