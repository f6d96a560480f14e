//! CLI adapter - terminal chat, interactive or single-message.
//!
//! Renders the transcript, asks for the API key with a masked prompt and
//! shows agent progress as a nested trail under a spinner.

use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, PasswordDisplayMode};
use tokio::sync::Mutex;

use super::Channel;
use crate::agent::{Reply, TurnEvent, TurnObserver};
use crate::auth::Credential;
use crate::config::Config;
use crate::error::Error;
use crate::session::{Session, TurnController, TurnRole};
use crate::ui;
use crate::Result;

/// Longest tool output shown in the trail
const TRAIL_PREVIEW_CHARS: usize = 120;

/// Prints agent progress above a spinner.
struct TrailObserver {
    spinner: ProgressBar,
}

impl TurnObserver for TrailObserver {
    fn on_event(&self, event: TurnEvent) {
        match event {
            TurnEvent::Thought { text } => {
                self.spinner.suspend(|| ui::print_trail("thought", &text));
            }
            TurnEvent::ToolCall { tool, input } => {
                self.spinner.suspend(|| ui::print_trail(&format!("→ {}", tool), &input));
                self.spinner.set_message(format!("Searching {}", tool));
            }
            TurnEvent::ToolResult { tool, output } => {
                let preview = crate::tools::truncate_chars(&output, TRAIL_PREVIEW_CHARS);
                self.spinner.suspend(|| ui::print_trail(&format!("← {}", tool), &preview));
                self.spinner.set_message("Thinking");
            }
            TurnEvent::Token { .. } => {
                self.spinner.set_message("Writing");
            }
        }
    }
}

/// CLI channel for terminal chat sessions.
pub struct CliChannel {
    controller: TurnController,
    session: Mutex<Session>,
    model: String,
    provider: String,
}

impl CliChannel {
    /// Create a new CLI channel with a fresh session.
    pub fn new(config: &Config) -> Self {
        Self {
            controller: TurnController::new(config),
            session: Mutex::new(Session::new(&config.ui.greeting)),
            model: config.model.clone(),
            provider: config.provider.clone(),
        }
    }

    /// Run a single message and return the reply.
    pub async fn run_once(&self, message: &str) -> Result<Reply> {
        self.ensure_credential().await?;
        self.submit(message).await
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&self) -> Result<()> {
        ui::print_scout_header(&self.model, &self.provider);
        self.render_transcript().await;

        self.ensure_credential().await?;
        println!(
            "{}",
            "  Type a message, /key to change your API key, or exit to quit.".dimmed()
        );

        loop {
            print!("\n{}: ", "You".blue().bold());
            io::stdout().flush()?;

            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
                println!("👋 Bye!");
                break;
            }

            if input == "/key" {
                let credential = prompt_credential()?;
                self.session.lock().await.set_credential(credential);
                ui::print_success("API key updated");
                continue;
            }

            match self.submit(input).await {
                Ok(reply) => ui::print_turn(TurnRole::Assistant, &reply.text),
                Err(Error::Auth(e)) => {
                    ui::print_error(&e);
                    ui::print_step("Use /key to enter a different API key.");
                }
                Err(e) => ui::print_error(&e.to_string()),
            }
        }

        Ok(())
    }

    async fn submit(&self, message: &str) -> Result<Reply> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("  {spinner:.magenta} {msg}...")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Thinking");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let observer = TrailObserver { spinner: spinner.clone() };
        let result = self.controller.submit(&self.session, message, &observer).await;

        spinner.finish_and_clear();
        result
    }

    async fn render_transcript(&self) {
        let session = self.session.lock().await;
        for turn in session.transcript() {
            ui::print_turn(turn.role(), turn.text());
        }
    }

    async fn ensure_credential(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        while session.credential().is_empty() {
            session.set_credential(prompt_credential()?);
        }
        Ok(())
    }

    #[cfg(test)]
    async fn transcript_len(&self) -> usize {
        self.session.lock().await.transcript().len()
    }

    #[cfg(test)]
    async fn is_busy(&self) -> bool {
        self.session.lock().await.state() == crate::session::SessionState::Processing
    }
}

impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<()> {
        self.run_interactive().await
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

fn prompt_credential() -> Result<Credential> {
    let key = Password::new("Groq API Key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Used for this session only, never saved")
        .prompt()
        .map_err(|e| Error::Auth(format!("Prompt failed: {}", e)))?;
    Ok(Credential::new(key))
}
