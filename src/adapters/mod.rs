//! Adapters module - the surfaces a user chats through.
//!
//! Each adapter implements the [`Channel`] trait and drives the same
//! [`TurnController`](crate::session::TurnController).
//!
//! # Supported Channels
//!
//! - **CLI** - Terminal chat with a masked API-key prompt
//! - **Web** - Browser UI over HTTP with server-sent progress events
//!
//! # Adding a New Channel
//!
//! 1. Create a new file (e.g., `slack.rs`)
//! 2. Implement the [`Channel`] trait
//! 3. Add to [`ChannelRegistry`]

pub mod cli;
pub mod web;

/// Channel trait for chat adapters.
///
/// All channel implementations must be [`Send`] + [`Sync`] for async compatibility.
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "web", "cli").
    fn name(&self) -> &str;

    /// Run until the user leaves or the channel is stopped.
    fn start(&self) -> impl std::future::Future<Output = crate::Result<()>> + Send;

    /// Stop the channel.
    fn stop(&self) -> impl std::future::Future<Output = crate::Result<()>> + Send;
}

/// Channel registry - metadata about available channels.
pub struct ChannelRegistry;

impl ChannelRegistry {
    /// List all available channel names.
    pub fn available() -> &'static [&'static str] {
        &["web", "cli"]
    }

    /// Get a human-readable description of a channel.
    pub fn description(name: &str) -> &'static str {
        match name {
            "web" => "Browser chat UI (scout serve)",
            "cli" => "Terminal chat (scout chat)",
            _ => "Unknown channel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_descriptions() {
        for name in ChannelRegistry::available() {
            assert_ne!(ChannelRegistry::description(name), "Unknown channel");
        }
        assert_eq!(ChannelRegistry::description("telegram"), "Unknown channel");
    }
}
