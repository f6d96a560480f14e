//! Scout - chat with an assistant that can search the web
//!
//! This library provides the search tools, the reasoning agent, per-session
//! conversation state and the terminal and web front ends.

pub mod agent;
pub mod tools;
pub mod session;
pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
