//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::Result;
use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider to use (see `ProviderRegistry::available`)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the provider's chat-completions base URL
    #[serde(default)]
    pub api_base: Option<String>,

    /// Stream tokens from the provider as they are generated
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Sampling temperature (provider default when unset)
    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

/// Which reasoning strategy drives a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonerKind {
    /// Text-based Thought/Action/Observation loop.
    #[default]
    React,
    /// Provider-native function calling.
    ToolCalling,
}

/// What to do when the model's output cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseErrorPolicy {
    /// Feed the parse error back to the model as an observation.
    #[default]
    Retry,
    /// End the turn with the model's raw text as the reply.
    Explain,
    /// Abort the turn with an error.
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub kind: ReasonerKind,

    /// Maximum reasoning/tool rounds per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default)]
    pub on_parse_error: ParseErrorPolicy,

    /// Repeat the newest user line after the transcript when flattening the prompt
    #[serde(default = "default_true")]
    pub repeat_user_line: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Results fetched by the Wikipedia and arXiv tools
    #[serde(default = "default_top_k")]
    pub top_k_results: usize,

    /// Hard cap on characters returned by any tool
    #[serde(default = "default_chars_max")]
    pub doc_content_chars_max: usize,

    /// Snippets collected by the web search tool
    #[serde(default = "default_search_results")]
    pub search_max_results: usize,

    #[serde(default = "default_wikipedia_lang")]
    pub wikipedia_lang: String,

    /// Base URL override for Wikipedia (defaults to `https://<lang>.wikipedia.org`)
    #[serde(default)]
    pub wikipedia_url: Option<String>,

    #[serde(default = "default_arxiv_url")]
    pub arxiv_url: String,

    #[serde(default = "default_duckduckgo_url")]
    pub duckduckgo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// First assistant turn of every session
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Shown in the empty input box
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_iterations() -> usize {
    3
}

fn default_top_k() -> usize {
    1
}

fn default_chars_max() -> usize {
    250
}

fn default_search_results() -> usize {
    5
}

fn default_wikipedia_lang() -> String {
    "en".to_string()
}

fn default_arxiv_url() -> String {
    "https://export.arxiv.org/api/query".to_string()
}

fn default_duckduckgo_url() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_title() -> String {
    "Chat with Search".to_string()
}

fn default_greeting() -> String {
    "Hi, I am a chatbot who can search the web. How can I help you?".to_string()
}

fn default_placeholder() -> String {
    "What is machine learning?".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_base: None,
            streaming: true,
            temperature: None,
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            server: ServerConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kind: ReasonerKind::default(),
            max_iterations: default_max_iterations(),
            on_parse_error: ParseErrorPolicy::default(),
            repeat_user_line: true,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            top_k_results: default_top_k(),
            doc_content_chars_max: default_chars_max(),
            search_max_results: default_search_results(),
            wikipedia_lang: default_wikipedia_lang(),
            wikipedia_url: None,
            arxiv_url: default_arxiv_url(),
            duckduckgo_url: default_duckduckgo_url(),
        }
    }
}

impl ToolsConfig {
    pub fn wikipedia_base(&self) -> String {
        self.wikipedia_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.wikipedia.org", self.wikipedia_lang))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            greeting: default_greeting(),
            placeholder: default_placeholder(),
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scout")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration, falling back to defaults when no file exists yet
pub fn load_or_default() -> Result<Config> {
    let path = config_path();
    if !path.exists() {
        tracing::debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config not found at {:?}. Run 'scout onboard' first.",
            path
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to the default path
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    // Create parent directory
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(Error::Config("agent.max_iterations must be at least 1".to_string()));
        }
        if self.tools.doc_content_chars_max == 0 {
            return Err(Error::Config("tools.doc_content_chars_max must be at least 1".to_string()));
        }
        if self.ui.greeting.trim().is_empty() {
            return Err(Error::Config("ui.greeting cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Interactive setup wizard
pub fn onboard() -> Result<()> {
    use crate::agent::ProviderRegistry;
    use crate::ui;
    use inquire::{Confirm, CustomType, Select, Text};

    ui::print_scout_header("Setup Wizard", "local");
    println!("  Let's get Scout configured. Your API key is never saved; you enter it when you chat.\n");

    let mut config = load_or_default()?;

    // 1. Provider + model
    let provider = Select::new("Choose your AI provider:", ProviderRegistry::available().to_vec())
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    config.provider = provider.to_string();

    config.model = Text::new("Model:")
        .with_default(&config.model)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    // 2. Reasoning strategy
    let kinds = vec!["ReAct (works with any chat model)", "Native tool calling"];
    let kind = Select::new("How should the agent use tools?", kinds)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    config.agent.kind = if kind.starts_with("ReAct") {
        ReasonerKind::React
    } else {
        ReasonerKind::ToolCalling
    };

    config.agent.max_iterations = CustomType::<usize>::new("Max reasoning rounds per message:")
        .with_default(config.agent.max_iterations)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    // 3. Web UI
    let change_port = Confirm::new(&format!("Serve the web UI on port {}?", config.server.port))
        .with_default(true)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    if !change_port {
        config.server.port = CustomType::<u16>::new("Port:")
            .prompt()
            .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    }

    config.validate()?;

    ui::print_thinking("Saving configuration");
    save(&config)?;

    println!();
    ui::print_success("Setup complete!");
    ui::print_step("Run 'scout serve' for the web UI or 'scout chat' in the terminal.");

    Ok(())
}
