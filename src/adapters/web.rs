//! Web adapter - browser chat UI over HTTP.
//!
//! Routes:
//! - `GET /` - the chat page
//! - `POST /api/sessions` - start a session seeded with the greeting
//! - `GET /api/sessions/:id` - transcript and state
//! - `DELETE /api/sessions/:id` - end a session and drop its transcript
//! - `PUT /api/sessions/:id/credential` - set the session's API key
//! - `POST /api/sessions/:id/turns` - submit a message; progress and the
//!   final reply arrive as server-sent events

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use super::Channel;
use crate::agent::ChannelObserver;
use crate::auth::Credential;
use crate::config::{Config, UiConfig};
use crate::error::Error;
use crate::session::{SessionSnapshot, SessionState, SessionStore, TurnController};
use crate::Result;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shared state behind every route.
pub struct AppState {
    pub store: SessionStore,
    pub controller: TurnController,
    pub ui: UiConfig,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            SessionStore::new(&config.ui.greeting),
            TurnController::new(config),
            config.ui.clone(),
        )
    }

    pub fn with_parts(store: SessionStore, controller: TurnController, ui: UiConfig) -> Self {
        Self { store, controller, ui }
    }
}

/// JSON error body, also sent as the data of an SSE `error` event.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

/// Error response for API routes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    fn body(&self) -> ErrorBody {
        ErrorBody { error: self.message.clone(), status: self.status.as_u16() }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Session(_) => StatusCode::CONFLICT,
            Error::UnknownSession(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(end_session))
        .route("/api/sessions/:id/credential", put(set_credential))
        .route("/api/sessions/:id/turns", post(submit_turn))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state.ui))
}

fn render_index(ui: &UiConfig) -> String {
    INDEX_HTML
        .replace("{{title}}", &escape_html(&ui.title))
        .replace("{{placeholder}}", &escape_html(&ui.placeholder))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionSnapshot>) {
    let session = state.store.create().await;
    let snapshot = session.lock().await.snapshot();
    (StatusCode::CREATED, Json(snapshot))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(&id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<StatusCode, ApiError> {
    if state.store.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::UnknownSession(id).into())
    }
}

async fn set_credential(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CredentialRequest>,
) -> std::result::Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(&id).await?;
    let mut session = session.lock().await;
    session.set_credential(Credential::new(body.api_key));
    debug!("Session {} credential updated", id);
    Ok(Json(session.snapshot()))
}

async fn submit_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<TurnRequest>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, ApiError> {
    let session = state.store.get(&id).await?;

    if body.text.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Message cannot be empty"));
    }

    // Reject what can be known up front with a plain status code
    {
        let s = session.lock().await;
        s.credential().require()?;
        if s.state() == SessionState::Processing {
            return Err(Error::Session(
                "A message is already being processed for this session".to_string(),
            )
            .into());
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = state.controller.clone();
    let text = body.text;

    // The turn runs to completion even if the client goes away
    let task = tokio::spawn(async move {
        let observer = ChannelObserver::new(tx);
        controller.submit(&session, &text, &observer).await
    });

    let stream = async_stream::stream! {
        while let Some(ev) = rx.recv().await {
            match Event::default().event(ev.event_name()).json_data(&ev) {
                Ok(sse) => yield Ok(sse),
                Err(e) => error!("Failed to serialize SSE event {}: {}", ev.event_name(), e),
            }
        }

        let done = match task.await {
            Ok(Ok(reply)) => Event::default().event("reply").json_data(&reply),
            Ok(Err(e)) => Event::default().event("error").json_data(ApiError::from(e).body()),
            Err(e) => Event::default().event("error").json_data(
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Turn task failed: {}", e)).body(),
            ),
        };
        match done {
            Ok(sse) => yield Ok(sse),
            Err(e) => error!("Failed to serialize final SSE event: {}", e),
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

/// Web channel serving the chat UI until stopped.
pub struct WebChannel {
    addr: String,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
}

impl WebChannel {
    pub fn new(config: &Config) -> Self {
        Self {
            addr: config.server.addr(),
            state: Arc::new(AppState::new(config)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Channel for WebChannel {
    fn name(&self) -> &str {
        "web"
    }

    async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!("Web UI listening on http://{}", self.addr);

        let shutdown = self.shutdown.clone();
        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await?;

        info!("Web UI stopped");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shutdown.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use crate::agent::{Context, Reasoner, ReasonerFactory, Reply, TurnObserver};
    use crate::config::AgentConfig;
    use crate::tools::ToolRunner;

    struct ScriptedReasoner;

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        async fn reason(
            &self,
            _prompt: &str,
            _tools: &ToolRunner,
            _max_rounds: usize,
            observer: &dyn TurnObserver,
        ) -> Result<Reply> {
            observer.on_thought("I should look this up");
            observer.on_tool_call("wikipedia", "machine learning");
            observer.on_tool_result("wikipedia", "Page: Machine learning");
            observer.on_token("Machine learning is a field of AI.");
            Ok(Reply::answer("Machine learning is a field of AI.", 2))
        }
    }

    struct PanickingReasoner;

    #[async_trait]
    impl Reasoner for PanickingReasoner {
        async fn reason(
            &self,
            _prompt: &str,
            _tools: &ToolRunner,
            _max_rounds: usize,
            _observer: &dyn TurnObserver,
        ) -> Result<Reply> {
            panic!("reasoner crashed");
        }
    }

    #[derive(Clone, Copy)]
    enum Mode {
        Answer,
        Fail,
        Panic,
    }

    struct ScriptedFactory {
        mode: Mode,
    }

    impl ReasonerFactory for ScriptedFactory {
        fn create(&self, _credential: &Credential) -> Result<Box<dyn Reasoner>> {
            match self.mode {
                Mode::Answer => Ok(Box::new(ScriptedReasoner)),
                Mode::Fail => Err(Error::Llm("upstream unavailable".to_string())),
                Mode::Panic => Ok(Box::new(PanickingReasoner)),
            }
        }
    }

    async fn spawn_app(mode: Mode) -> String {
        spawn_app_with_state(mode).await.0
    }

    async fn spawn_app_with_state(mode: Mode) -> (String, Arc<AppState>) {
        let controller = TurnController::with_parts(
            Context::with_tools(ToolRunner::new(), AgentConfig::default()),
            Arc::new(ScriptedFactory { mode }),
        );
        let ui = UiConfig::default();
        let state = Arc::new(AppState::with_parts(
            SessionStore::new(&ui.greeting),
            controller,
            ui,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    async fn new_session(client: &reqwest::Client, base: &str) -> Value {
        let resp = client.post(format!("{}/api/sessions", base)).send().await.unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let base = spawn_app(Mode::Answer).await;
        let body = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert!(body.contains("<title>Chat with Search</title>"));
        assert!(body.contains("What is machine learning?"));
        assert!(!body.contains("{{title}}"));

        // The page ends its session on leave and never sends a key before it has one
        assert!(body.contains(r#"method: "DELETE", keepalive: true"#));
        assert!(body.contains("if (sessionId) await sendKey();"));
    }

    #[tokio::test]
    async fn test_new_session_has_greeting() {
        let base = spawn_app(Mode::Answer).await;
        let client = reqwest::Client::new();
        let session = new_session(&client, &base).await;

        let transcript = session["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0]["role"], "assistant");
        assert_eq!(
            transcript[0]["text"],
            "Hi, I am a chatbot who can search the web. How can I help you?"
        );
        assert_eq!(session["has_credential"], false);
        assert_eq!(session["state"], "idle");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let base = spawn_app(Mode::Answer).await;
        let resp = reqwest::get(format!("{}/api/sessions/nope", base)).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_turn_without_key_is_401() {
        let base = spawn_app(Mode::Answer).await;
        let client = reqwest::Client::new();
        let id = new_session(&client, &base).await["id"].as_str().unwrap().to_string();

        let resp = client
            .post(format!("{}/api/sessions/{}/turns", base, id))
            .json(&json!({"text": "What is machine learning?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        let session: Value = client
            .get(format!("{}/api/sessions/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["transcript"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_turn_streams_progress_then_reply() {
        let base = spawn_app(Mode::Answer).await;
        let client = reqwest::Client::new();
        let id = new_session(&client, &base).await["id"].as_str().unwrap().to_string();

        let resp = client
            .put(format!("{}/api/sessions/{}/credential", base, id))
            .json(&json!({"api_key": "  gsk_test  "}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let snapshot: Value = resp.json().await.unwrap();
        assert_eq!(snapshot["has_credential"], true);
        assert!(!snapshot.to_string().contains("gsk_test"));

        let body = client
            .post(format!("{}/api/sessions/{}/turns", base, id))
            .json(&json!({"text": "What is machine learning?"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        let thought = body.find("event: thought").unwrap();
        let tool_call = body.find("event: tool_call").unwrap();
        let tool_result = body.find("event: tool_result").unwrap();
        let reply = body.find("event: reply").unwrap();
        assert!(thought < tool_call && tool_call < tool_result && tool_result < reply);
        assert!(body.contains("\"finish\":\"answer\""));

        let session: Value = client
            .get(format!("{}/api/sessions/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let transcript = session["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1]["text"], "What is machine learning?");
        assert_eq!(transcript[2]["text"], "Machine learning is a field of AI.");
        assert_eq!(session["state"], "idle");
    }

    #[tokio::test]
    async fn test_failed_turn_sends_error_event() {
        let base = spawn_app(Mode::Fail).await;
        let client = reqwest::Client::new();
        let id = new_session(&client, &base).await["id"].as_str().unwrap().to_string();

        client
            .put(format!("{}/api/sessions/{}/credential", base, id))
            .json(&json!({"api_key": "gsk_test"}))
            .send()
            .await
            .unwrap();

        let body = client
            .post(format!("{}/api/sessions/{}/turns", base, id))
            .json(&json!({"text": "hello"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("event: error"));
        assert!(body.contains("upstream unavailable"));
        assert!(!body.contains("event: reply"));

        let session: Value = client
            .get(format!("{}/api/sessions/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["transcript"].as_array().unwrap().len(), 1);
    }

    async fn session_with_key(client: &reqwest::Client, base: &str) -> String {
        let id = new_session(client, base).await["id"].as_str().unwrap().to_string();
        client
            .put(format!("{}/api/sessions/{}/credential", base, id))
            .json(&json!({"api_key": "gsk_test"}))
            .send()
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_panicking_turn_leaves_session_usable() {
        let base = spawn_app(Mode::Panic).await;
        let client = reqwest::Client::new();
        let id = session_with_key(&client, &base).await;

        for _ in 0..2 {
            let resp = client
                .post(format!("{}/api/sessions/{}/turns", base, id))
                .json(&json!({"text": "hello"}))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
            let body = resp.text().await.unwrap();
            assert!(body.contains("event: error"));
            assert!(body.contains("reasoner crashed"));
        }

        let session: Value = client
            .get(format!("{}/api/sessions/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["state"], "idle");
        assert_eq!(session["transcript"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_ends_session() {
        let (base, state) = spawn_app_with_state(Mode::Answer).await;
        let client = reqwest::Client::new();
        let id = new_session(&client, &base).await["id"].as_str().unwrap().to_string();
        new_session(&client, &base).await;
        assert_eq!(state.store.len().await, 2);

        let resp = client.delete(format!("{}/api/sessions/{}", base, id)).send().await.unwrap();
        assert_eq!(resp.status(), 204);
        assert_eq!(state.store.len().await, 1);

        let resp = client.get(format!("{}/api/sessions/{}", base, id)).send().await.unwrap();
        assert_eq!(resp.status(), 404);

        let resp = client.delete(format!("{}/api/sessions/{}", base, id)).send().await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_blank_message_is_400() {
        let base = spawn_app(Mode::Answer).await;
        let client = reqwest::Client::new();
        let id = new_session(&client, &base).await["id"].as_str().unwrap().to_string();

        let resp = client
            .post(format!("{}/api/sessions/{}/turns", base, id))
            .json(&json!({"text": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::Auth("x".into()), 401),
            (Error::Session("x".into()), 409),
            (Error::UnknownSession("x".into()), 404),
            (Error::Llm("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status.as_u16(), status);
        }
    }

    #[test]
    fn test_render_index_escapes() {
        let ui = UiConfig { title: "<Search>".to_string(), ..UiConfig::default() };
        let html = render_index(&ui);
        assert!(html.contains("&lt;Search&gt;"));
    }
}
