//! Session and turn-driver tests against an in-process mock of the agent
//! service.
//!
//! The mock is a small axum app on an ephemeral port that replays a
//! scripted sequence of run states and records every call it receives, so
//! tests can assert both outcomes and call ordering.

use super::*;
use crate::agents::wire::RunStatus;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn test_settings() -> Settings {
    Settings::from_lookup(|key| {
        Some(
            match key {
                "PROJECT_ENDPOINT" => "https://proj.example.com",
                "MODEL_DEPLOYMENT_NAME" => "gpt-4o",
                "MCP_SERVER_URL" => "https://mcp.example.com/sse",
                "MCP_SERVER_LABEL" => "home_assistant",
                "MCP_SERVER_TOKEN" => "mcp-secret",
                _ => return None,
            }
            .to_string(),
        )
    })
    .unwrap()
}

fn unconnected_session() -> AgentSession {
    let client = AgentsClient::with_token("https://proj.example.com", "tok").unwrap();
    AgentSession::new(client, &test_settings())
}

#[test]
fn new_session_has_no_handles() {
    let session = unconnected_session();
    assert!(session.agent_id().is_none());
    assert!(session.thread_id().is_none());
}

#[test]
fn second_begin_turn_is_rejected_until_guard_drops() {
    let session = unconnected_session();
    let guard = session.begin_turn().unwrap();
    assert!(matches!(session.begin_turn(), Err(TurnError::Busy)));
    drop(guard);
    assert!(session.begin_turn().is_ok());
}

#[tokio::test]
async fn turn_without_handles_is_not_connected() {
    let session = unconnected_session();
    let err = session.turn("hello").await.unwrap_err();
    assert!(matches!(err, TurnError::NotConnected));
}

// --- Mock agent service ---

/// Call log and scripted behavior of the mock service.
#[derive(Default)]
struct MockState {
    /// Every call the mock received, in order ("create_agent", "submit", …).
    events: Vec<String>,
    /// Status the run created by `create_run` starts in.
    initial_run_status: String,
    /// Successive `get_run` response bodies; the last one repeats once the
    /// script is exhausted.
    run_script: VecDeque<Value>,
    /// Tool-call ids approved per submission, one entry per submission.
    approvals: Vec<Vec<String>>,
    /// Messages returned by `list_messages` (newest first).
    messages: Vec<Value>,
}

impl MockState {
    fn new() -> Self {
        Self {
            initial_run_status: "queued".to_string(),
            ..Self::default()
        }
    }

    fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

type Shared = Arc<Mutex<MockState>>;

fn run_body(status: &str) -> Value {
    json!({"id": "run_1", "status": status})
}

fn requires_approval_body(tool_call_ids: &[&str]) -> Value {
    json!({
        "id": "run_1",
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_approval",
            "submit_tool_approval": {
                "tool_calls": tool_call_ids
                    .iter()
                    .map(|id| json!({"id": id, "type": "mcp", "name": "get_temperature"}))
                    .collect::<Vec<_>>()
            }
        }
    })
}

fn assistant_message(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "role": "assistant",
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    })
}

fn user_message(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "role": "user",
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    })
}

fn mock_router(state: Shared) -> Router {
    async fn create_agent(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        let mut s = state.lock().unwrap();
        s.events.push("create_agent".into());
        Json(json!({
            "id": "asst_1",
            "name": body["name"].clone(),
            "model": body["model"].clone()
        }))
    }

    async fn create_thread(State(state): State<Shared>) -> Json<Value> {
        state.lock().unwrap().events.push("create_thread".into());
        Json(json!({"id": "thread_1"}))
    }

    async fn create_message(
        State(state): State<Shared>,
        Path(_thread_id): Path<String>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let mut s = state.lock().unwrap();
        s.events.push("create_message".into());
        Json(json!({
            "id": "msg_user_1",
            "role": body["role"].clone(),
            "content": [{"type": "text", "text": {"value": body["content"].clone()}}]
        }))
    }

    async fn list_messages(
        State(state): State<Shared>,
        Path(_thread_id): Path<String>,
    ) -> Json<Value> {
        let mut s = state.lock().unwrap();
        s.events.push("list_messages".into());
        Json(json!({"data": s.messages.clone()}))
    }

    async fn create_run(
        State(state): State<Shared>,
        Path(_thread_id): Path<String>,
    ) -> Json<Value> {
        let mut s = state.lock().unwrap();
        s.events.push("create_run".into());
        let status = s.initial_run_status.clone();
        Json(run_body(&status))
    }

    async fn get_run(
        State(state): State<Shared>,
        Path((_thread_id, _run_id)): Path<(String, String)>,
    ) -> Json<Value> {
        let mut s = state.lock().unwrap();
        s.events.push("get_run".into());
        let body = match s.run_script.len() {
            0 => run_body("in_progress"),
            1 => s.run_script.front().unwrap().clone(),
            _ => s.run_script.pop_front().unwrap(),
        };
        Json(body)
    }

    async fn submit(
        State(state): State<Shared>,
        Path((_thread_id, _run_id)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let mut s = state.lock().unwrap();
        s.events.push("submit".into());
        let ids = body["tool_approvals"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| {
                assert_eq!(a["approve"], true);
                a["tool_call_id"].as_str().unwrap().to_string()
            })
            .collect();
        s.approvals.push(ids);
        Json(run_body("in_progress"))
    }

    async fn cancel(
        State(state): State<Shared>,
        Path((_thread_id, _run_id)): Path<(String, String)>,
    ) -> Json<Value> {
        state.lock().unwrap().events.push("cancel".into());
        Json(run_body("cancelled"))
    }

    async fn steps(
        State(state): State<Shared>,
        Path((_thread_id, _run_id)): Path<(String, String)>,
    ) -> Json<Value> {
        state.lock().unwrap().events.push("steps".into());
        Json(json!({"data": [{
            "id": "step_1",
            "status": "completed",
            "step_details": {"type": "tool_calls", "tool_calls": [{"id": "call_1", "type": "mcp"}]}
        }]}))
    }

    Router::new()
        .route("/assistants", post(create_agent))
        .route("/threads", post(create_thread))
        .route(
            "/threads/{thread_id}/messages",
            post(create_message).get(list_messages),
        )
        .route("/threads/{thread_id}/runs", post(create_run))
        .route("/threads/{thread_id}/runs/{run_id}", get(get_run))
        .route(
            "/threads/{thread_id}/runs/{run_id}/submit_tool_outputs",
            post(submit),
        )
        .route("/threads/{thread_id}/runs/{run_id}/cancel", post(cancel))
        .route("/threads/{thread_id}/runs/{run_id}/steps", get(steps))
        .with_state(state)
}

/// Serves the mock on an ephemeral port and returns its base URL.
async fn spawn_mock(state: Shared) -> String {
    let app = mock_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Connects a session against the mock with fast polling.
async fn connect_mock_session(state: &Shared) -> AgentSession {
    let endpoint = spawn_mock(state.clone()).await;
    let client = AgentsClient::with_token(&endpoint, "test-token").unwrap();
    AgentSession::connect(client, &test_settings())
        .await
        .unwrap()
        .with_polling(Duration::from_millis(2), Duration::from_millis(500))
}

// --- Flow tests ---

#[tokio::test]
async fn connect_creates_agent_and_thread_once() {
    let state = Arc::new(Mutex::new(MockState::new()));
    let mut session = connect_mock_session(&state).await;
    assert_eq!(session.agent_id(), Some("asst_1"));
    assert_eq!(session.thread_id(), Some("thread_1"));

    // ensure_* again must reuse the stored handles, not re-create.
    session.ensure_agent().await.unwrap();
    session.ensure_thread().await.unwrap();

    let s = state.lock().unwrap();
    assert_eq!(s.count("create_agent"), 1);
    assert_eq!(s.count("create_thread"), 1);
}

#[tokio::test]
async fn immediate_completion_returns_the_reply() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.initial_run_status = "completed".to_string();
        s.messages = vec![
            assistant_message("msg_a1", "Hi there"),
            user_message("msg_user_1", "Hello"),
        ];
    }
    let session = connect_mock_session(&state).await;

    let reply = session.turn("Hello").await.unwrap();
    assert_eq!(reply.run_id, "run_1");
    assert_eq!(reply.text(), "Hi there");

    // Completed on creation: no polling was needed.
    let s = state.lock().unwrap();
    assert_eq!(s.count("get_run"), 0);
    assert_eq!(s.count("list_messages"), 1);
}

#[tokio::test]
async fn requires_action_approves_all_pending_calls_before_fetch() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.run_script = VecDeque::from([
            requires_approval_body(&["call_1", "call_2"]),
            run_body("completed"),
        ]);
        s.messages = vec![
            assistant_message("msg_a1", "Both done"),
            user_message("msg_user_1", "Do two things"),
        ];
    }
    let session = connect_mock_session(&state).await;

    let reply = session.turn("Do two things").await.unwrap();
    assert_eq!(reply.text(), "Both done");

    let s = state.lock().unwrap();
    assert_eq!(s.approvals, vec![vec!["call_1".to_string(), "call_2".to_string()]]);
    // The approval happened strictly before the message fetch.
    let submit_pos = s.events.iter().position(|e| e == "submit").unwrap();
    let fetch_pos = s.events.iter().position(|e| e == "list_messages").unwrap();
    assert!(submit_pos < fetch_pos);
}

#[tokio::test]
async fn each_requires_action_occurrence_gets_its_own_submission() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.run_script = VecDeque::from([
            requires_approval_body(&["call_1"]),
            requires_approval_body(&["call_2"]),
            run_body("completed"),
        ]);
        s.messages = vec![
            assistant_message("msg_a1", "done"),
            user_message("msg_user_1", "hi"),
        ];
    }
    let session = connect_mock_session(&state).await;

    session.turn("hi").await.unwrap();

    let s = state.lock().unwrap();
    assert_eq!(
        s.approvals,
        vec![vec!["call_1".to_string()], vec!["call_2".to_string()]]
    );
}

#[tokio::test]
async fn failed_run_is_an_error_and_fetches_nothing() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.run_script = VecDeque::from([json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "model exploded"}
        })]);
    }
    let session = connect_mock_session(&state).await;

    let err = session.turn("hi").await.unwrap_err();
    match err {
        TurnError::RunFailed { status, error, .. } => {
            assert_eq!(status, RunStatus::Failed);
            assert_eq!(error.unwrap().message, "model exploded");
        }
        other => panic!("expected RunFailed, got {other}"),
    }

    let s = state.lock().unwrap();
    assert_eq!(s.count("list_messages"), 0);

    // The session survives a failed turn.
    drop(s);
    assert!(session.begin_turn().is_ok());
}

#[tokio::test]
async fn stalled_run_times_out_distinctly() {
    let state = Arc::new(Mutex::new(MockState::new()));
    // Empty script: get_run keeps answering in_progress.
    let session = connect_mock_session(&state)
        .await
        .with_polling(Duration::from_millis(2), Duration::from_millis(30));

    let err = session.turn("hi").await.unwrap_err();
    assert!(matches!(err, TurnError::Timeout { .. }));
}

#[tokio::test]
async fn empty_approval_batch_cancels_the_run() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.run_script = VecDeque::from([requires_approval_body(&[])]);
    }
    let session = connect_mock_session(&state).await;

    let err = session.turn("hi").await.unwrap_err();
    assert!(matches!(err, TurnError::EmptyApproval { .. }));
    assert_eq!(state.lock().unwrap().count("cancel"), 1);
}

#[tokio::test]
async fn concurrent_turn_on_same_session_is_rejected() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.initial_run_status = "completed".to_string();
        s.messages = vec![
            assistant_message("msg_a1", "first"),
            user_message("msg_user_1", "hi"),
        ];
    }
    let session = connect_mock_session(&state).await;

    let (first, second) = futures::join!(session.turn("hi"), session.turn("again"));
    let outcomes = [first, second];
    assert_eq!(
        outcomes.iter().filter(|r| r.is_ok()).count(),
        1,
        "exactly one turn may win"
    );
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(TurnError::Busy))));

    // Only the winning turn reached the service.
    assert_eq!(state.lock().unwrap().count("create_message"), 1);
}

#[tokio::test]
async fn run_steps_and_transcript_are_exposed() {
    let state = Arc::new(Mutex::new(MockState::new()));
    {
        let mut s = state.lock().unwrap();
        s.initial_run_status = "completed".to_string();
        s.messages = vec![
            assistant_message("msg_a1", "21.5"),
            user_message("msg_user_1", "temp?"),
        ];
    }
    let session = connect_mock_session(&state).await;

    let reply = session.turn("temp?").await.unwrap();
    let steps = session.run_steps(&reply.run_id).await.unwrap();
    assert_eq!(steps.data.len(), 1);
    assert_eq!(steps.data[0].step_details.as_ref().unwrap().tool_calls[0].kind, "mcp");

    let transcript = session.transcript().await.unwrap();
    assert_eq!(transcript.data.len(), 2);
}

#[tokio::test]
async fn approvals_carry_the_mcp_headers() {
    // Covered end-to-end: the submit handler asserts approve == true for
    // every approval; header content is asserted here via the session's
    // tool declaration.
    let session = unconnected_session();
    assert_eq!(
        session.mcp().headers().get("Authorization").unwrap(),
        "Bearer mcp-secret"
    );
}
