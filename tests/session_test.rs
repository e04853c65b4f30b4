//! End-to-end tests driving `Agent`/`Session` against `MockProvider`.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use turnframe::agent::{CreateSessionOptions, ResumeOptions};
use turnframe::error::{AgentError, ToolExecError};
use turnframe::provider::mock::{MockProvider, MockResponse, MockToolCall};
use turnframe::store::InMemoryStore;
use turnframe::tool::{Tool, ToolContext};
use turnframe::{Agent, SendMode, SendOptions, SessionEvent, SessionEventKind, ToolCallDecision};

/// Echoes its `value` argument back as the tool result. Used in place of a
/// real shell/filesystem tool to keep these tests deterministic.
struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes the value argument"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"value": {"type": "string"}}})
    }
    async fn execute(&self, input: serde_json::Value, _ctx: ToolContext) -> Result<String, ToolExecError> {
        Ok(input["value"].as_str().unwrap_or("").to_string())
    }
}

/// Sleeps for `millis` then returns a fixed string. Used to verify that
/// pending tool calls execute concurrently, not sequentially.
struct SlowTool {
    millis: u64,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Sleeps, then returns"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _input: serde_json::Value, _ctx: ToolContext) -> Result<String, ToolExecError> {
        tokio::time::sleep(Duration::from_millis(self.millis)).await;
        Ok("done".into())
    }
}

fn collect_events(session: &Arc<turnframe::Session>) -> Arc<Mutex<Vec<SessionEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    session.on(
        SessionEventKind::TurnEnd,
        Arc::new(move |event| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.lock().unwrap().push(event);
                Ok(None)
            })
        }),
    );
    events
}

#[tokio::test]
async fn text_only_turn_completes_and_reports_text() {
    let provider = MockProvider::text("hi there");
    let agent = Agent::new(provider).with_model("mock");
    let session = agent.create_session(CreateSessionOptions::default());
    let events = collect_events(&session);

    session.send("hello", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        SessionEvent::TurnEnd { text, .. } => assert_eq!(text, "hi there"),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn text_delta_forwards_provider_text_as_it_streams() {
    let provider = MockProvider::text("hi there");
    let agent = Agent::new(provider).with_model("mock");
    let session = agent.create_session(CreateSessionOptions::default());

    let deltas: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = deltas.clone();
    session.on(
        SessionEventKind::TextDelta,
        Arc::new(move |event| {
            let sink = sink.clone();
            Box::pin(async move {
                if let SessionEvent::TextDelta { delta } = event {
                    sink.lock().unwrap().push(delta);
                }
                Ok(None)
            })
        }),
    );

    session.send("hello", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    assert_eq!(*deltas.lock().unwrap(), vec!["hi there".to_string()]);
}

#[tokio::test]
async fn max_steps_zero_terminates_immediately_with_no_step_events() {
    let provider = MockProvider::text("should never be requested");
    let agent = Agent::new(provider).with_model("mock").with_max_steps(0);
    let session = agent.create_session(CreateSessionOptions::default());

    let steps: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let sink = steps.clone();
    session.on(
        SessionEventKind::Step,
        Arc::new(move |_event| {
            let sink = sink.clone();
            Box::pin(async move {
                *sink.lock().unwrap() += 1;
                Ok(None)
            })
        }),
    );
    let events = collect_events(&session);

    session.send("hello", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    assert_eq!(*steps.lock().unwrap(), 0);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        SessionEvent::TurnEnd { text, .. } => assert_eq!(text, ""),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn multi_turn_context_accumulates_across_sends() {
    let provider = MockProvider::new(vec![
        MockResponse::Text("first".into()),
        MockResponse::Text("second".into()),
    ]);
    let agent = Agent::new(provider).with_model("mock");
    let session = agent.create_session(CreateSessionOptions::default());

    session.send("one", SendOptions::default());
    session.wait_for_idle().await.unwrap();
    session.send("two", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    assert!(session.leaf_entry_id().is_some());
}

#[tokio::test]
async fn tool_call_executes_and_surfaces_result() {
    let provider = MockProvider::new(vec![
        MockResponse::ToolCalls(vec![MockToolCall::new(
            "echo",
            serde_json::json!({"value": "pong"}),
        )]),
        MockResponse::Text("done".into()),
    ]);
    let agent = Agent::new(provider)
        .with_model("mock")
        .with_tools(vec![Arc::new(EchoTool)]);
    let session = agent.create_session(CreateSessionOptions::default());

    let results: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    session.on(
        SessionEventKind::ToolResult,
        Arc::new(move |event| {
            let sink = sink.clone();
            Box::pin(async move {
                if let SessionEvent::ToolResult { result, .. } = event {
                    sink.lock().unwrap().push(result);
                }
                Ok(None)
            })
        }),
    );

    session.send("ping", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    assert_eq!(*results.lock().unwrap(), vec!["pong".to_string()]);
}

#[tokio::test]
async fn deny_decision_skips_execution_and_marks_error() {
    let provider = MockProvider::new(vec![
        MockResponse::ToolCalls(vec![MockToolCall::new("echo", serde_json::json!({"value": "x"}))]),
        MockResponse::Text("done".into()),
    ]);
    let agent = Agent::new(provider)
        .with_model("mock")
        .with_tools(vec![Arc::new(EchoTool)]);
    let session = agent.create_session(CreateSessionOptions::default());

    session.on(
        SessionEventKind::ToolCall,
        Arc::new(|_event| {
            Box::pin(async move { Ok(Some(ToolCallDecision::Deny("not allowed".into()))) })
        }),
    );

    let results: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    session.on(
        SessionEventKind::ToolResult,
        Arc::new(move |event| {
            let sink = sink.clone();
            Box::pin(async move {
                if let SessionEvent::ToolResult { result, is_error, .. } = event {
                    sink.lock().unwrap().push((result, is_error));
                }
                Ok(None)
            })
        }),
    );

    session.send("ping", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0], ("not allowed".to_string(), true));
}

#[tokio::test]
async fn pending_tool_calls_execute_concurrently() {
    let provider = MockProvider::new(vec![
        MockResponse::ToolCalls(vec![
            MockToolCall::new("slow", serde_json::json!({})),
            MockToolCall::new("slow", serde_json::json!({})),
        ]),
        MockResponse::Text("done".into()),
    ]);
    let agent = Agent::new(provider)
        .with_model("mock")
        .with_tools(vec![Arc::new(SlowTool { millis: 150 })]);
    let session = agent.create_session(CreateSessionOptions::default());

    let start = std::time::Instant::now();
    session.send("go", SendOptions::default());
    session.wait_for_idle().await.unwrap();
    let elapsed = start.elapsed();

    // Two 150ms tool calls run sequentially would take >=300ms; concurrent
    // execution should stay comfortably under that.
    assert!(elapsed < Duration::from_millis(280), "elapsed: {:?}", elapsed);
}

#[tokio::test]
async fn steering_mid_phase_denies_remaining_calls() {
    let provider = MockProvider::new(vec![
        MockResponse::ToolCalls(vec![
            MockToolCall::new("echo", serde_json::json!({"value": "a"})),
            MockToolCall::new("echo", serde_json::json!({"value": "b"})),
        ]),
        MockResponse::Text("done".into()),
    ]);
    let agent = Agent::new(provider)
        .with_model("mock")
        .with_tools(vec![Arc::new(EchoTool)])
        .with_send_mode(SendMode::Steer);
    let session = agent.create_session(CreateSessionOptions::default());

    let call_count = Arc::new(AtomicUsize::new(0));
    let steering_session = session.clone();
    let counter = call_count.clone();
    session.on(
        SessionEventKind::ToolCall,
        Arc::new(move |_event| {
            let counter = counter.clone();
            let steering_session = steering_session.clone();
            Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    steering_session.send("wait", SendOptions::default());
                }
                Ok(None)
            })
        }),
    );

    let denied: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = denied.clone();
    session.on(
        SessionEventKind::ToolResult,
        Arc::new(move |event| {
            let sink = sink.clone();
            Box::pin(async move {
                if let SessionEvent::ToolResult { is_error, .. } = event {
                    sink.lock().unwrap().push(is_error);
                }
                Ok(None)
            })
        }),
    );

    session.send("go", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    // The first call was already in flight when steering was observed and
    // executes normally; the second is auto-denied (§4.3 drain point 2).
    assert_eq!(*denied.lock().unwrap(), vec![false, true]);
}

#[tokio::test]
async fn queue_mode_runs_follow_up_as_another_step() {
    let provider = MockProvider::new(vec![
        MockResponse::Text("first".into()),
        MockResponse::Text("second".into()),
    ]);
    let agent = Agent::new(provider).with_model("mock");
    let session = agent.create_session(CreateSessionOptions::default());

    let texts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = texts.clone();
    session.on(
        SessionEventKind::Message,
        Arc::new(move |event| {
            let sink = sink.clone();
            Box::pin(async move {
                if let SessionEvent::Message { message } = event {
                    if message.role == turnframe::Role::Assistant {
                        sink.lock().unwrap().push(message.text());
                    }
                }
                Ok(None)
            })
        }),
    );

    // `send` marks the session "running" synchronously before the loop task
    // is even scheduled, so queuing the follow-up right after is
    // deterministic: it's in the queue well before the first step's
    // terminal check drains it (§4.4.2, §4.3 drain point 3).
    session.send("go", SendOptions::default());
    session.send("again", SendOptions { mode: Some(SendMode::Queue), cancel: None });
    session.wait_for_idle().await.unwrap();

    assert_eq!(*texts.lock().unwrap(), vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn resume_missing_session_without_store_entry_errors() {
    let provider = MockProvider::text("hi");
    let agent = Agent::new(provider).with_model("mock").with_store(InMemoryStore::new());

    let err = agent
        .resume_session("does-not-exist", ResumeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::SessionNotFound(_)));
}

#[tokio::test]
async fn resume_with_unknown_leaf_id_errors() {
    let provider = MockProvider::text("hi");
    let store = InMemoryStore::new();
    let agent = Agent::new(provider).with_model("mock").with_store(store);
    let session = agent.create_session(CreateSessionOptions {
        id: Some("s1".into()),
        send_mode: None,
    });
    session.send("hi", SendOptions::default());
    session.wait_for_idle().await.unwrap();

    let err = agent
        .resume_session(
            "s1",
            ResumeOptions {
                send_mode: None,
                leaf_id: Some("not-a-real-entry".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::EntryNotFound(_)));
}

#[tokio::test]
async fn resume_with_explicit_leaf_id_selects_that_entry() {
    let provider = MockProvider::new(vec![MockResponse::Text("reply".into())]);
    let agent = Agent::new(provider).with_model("mock").with_store(InMemoryStore::new());
    let session = agent.create_session(CreateSessionOptions {
        id: Some("s2".into()),
        send_mode: None,
    });
    session.send("hi", SendOptions::default());
    session.wait_for_idle().await.unwrap();
    let known_entry_id = session.leaf_entry_id().unwrap();

    let resumed = agent
        .resume_session(
            "s2",
            ResumeOptions {
                send_mode: None,
                leaf_id: Some(known_entry_id.clone()),
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.leaf_entry_id(), Some(known_entry_id));
}
