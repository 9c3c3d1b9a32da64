//! End-to-end integration tests for the ThreadClaw agent runtime.
//!
//! These tests exercise the full pipeline from user objective to final
//! answer: stream decoding, tool execution, thread persistence, and
//! detached continuation through the work queue.

use std::sync::Arc;
use std::time::Duration;

use threadclaw_agent::{
    CollectingObserver, QueueWorker, QueuedContinuation, RunOptions, Runner, TaskQueue,
};
use threadclaw_config::AppConfig;
use threadclaw_core::message::{Role, ThreadId};
use threadclaw_core::payload::Payload;
use threadclaw_core::store::ThreadStore;
use threadclaw_providers::ScriptedBackend;
use threadclaw_store::{FileThreadStore, MemoryThreadStore};
use threadclaw_tools::default_catalog;

fn runner_over(backend: Arc<ScriptedBackend>, store: Arc<dyn ThreadStore>) -> Runner {
    Runner::new(
        backend,
        Arc::new(default_catalog()),
        store,
        AppConfig::default(),
    )
}

// ── E2E: Full agent loop ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_calculator_tool_invocation() {
    // Scenario: the model reaches for the calculator, reads its result,
    // then produces the final answer on a second backend pass.
    let backend = Arc::new(ScriptedBackend::new(vec![
        ScriptedBackend::tool_reply(
            "call_calc",
            "calculator",
            &["{\"expression\":", " \"2 + 2\"}"],
        ),
        ScriptedBackend::text_reply("The answer is 4."),
    ]));
    let store = Arc::new(MemoryThreadStore::new());
    let runner = runner_over(backend.clone(), store.clone());

    let collector = Arc::new(CollectingObserver::new());
    runner
        .start(
            "assistant",
            ThreadId::from("e2e-calc"),
            "what is 2 + 2?",
            RunOptions::new().with_observer(collector.clone()),
        )
        .await
        .expect("run should succeed");

    assert_eq!(backend.call_count(), 2);
    assert_eq!(collector.response_text().await, "The answer is 4.");

    // system, user, invocation, tool result, answer
    let history = store.get(&ThreadId::from("e2e-calc")).await.unwrap();
    assert_eq!(history.len(), 5);
    assert!(history[2].has_tool_calls());
    assert_eq!(history[2].tool_calls[0].name, "calculator");
    assert_eq!(history[3].role, Role::Tool);
    assert_eq!(history[3].text(), Some("4"));
    assert_eq!(history[4].text(), Some("The answer is 4."));
}

#[tokio::test]
async fn e2e_direct_answer_no_tools() {
    let backend = Arc::new(ScriptedBackend::new(vec![ScriptedBackend::text_reply(
        "Hello! How can I help you today?",
    )]));
    let store = Arc::new(MemoryThreadStore::new());
    let runner = runner_over(backend.clone(), store.clone());

    let collector = Arc::new(CollectingObserver::new());
    runner
        .start(
            "assistant",
            ThreadId::from("e2e-direct"),
            "Hi there!",
            RunOptions::new().with_observer(collector.clone()),
        )
        .await
        .expect("run should succeed");

    assert_eq!(backend.call_count(), 1);
    assert_eq!(
        collector.response_text().await,
        "Hello! How can I help you today?"
    );

    let history = store.get(&ThreadId::from("e2e-direct")).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|m| !m.has_tool_calls()));
}

#[tokio::test]
async fn e2e_two_tool_passes_before_the_answer() {
    // Scenario: lookup first, clock second, answer third. Each tool pass
    // consumes one iteration; the default budget covers both.
    let backend = Arc::new(ScriptedBackend::new(vec![
        ScriptedBackend::tool_reply("c1", "lookup", &["{\"q\": \"release dates\"}"]),
        ScriptedBackend::tool_reply("c2", "clock", &["{}"]),
        ScriptedBackend::text_reply("Compared against today, the release is out."),
    ]));
    let store = Arc::new(MemoryThreadStore::new());
    let runner = runner_over(backend.clone(), store.clone());

    runner
        .start(
            "assistant",
            ThreadId::from("e2e-multi"),
            "Is the release out yet?",
            RunOptions::new(),
        )
        .await
        .expect("run should succeed");

    assert_eq!(backend.call_count(), 3);

    let history = store.get(&ThreadId::from("e2e-multi")).await.unwrap();
    assert_eq!(history.len(), 7);
    assert_eq!(history[2].tool_calls[0].name, "lookup");
    assert!(
        history[3]
            .text()
            .unwrap_or_default()
            .contains("release dates")
    );
    assert_eq!(history[4].tool_calls[0].name, "clock");
    assert_eq!(history[5].role, Role::Tool);
    assert_eq!(
        history[6].text(),
        Some("Compared against today, the release is out.")
    );
}

#[tokio::test]
async fn e2e_payload_order_ends_with_a_single_end() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        ScriptedBackend::tool_reply("c1", "calculator", &["{\"expression\": \"8 / 2\"}"]),
        ScriptedBackend::text_reply("It comes to 4."),
    ]));
    let store = Arc::new(MemoryThreadStore::new());
    let runner = runner_over(backend, store);

    let collector = Arc::new(CollectingObserver::new());
    runner
        .start(
            "assistant",
            ThreadId::from("e2e-order"),
            "What is 8 / 2?",
            RunOptions::new().with_observer(collector.clone()),
        )
        .await
        .expect("run should succeed");

    let payloads = collector.collected().await;
    assert!(matches!(payloads[0], Payload::Tool(_)));
    assert!(matches!(payloads.last(), Some(Payload::End)));

    let ends = payloads
        .iter()
        .filter(|p| matches!(p, Payload::End))
        .count();
    assert_eq!(ends, 1);
}

// ── E2E: Thread persistence ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_thread_history_survives_a_restart() {
    // Two runner instances over the same store directory stand in for
    // two CLI invocations.
    let dir = tempfile::tempdir().expect("tempdir");
    let thread_id = ThreadId::from("e2e-persist");

    {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptedBackend::text_reply(
            "Noted.",
        )]));
        let store = Arc::new(FileThreadStore::new(dir.path().to_path_buf()));
        let runner = runner_over(backend, store);
        runner
            .start(
                "assistant",
                thread_id.clone(),
                "Remember the number 7.",
                RunOptions::new(),
            )
            .await
            .expect("first run should succeed");
    }

    let backend = Arc::new(ScriptedBackend::new(vec![ScriptedBackend::text_reply(
        "You told me 7.",
    )]));
    let store = Arc::new(FileThreadStore::new(dir.path().to_path_buf()));
    let runner = runner_over(backend.clone(), store.clone());
    runner
        .start(
            "assistant",
            thread_id.clone(),
            "What number did I tell you?",
            RunOptions::new(),
        )
        .await
        .expect("second run should succeed");

    // The reloaded history rode along on the second request.
    let requests = backend.requests().await;
    assert_eq!(requests[0].messages.len(), 4);
    assert_eq!(requests[0].messages[2].text(), Some("Noted."));

    let history = store.get(&thread_id).await.unwrap();
    assert_eq!(history.len(), 5);
    let systems = history.iter().filter(|m| m.role == Role::System).count();
    assert_eq!(systems, 1);
    assert_eq!(history[4].text(), Some("You told me 7."));
}

// ── E2E: Detached continuation ───────────────────────────────────────────

#[tokio::test]
async fn e2e_detached_run_completes_on_the_worker() {
    // Scenario: the first pass schedules a tool call, the caller returns,
    // and the queue worker carries the run to its final answer.
    let backend = Arc::new(ScriptedBackend::new(vec![
        ScriptedBackend::tool_reply("c1", "lookup", &["{\"q\": \"rust\"}"]),
        ScriptedBackend::text_reply("All done."),
    ]));
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileThreadStore::new(dir.path().to_path_buf()));
    let (queue, rx) = TaskQueue::new();
    let runner = Arc::new(
        runner_over(backend, store.clone())
            .with_continuation(Arc::new(QueuedContinuation::new(Arc::new(queue)))),
    );
    QueueWorker::spawn(runner.clone(), rx);

    runner
        .start(
            "assistant",
            ThreadId::from("e2e-detached"),
            "Look up rust",
            RunOptions::new().with_detached(true),
        )
        .await
        .expect("start should succeed");

    // start() returned after the handoff; the worker finishes the run.
    let mut history = Vec::new();
    for _ in 0..100 {
        history = store.get(&ThreadId::from("e2e-detached")).await.unwrap();
        if history.len() == 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(history.len(), 5);
    assert_eq!(history[4].text(), Some("All done."));
}

// ── E2E: Gateway over the router ─────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_chat_round_trip() {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use threadclaw_gateway::{build_router, GatewayState};
    use tower::ServiceExt;

    let backend = Arc::new(ScriptedBackend::new(vec![
        ScriptedBackend::tool_reply("c1", "calculator", &["{\"expression\": \"2 + 2\"}"]),
        ScriptedBackend::text_reply("The answer is 4."),
    ]));
    let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
    let runner = Arc::new(runner_over(backend, store.clone()));
    let app = build_router(Arc::new(GatewayState {
        runner,
        store,
        default_agent: "assistant".to_string(),
    }));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/chat")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "message": "what is 2 + 2?",
                        "thread_id": "e2e-http"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["thread_id"], "e2e-http");
    assert_eq!(body["content"], "The answer is 4.");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/threads/e2e-http")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 5);
}

// ── E2E: Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_defaults_and_starter_toml() {
    let config = AppConfig::default();
    assert!(!config.backend.model.is_empty());
    assert!(config.gateway.port > 0);
    assert!(!config.gateway.host.is_empty());
    assert!(config.agents.contains_key("assistant"));

    // The onboard command writes this exact document.
    let starter = AppConfig::default_toml();
    let reparsed: AppConfig = toml::from_str(&starter).expect("starter config should parse back");
    assert_eq!(reparsed.gateway.port, config.gateway.port);
    assert_eq!(reparsed.backend.model, config.backend.model);
    assert_eq!(
        reparsed.agents["assistant"].tools,
        config.agents["assistant"].tools
    );
}
