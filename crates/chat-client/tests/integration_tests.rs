//! Integration tests for chat-client
//!
//! These tests run an in-process chat server and drive a full session
//! against it: stream, submission, rendering and ratings.

use std::time::Duration;

use axum::http::StatusCode;
use chat_client::streaming::ReadyState;
use chat_client::testing::{wait_for, FakeChatServer, TestServer};
use chat_client::{ChatClientError, ConnectionHandle, SessionConfig, StreamSession};
use chat_core::storage::{self, keys, SessionStore};
use chat_core::{MemoryStore, Role, ServerEvent, SENTINEL};

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Helpers
// =============================================================================

async fn start(fake: &FakeChatServer) -> TestServer {
    TestServer::start(fake.router())
        .await
        .expect("Failed to start test server")
}

fn config(route: &str) -> SessionConfig {
    let mut config = SessionConfig::default()
        .with_route(route)
        .with_typing_interval(Duration::from_millis(1));
    config.liveness_delay = Duration::from_millis(50);
    config
}

fn session(server: &TestServer, route: &str) -> StreamSession {
    StreamSession::new(server.client.clone(), config(route))
}

async fn wait_for_subscribers(fake: &FakeChatServer, count: usize) -> bool {
    wait_for(
        || {
            let fake = fake.clone();
            async move { fake.subscriber_count() == count }
        },
        IDLE_TIMEOUT,
    )
    .await
}

async fn wait_for_state(conn: &ConnectionHandle, state: ReadyState) -> bool {
    wait_for(
        || {
            let conn = conn.clone();
            async move { conn.ready_state() == state }
        },
        IDLE_TIMEOUT,
    )
    .await
}

async fn ask(session: &mut StreamSession, question: &str) {
    session.submit(question).await.unwrap();
    tokio::time::timeout(IDLE_TIMEOUT, session.run_until_idle())
        .await
        .expect("answer never completed")
        .unwrap();
}

// =============================================================================
// Stream Connection Tests
// =============================================================================

#[tokio::test]
async fn test_open_twice_returns_same_connection() {
    let fake = FakeChatServer::new();
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    let first = session.open_stream().unwrap();
    let second = session.open_stream().unwrap();
    assert!(first.ptr_eq(&second));

    assert!(wait_for_subscribers(&fake, 1).await);
    assert_eq!(fake.connection_ids(), vec![session.connection_id()]);
    assert!(wait_for_state(&first, ReadyState::Open).await);
    assert!(storage::is_stream_active(session.local_store()));
}

#[tokio::test]
async fn test_server_close_allows_reopen() {
    let fake = FakeChatServer::new();
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    let first = session.open_stream().unwrap();
    assert!(wait_for_subscribers(&fake, 1).await);

    fake.close_streams();
    assert!(wait_for_state(&first, ReadyState::Closed).await);

    let second = session.open_stream().unwrap();
    assert!(!first.ptr_eq(&second));
    assert!(wait_for_subscribers(&fake, 1).await);

    // Same tab, same connection id
    let ids = fake.connection_ids();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_rejected_stream_fails_pending_answer() {
    let fake = FakeChatServer::new();
    fake.reject_streams_with(StatusCode::SERVICE_UNAVAILABLE);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    session.submit("hello?").await.unwrap();
    let result = tokio::time::timeout(IDLE_TIMEOUT, session.run_until_idle())
        .await
        .unwrap();

    assert!(matches!(result, Err(ChatClientError::StreamError(_))));
    assert!(session.connection().unwrap().is_closed());
}

#[tokio::test]
async fn test_unload_clears_shared_state() {
    let fake = FakeChatServer::new();
    let server = start(&fake).await;
    let local = MemoryStore::new();

    let mut tab1 = StreamSession::with_stores(
        server.client.clone(),
        config("/ai"),
        MemoryStore::new(),
        local.clone(),
    );
    let tab2 = StreamSession::with_stores(
        server.client.clone(),
        config("/ai"),
        MemoryStore::new(),
        local.clone(),
    );
    assert_eq!(local.get(keys::TOTAL_TABS).as_deref(), Some("2"));
    assert_eq!(tab2.session_store().get(keys::CURRENT_TAB_INDEX).as_deref(), Some("2"));

    let conn = tab1.open_stream().unwrap();
    assert!(storage::is_stream_active(&local));

    tab1.unload();
    tab1.unload();
    assert!(conn.is_closed());
    assert!(!storage::is_stream_active(&local));
    assert_eq!(local.get(keys::TOTAL_TABS).as_deref(), Some("1"));
}

// =============================================================================
// Answer Rendering Tests
// =============================================================================

#[tokio::test]
async fn test_typewriter_reveals_answer_in_order() {
    let fake = FakeChatServer::new();
    fake.push_answer(["Hello", " there", ", <b>friend</b>"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    ask(&mut session, "Say hi").await;

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.turns()[0].role(), Role::User);

    let answer = transcript.last().unwrap();
    assert!(answer.is_sealed());
    assert!(!answer.bubble().is_loading());
    assert_eq!(answer.bubble().content(), "Hello there, <b>friend</b>");
    assert!(!answer.bubble().html().contains(SENTINEL));
    assert!(!session.renderer().is_animating());
    assert_eq!(session.chat_id(), Some("chat-1"));
}

#[tokio::test]
async fn test_zero_typing_interval_still_types() {
    let fake = FakeChatServer::new();
    fake.push_answer(["no", " delay"]);
    let server = start(&fake).await;
    let config = config("/ai").with_typing_interval(Duration::ZERO);
    let mut session = StreamSession::new(server.client.clone(), config);

    ask(&mut session, "Fast?").await;

    let answer = session.transcript().last().unwrap();
    assert!(answer.is_sealed());
    assert_eq!(answer.bubble().content(), "no delay");
}

#[tokio::test]
async fn test_typewriter_expands_literal_escapes() {
    let fake = FakeChatServer::new();
    fake.push_answer(["line one\\nline two"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    ask(&mut session, "Two lines").await;

    let answer = session.transcript().last().unwrap();
    assert_eq!(answer.bubble().content(), "line one<br>line two");
}

#[tokio::test]
async fn test_sentinel_first_seals_empty_answer() {
    let fake = FakeChatServer::new();
    fake.push_events(vec![ServerEvent::chat(SENTINEL)]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    ask(&mut session, "Anything?").await;

    let answer = session.transcript().last().unwrap();
    assert!(answer.is_assistant());
    assert!(answer.is_sealed());
    assert_eq!(answer.bubble().html(), "");
}

#[tokio::test]
async fn test_chunked_answer_renders_markdown() {
    let fake = FakeChatServer::new();
    fake.push_answer(["# Title", "some **bold** text", "<script>alert(1)</script>"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/voip");

    ask(&mut session, "Format it").await;

    let answer = session.transcript().last().unwrap();
    assert!(answer.is_sealed());
    let html = answer.bubble().html();
    assert!(html.contains("<h1>Title</h1>"));
    assert!(html.contains("<strong>bold</strong>"));
    assert!(!html.contains("<script>"));
    assert!(!answer.rendered().unwrap().is_table());
}

#[tokio::test]
async fn test_chunked_table_answer() {
    let fake = FakeChatServer::new();
    fake.push_table(r#"[{"name":"alpha","count":1},{"name":"beta","count":2}]"#);
    let server = start(&fake).await;
    let mut session = session(&server, "/aidb");

    ask(&mut session, "Select everything").await;

    let answer = session.transcript().last().unwrap();
    let rendered = answer.rendered().unwrap();
    assert!(rendered.is_table());

    let html = answer.bubble().html();
    assert!(html.contains("class=\"table-sm display compact stripe nowrap\""));
    assert!(html.contains("<th>name</th><th>count</th>"));
    assert!(html.contains("<td>beta</td><td>2</td>"));
}

#[tokio::test]
async fn test_events_without_placeholder_synthesize_turn() {
    let fake = FakeChatServer::new();
    let server = start(&fake).await;
    let mut session = session(&server, "/voip");

    session.open_stream().unwrap();
    assert!(wait_for_subscribers(&fake, 1).await);

    fake.send_now(ServerEvent::chat("unprompted"));
    fake.send_now(ServerEvent::chat(SENTINEL));

    let mut sealed = false;
    for _ in 0..500 {
        session.process_pending();
        if session.transcript().last().is_some_and(|t| t.is_sealed()) {
            sealed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(sealed);

    let turn = session.transcript().last().unwrap();
    assert!(turn.is_synthesized());
    assert!(turn.bubble().is_error_styled());
    assert!(turn.bubble().html().contains("unprompted"));
}

// =============================================================================
// Submission Tests
// =============================================================================

#[tokio::test]
async fn test_failed_submission_removes_placeholder() {
    let fake = FakeChatServer::new();
    fake.fail_chat_with(StatusCode::INTERNAL_SERVER_ERROR);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    let err = session.submit("hello").await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript.turns()[0].role(), Role::User);
    assert_eq!(transcript.notices().len(), 1);
    assert_eq!(
        transcript.notices()[0].message,
        "Error sending message! HTTP Status: 500"
    );
}

#[tokio::test]
async fn test_empty_submission_is_rejected() {
    let fake = FakeChatServer::new();
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    assert!(matches!(
        session.submit("   ").await,
        Err(ChatClientError::EmptyMessage)
    ));
    assert!(session.transcript().is_empty());
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_chat_id_sent_on_follow_up() {
    let fake = FakeChatServer::with_chat_id("conv-42");
    fake.push_answer(["one"]);
    fake.push_answer(["two"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    ask(&mut session, "first").await;
    ask(&mut session, "second").await;

    let requests = fake.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].chat_id, None);
    assert_eq!(requests[1].chat_id.as_deref(), Some("conv-42"));
    assert_eq!(
        session.local_store().get(&keys::click("btnChatSend")).as_deref(),
        Some("2")
    );
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let fake = FakeChatServer::new();
    fake.push_answer(["streamed"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    session.submit("go").await.unwrap();
    session
        .run(tokio::time::sleep(Duration::from_millis(500)))
        .await;

    let answer = session.transcript().last().unwrap();
    assert!(answer.is_sealed());
    assert_eq!(answer.bubble().content(), "streamed");
    assert!(session.connection().unwrap().is_closed());
}

// =============================================================================
// Rating Tests
// =============================================================================

#[tokio::test]
async fn test_rating_targets_assistant_ordinal() {
    let fake = FakeChatServer::new();
    fake.push_answer(["first answer"]);
    fake.push_answer(["second answer"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    ask(&mut session, "q1").await;
    ask(&mut session, "q2").await;

    let second = session.transcript().assistant_by_ordinal(2).unwrap().id();
    session.rate(2, 4).unwrap().await.unwrap();

    let ratings = fake.ratings();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].chat_idx, 2);
    assert_eq!(ratings[0].chat_id, "chat-1");
    assert_eq!(ratings[0].chat_rating.value(), 4);
    assert_eq!(ratings[0].turn_id, Some(second));

    let turn = session.transcript().get(second).unwrap();
    assert_eq!(turn.rating().unwrap().score.value(), 4);
}

#[tokio::test]
async fn test_invalid_rating_rejected_locally() {
    let fake = FakeChatServer::new();
    fake.push_answer(["answer"]);
    let server = start(&fake).await;
    let mut session = session(&server, "/ai");

    ask(&mut session, "q").await;

    assert!(matches!(
        session.rate(1, 9),
        Err(ChatClientError::Transcript(_))
    ));
    assert!(matches!(
        session.rate(2, 3),
        Err(ChatClientError::Transcript(_))
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fake.ratings().is_empty());
}
