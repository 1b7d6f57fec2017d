// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state machine tests against the mock transport and the
//! in-memory cache store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use parley_core::{
    CacheStore, ChatApi, ChatConfig, ChatInit, ConnectionState, Direction, Feedback, Field,
    FileInfo, Form, FormState, Message, MessageDraft, OfflineForm, OfflineFormSettings,
    OfflineWorkType, Payload, SendStatus, TextFieldKind, TransportEvent,
};
use parley_engine::ChatSession;
use parley_test_utils::{MemoryCacheStore, MockChatApi};

fn test_config() -> ChatConfig {
    let mut config = ChatConfig::new("153", "17", "wss://chat.example", "https://api.example");
    config.client_email = Some("client@example.com".to_string());
    config
}

fn setup(config: ChatConfig) -> (Arc<ChatSession>, Arc<MockChatApi>, Arc<MemoryCacheStore>) {
    let api = MockChatApi::new();
    let store = Arc::new(MemoryCacheStore::new());
    let session = ChatSession::new(config, api.clone(), store.clone()).unwrap();
    (session, api, store)
}

fn agent_message(id: i64, text: &str) -> Message {
    Message {
        id,
        local_id: id,
        created_at: Utc::now(),
        direction: Direction::Agent,
        payload: Payload::text(text, text),
        status: None,
        agent: None,
    }
}

fn inited(status: Option<i64>, messages: Vec<Message>) -> TransportEvent {
    TransportEvent::ChatInited(ChatInit {
        token: "issued-token".to_string(),
        status,
        waiting_email: false,
        messages,
    })
}

/// Server echo confirming a previously sent client text message.
fn client_echo(id: i64, local_id: i64, text: &str) -> TransportEvent {
    TransportEvent::MessagesReceived {
        messages: vec![Message {
            id,
            local_id,
            created_at: Utc::now(),
            direction: Direction::Client,
            payload: Payload::text(text, text),
            status: Some(SendStatus::Sent),
            agent: None,
        }],
        historical: false,
    }
}

/// Lets the event pump and spawned tasks drain. The paused clock
/// auto-advances through any pending timers (gate grace, field debounce,
/// reconnect delay), so this is instant in wall time.
async fn settle() {
    tokio::time::sleep(Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn connect_twice_opens_one_socket() {
    let (session, api, _store) = setup(test_config());

    session.connect().await.unwrap();
    session.connect().await.unwrap();
    settle().await;

    assert_eq!(api.connect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn init_publishes_token_and_message_list() {
    let (session, api, store) = setup(test_config());
    session.connect().await.unwrap();

    api.inject_event(inited(Some(1), vec![agent_message(10, "hi"), agent_message(11, "there")]))
        .await;
    settle().await;

    let hub = session.events();
    assert_eq!(
        hub.client_token().borrow().as_deref(),
        Some("issued-token")
    );
    assert_eq!(hub.message_list().borrow().len(), 2);

    // token persisted for the identity
    let persisted = store.get_config(&test_config()).await.unwrap().unwrap();
    assert_eq!(persisted.client_token.as_deref(), Some("issued-token"));
}

#[tokio::test(start_paused = true)]
async fn reinit_with_overlapping_snapshot_does_not_duplicate() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();

    api.inject_event(inited(Some(1), vec![agent_message(10, "a"), agent_message(11, "b")]))
        .await;
    settle().await;
    api.inject_event(inited(
        Some(1),
        vec![agent_message(10, "a"), agent_message(11, "b"), agent_message(12, "c")],
    ))
    .await;
    settle().await;

    let list = session.events().message_list().borrow().clone();
    let ids: Vec<i64> = list.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![10, 11, 12]);
}

#[tokio::test(start_paused = true)]
async fn first_message_gate_serializes_early_sends() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();

    session.send_text("first").await.unwrap();
    assert_eq!(api.sent_texts().await.len(), 1);

    // the second send parks behind the gate for the grace period
    let second = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.send_text("second").await })
    };
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert_eq!(api.sent_texts().await.len(), 1);

    // the grace after the first successful send elapses; the gate opens
    settle().await;
    second.await.unwrap().unwrap();

    let texts: Vec<String> = api.sent_texts().await.into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn active_init_alone_releases_the_gate() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();

    // no client send yet; the active init opens the gate by itself
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    session.send_text("a").await.unwrap();
    session.send_text("b").await.unwrap();
    let texts: Vec<String> = api.sent_texts().await.into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn echo_confirms_message_and_clears_shadow_copy() {
    let (session, api, store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    session.send_text("hello").await.unwrap();
    settle().await;
    let pending = store.not_sent_messages().await.unwrap();
    assert_eq!(pending.len(), 1);
    let local_id = pending[0].local_id;
    assert!(local_id < 0);

    // server echo assigns the real id and confirms delivery
    let echo = Message {
        id: 500,
        local_id,
        created_at: Utc::now(),
        direction: Direction::Client,
        payload: Payload::text("hello", "hello"),
        status: Some(SendStatus::Sent),
        agent: None,
    };
    api.inject_event(TransportEvent::MessagesReceived {
        messages: vec![echo],
        historical: false,
    })
    .await;
    settle().await;

    assert!(store.not_sent_messages().await.unwrap().is_empty());
    let list = session.events().message_list().borrow().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, 500);
    assert_eq!(list[0].status, Some(SendStatus::Sent));
}

#[tokio::test(start_paused = true)]
async fn failed_send_flips_status_and_rethrows() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    let mut exceptions = session.events().exceptions();

    api.fail_next_send();
    assert!(session.send_text("doomed").await.is_err());
    settle().await;

    assert!(exceptions.try_recv().is_ok());
    let list = session.events().message_list().borrow().clone();
    assert_eq!(list[0].status, Some(SendStatus::SendFailed));

    // retry succeeds and goes back over the wire
    session.send_again(list[0].local_id).await.unwrap();
    settle().await;
    assert_eq!(api.sent_texts().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_again_requires_a_failed_message() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    session.send_text("fine").await.unwrap();
    settle().await;
    let local_id = session.events().message_list().borrow()[0].local_id;
    assert!(session.send_again(local_id).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn draft_is_sent_and_consumed_atomically() {
    let (session, api, store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    session
        .set_draft(MessageDraft {
            text: "draft text".to_string(),
            files: vec![FileInfo {
                uri: "/tmp/photo.jpg".to_string(),
                mime: "image/jpeg".to_string(),
                name: "photo.jpg".to_string(),
            }],
        })
        .await
        .unwrap();

    session.send_draft().await.unwrap();
    settle().await;

    let texts: Vec<String> = api.sent_texts().await.into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["draft text".to_string()]);
    let uploads = api.uploaded_files().await;
    assert_eq!(uploads.len(), 1);
    // the upload reads from the app-private cached copy
    assert_eq!(uploads[0].0, "cached:/tmp/photo.jpg");
    assert_eq!(store.cached_files().await, vec!["/tmp/photo.jpg".to_string()]);

    assert!(session.get_draft().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsent_messages_resent_after_reinit() {
    let (session, api, store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    api.fail_next_send();
    let _ = session.send_text("stuck").await;
    settle().await;
    assert_eq!(store.not_sent_messages().await.unwrap().len(), 1);

    // re-init: the pending message is kept in the list and resent
    api.inject_event(inited(Some(1), vec![agent_message(10, "welcome")]))
        .await;
    settle().await;

    let texts: Vec<String> = api.sent_texts().await.into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["stuck".to_string()]);
    let list = session.events().message_list().borrow().clone();
    assert_eq!(list.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn snapshot_confirmation_clears_the_shadow_row() {
    let (session, api, store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    api.fail_next_send();
    let _ = session.send_text("stuck").await;
    settle().await;
    let pending = store.not_sent_messages().await.unwrap();
    assert_eq!(pending.len(), 1);
    let local_id = pending[0].local_id;

    // the reinit snapshot already carries the confirmed form
    let mut confirmed = agent_message(800, "stuck");
    confirmed.local_id = local_id;
    confirmed.direction = Direction::Client;
    confirmed.status = Some(SendStatus::Sent);
    api.inject_event(inited(Some(1), vec![confirmed])).await;
    settle().await;

    assert!(store.not_sent_messages().await.unwrap().is_empty());
    // confirmed by the snapshot, so nothing is resent
    assert!(api.sent_texts().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn previous_pages_are_single_flight_and_cache_exhaustion() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![agent_message(10, "latest")]))
        .await;
    settle().await;

    api.push_page(vec![agent_message(5, "older")], true).await;
    assert!(session.load_previous_messages_page().await.unwrap());
    settle().await;
    assert_eq!(api.page_requests().await, vec![10]);

    let list = session.events().message_list().borrow().clone();
    let ids: Vec<i64> = list.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![5, 10], "older page is prepended");

    // no scripted page left: history exhausted
    assert!(!session.load_previous_messages_page().await.unwrap());
    // exhaustion is cached, no further request goes out
    assert!(!session.load_previous_messages_page().await.unwrap());
    assert_eq!(api.page_requests().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_page_loads_share_one_request_and_outcome() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![agent_message(10, "latest")]))
        .await;
    settle().await;

    // the request takes a while, so the two callers overlap
    api.set_page_delay(Duration::from_millis(200)).await;
    api.push_page(vec![agent_message(5, "older")], false).await;

    let follower = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.load_previous_messages_page().await })
    };
    let leader = session.load_previous_messages_page().await.unwrap();
    let follower = follower.await.unwrap().unwrap();

    // both callers resolve to the same boolean off a single request
    assert!(!leader);
    assert!(!follower);
    assert_eq!(api.page_requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_files_uploads_every_attachment() {
    let (session, api, store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    session
        .send_files(vec![
            FileInfo {
                uri: "/tmp/a.png".to_string(),
                mime: "image/png".to_string(),
                name: "a.png".to_string(),
            },
            FileInfo {
                uri: "/tmp/b.pdf".to_string(),
                mime: "application/pdf".to_string(),
                name: "b.pdf".to_string(),
            },
        ])
        .await
        .unwrap();
    settle().await;

    let uploads = api.uploaded_files().await;
    assert_eq!(uploads.len(), 2);
    assert_eq!(store.cached_files().await.len(), 2);
    assert_eq!(session.events().message_list().borrow().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_upload_flips_file_message_to_send_failed() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    api.fail_next_upload();
    let result = session
        .send_file(FileInfo {
            uri: "/tmp/a.png".to_string(),
            mime: "image/png".to_string(),
            name: "a.png".to_string(),
        })
        .await;
    assert!(result.is_err());
    settle().await;

    let rx = session.events().message_list();
    let list = rx.borrow().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, Some(SendStatus::SendFailed));
    assert!(api.uploaded_files().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn message_received_stream_replays_the_latest_message() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![agent_message(10, "hi")]))
        .await;
    settle().await;

    // a subscriber arriving after init still sees the last message
    let rx = session.events().message_received();
    assert_eq!(rx.borrow().as_ref().map(|m| m.id), Some(10));

    api.inject_event(TransportEvent::MessagesReceived {
        messages: vec![agent_message(11, "again")],
        historical: false,
    })
    .await;
    settle().await;
    assert_eq!(rx.borrow().as_ref().map(|m| m.id), Some(11));
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_reconnects_once_after_delay() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    settle().await;
    assert_eq!(api.connect_calls(), 1);

    // transport-level drop, not a user-initiated disconnect
    api.disconnect().await;
    settle().await;
    // paused clock has advanced through the 5s timer
    assert_eq!(api.connect_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_disconnect_does_not_reconnect() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    settle().await;

    session.disconnect().await;
    settle().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.connect_calls(), 1);
}

#[derive(Default)]
struct StateRecorder {
    states: std::sync::Mutex<Vec<ConnectionState>>,
}

impl parley_engine::ChatObserver for StateRecorder {
    fn on_connection_state(&self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_surfaces_as_reconnecting() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    settle().await;
    session.disconnect().await;
    settle().await;

    let recorder = Arc::new(StateRecorder::default());
    session.add_observer(recorder.clone());
    session.connect().await.unwrap();
    settle().await;
    assert_eq!(api.connect_calls(), 2);

    // the replayed Disconnected, then the reconnect, never Connecting
    assert_eq!(
        *recorder.states.lock().unwrap(),
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Reconnecting,
            ConnectionState::Connected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn token_error_reissues_init_instead_of_reconnecting() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    settle().await;

    api.inject_event(TransportEvent::TokenError).await;
    settle().await;

    assert_eq!(api.init_calls(), 1);
    assert_eq!(api.connect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn remove_message_only_works_for_unconfirmed() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    api.fail_next_send();
    let _ = session.send_text("pending").await;
    settle().await;
    let local_id = session.events().message_list().borrow()[0].local_id;

    session.remove_message(local_id).await.unwrap();
    assert!(session.events().message_list().borrow().is_empty());

    // a confirmed message cannot be removed
    session.send_text("confirmed").await.unwrap();
    settle().await;
    let local_id = session.events().message_list().borrow()[0].local_id;
    api.inject_event(TransportEvent::MessagesReceived {
        messages: vec![Message {
            id: 600,
            local_id,
            created_at: Utc::now(),
            direction: Direction::Client,
            payload: Payload::text("confirmed", "confirmed"),
            status: Some(SendStatus::Sent),
            agent: None,
        }],
        historical: false,
    })
    .await;
    settle().await;
    assert!(session.remove_message(local_id).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn feedback_updates_message_optimistically() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();

    let mut message = agent_message(42, "rate me");
    if let Payload::Text { feedback_needed, .. } = &mut message.payload {
        *feedback_needed = true;
    }
    api.inject_event(inited(Some(1), vec![message])).await;
    settle().await;

    session.send_feedback(42, Feedback::Like).await.unwrap();
    settle().await;

    assert_eq!(api.sent_feedback().await, vec![(42, Feedback::Like)]);
    let list = session.events().message_list().borrow().clone();
    match &list[0].payload {
        Payload::Text {
            feedback,
            feedback_needed,
            ..
        } => {
            assert_eq!(*feedback, Some(Feedback::Like));
            assert!(!feedback_needed);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn offline_form_goes_to_http_without_chat_routing() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();

    let settings = OfflineFormSettings {
        work_type: OfflineWorkType::AlwaysEnabledCallbackWithoutChat,
        callback_title: "Leave a message".to_string(),
        callback_greeting: String::new(),
        topics: vec![],
        topics_required: false,
        fields: vec![],
    };
    api.inject_event(TransportEvent::OfflineForm {
        settings,
        init: ChatInit {
            token: "issued-token".to_string(),
            status: Some(2),
            waiting_email: false,
            messages: vec![],
        },
    })
    .await;
    settle().await;

    let form = OfflineForm {
        client_name: "Ada".to_string(),
        client_email: "ada@example.com".to_string(),
        topic: "Billing".to_string(),
        fields: vec![],
        message: "My invoice is wrong".to_string(),
    };
    session.send_offline_form(&form).await.unwrap();
    assert_eq!(api.sent_offline_forms().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn offline_form_with_chat_routing_lands_in_the_chat() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();

    let settings = OfflineFormSettings {
        work_type: OfflineWorkType::AlwaysEnabledCallbackWithChat,
        callback_title: String::new(),
        callback_greeting: String::new(),
        topics: vec![],
        topics_required: false,
        fields: vec![],
    };
    api.inject_event(TransportEvent::OfflineForm {
        settings,
        init: ChatInit {
            token: "issued-token".to_string(),
            status: Some(1),
            waiting_email: false,
            messages: vec![],
        },
    })
    .await;
    settle().await;

    let form = OfflineForm {
        client_name: "Ada".to_string(),
        client_email: "ada@example.com".to_string(),
        topic: String::new(),
        fields: vec![],
        message: "Ping me".to_string(),
    };
    session.send_offline_form(&form).await.unwrap();
    settle().await;

    let texts: Vec<String> = api.sent_texts().await.into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["Ada\nada@example.com\nPing me".to_string()]);
    assert!(api.sent_offline_forms().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn additional_fields_sent_once_after_first_confirmation() {
    let mut config = test_config();
    config.additional_fields.insert(900, "gold tier".to_string());
    let (session, api, _store) = setup(config);
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    session.send_text("one").await.unwrap();
    settle().await;
    let local_id = api.sent_texts().await[0].1;
    api.inject_event(TransportEvent::MessagesReceived {
        messages: vec![Message {
            id: 700,
            local_id,
            created_at: Utc::now(),
            direction: Direction::Client,
            payload: Payload::text("one", "one"),
            status: Some(SendStatus::Sent),
            agent: None,
        }],
        historical: false,
    })
    .await;
    settle().await;

    assert_eq!(
        api.sent_additional_fields().await,
        vec![vec![(900, "gold tier".to_string())]]
    );

    // a second confirmation does not resend them
    session.send_text("two").await.unwrap();
    settle().await;
    let local_id = api.sent_texts().await[1].1;
    api.inject_event(TransportEvent::MessagesReceived {
        messages: vec![Message {
            id: 701,
            local_id,
            created_at: Utc::now(),
            direction: Direction::Client,
            payload: Payload::text("two", "two"),
            status: Some(SendStatus::Sent),
            agent: None,
        }],
        historical: false,
    })
    .await;
    settle().await;
    assert_eq!(api.sent_additional_fields().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_additional_fields_push_rearms_on_next_confirmation() {
    let mut config = test_config();
    config.additional_fields.insert(900, "gold tier".to_string());
    let (session, api, _store) = setup(config);
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    api.fail_next_additional_fields();
    session.send_text("one").await.unwrap();
    settle().await;
    let local_id = api.sent_texts().await[0].1;
    api.inject_event(client_echo(700, local_id, "one")).await;
    settle().await;
    assert!(api.sent_additional_fields().await.is_empty());

    // the next confirmed send retries the push
    session.send_text("two").await.unwrap();
    settle().await;
    let local_id = api.sent_texts().await[1].1;
    api.inject_event(client_echo(701, local_id, "two")).await;
    settle().await;
    assert_eq!(
        api.sent_additional_fields().await,
        vec![vec![(900, "gold tier".to_string())]]
    );
}

#[tokio::test(start_paused = true)]
async fn init_message_sent_once_into_an_empty_chat() {
    let mut config = test_config();
    config.init_message = Some("auto hello".to_string());
    let (session, api, _store) = setup(config);
    session.connect().await.unwrap();

    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    let texts: Vec<String> = api.sent_texts().await.into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["auto hello".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn init_message_suppressed_when_chat_has_history() {
    let mut config = test_config();
    config.init_message = Some("auto hello".to_string());
    let (session, api, _store) = setup(config);
    session.connect().await.unwrap();

    let mut client_message = agent_message(10, "already talked");
    client_message.direction = Direction::Client;
    api.inject_event(inited(Some(1), vec![client_message])).await;
    settle().await;

    assert!(api.sent_texts().await.is_empty());
}

fn text_field(id: &str, required: bool) -> Field {
    Field::Text {
        id: id.to_string(),
        name: id.to_string(),
        required,
        kind: TextFieldKind::Plain,
        text: String::new(),
        has_error: false,
    }
}

#[tokio::test(start_paused = true)]
async fn form_load_send_and_reload_round_trip() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;

    api.set_loaded_fields(vec![text_field("topic", true)]).await;
    let mut form = session.load_form(&Form::new(42, vec![])).await.unwrap();
    assert_eq!(form.state, FormState::Loaded);

    // an empty required field fails validation and nothing goes out
    let invalid = session.send_form(&form).await.unwrap();
    assert!(invalid.has_errors());
    assert!(api.sent_forms().await.is_empty());

    form.fields[0].restore_value("billing question");
    let sent = session.send_form(&form).await.unwrap();
    assert_eq!(sent.state, FormState::Sent);
    assert_eq!(api.sent_forms().await.len(), 1);

    // a reload restores the saved value and the sent state
    let reloaded = session.load_form(&Form::new(42, vec![])).await.unwrap();
    assert_eq!(reloaded.state, FormState::Sent);
    assert_eq!(
        reloaded.fields[0].stored_value().as_deref(),
        Some("billing question")
    );
}

#[tokio::test(start_paused = true)]
async fn create_chat_persists_the_issued_token() {
    let (session, api, store) = setup(test_config());
    api.set_create_chat_token("out-of-band-token").await;

    let token = session.create_chat("channel-api-key").await.unwrap();
    assert_eq!(token, "out-of-band-token");

    let stored = store.get_config(&test_config()).await.unwrap().unwrap();
    assert_eq!(stored.client_token.as_deref(), Some("out-of-band-token"));
    let rx = session.events().client_token();
    assert_eq!(rx.borrow().as_deref(), Some("out-of-band-token"));
}

#[tokio::test(start_paused = true)]
async fn release_stops_the_event_pump() {
    let (session, api, _store) = setup(test_config());
    session.connect().await.unwrap();
    settle().await;

    session.release().await;
    settle().await;

    // events after release are not processed
    api.inject_event(inited(Some(1), vec![])).await;
    settle().await;
    assert!(session.events().client_token().borrow().is_none());
}
