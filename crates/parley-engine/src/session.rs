// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat session state machine.
//!
//! Owns the transport and cache store, consumes transport events on a
//! background task, and maintains the ordered message list plus the
//! connection lifecycle: reconnection, token recovery, first-message
//! gating, unsent-message resend, and history pagination.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_codec::{new_client_file, new_client_text};
use parley_core::{
    ACTIVE_STATUSES, CacheStore, ChatApi, ChatConfig, ChatInit, ConnectionState, Direction,
    Feedback, FileInfo, Form, FormState, Message, MessageDraft, OfflineForm, OfflineWorkType,
    ParleyError, Payload, SavedFormValues, SendStatus, TransportEvent,
};

use crate::events::{ChatObserver, EventHub};
use crate::gate::FirstMessageGate;

/// Delay before a single automatic reconnect attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Grace period between an active init and the gate opening.
const FIRST_MESSAGE_GRACE: Duration = Duration::from_secs(1);
/// Debounce before the additional profile fields are pushed.
const ADDITIONAL_FIELDS_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldsPhase {
    Idle,
    Scheduled,
    Sent,
}

/// Outcome shared between concurrent `load_previous_messages_page` callers:
/// `None` while the request is in flight.
type PageOutcome = Option<Result<bool, Arc<ParleyError>>>;

#[derive(Default)]
struct SessionState {
    messages: Vec<Message>,
    inited: bool,
    init_message_sent: bool,
}

/// One chat session bound to a config, a transport, and a cache store.
///
/// Construct with [`ChatSession::new`], which also starts the event pump.
/// All methods are safe to call concurrently.
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    store: Arc<dyn CacheStore>,
    hub: Arc<EventHub>,
    config: Mutex<ChatConfig>,
    state: Mutex<SessionState>,
    gate: FirstMessageGate,
    connect_lock: Mutex<()>,
    page_flight: Mutex<Option<watch::Receiver<PageOutcome>>>,
    history_exhausted: AtomicBool,
    manual_disconnect: AtomicBool,
    fields_phase: Arc<Mutex<FieldsPhase>>,
    queued_chat_text: Mutex<Option<String>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl ChatSession {
    /// Validates the config, spawns the event pump, and returns the session.
    pub fn new(
        config: ChatConfig,
        api: Arc<dyn ChatApi>,
        store: Arc<dyn CacheStore>,
    ) -> Result<Arc<Self>, ParleyError> {
        config.validate()?;
        let session = Arc::new(Self {
            api,
            store,
            hub: Arc::new(EventHub::new()),
            config: Mutex::new(config),
            state: Mutex::new(SessionState::default()),
            gate: FirstMessageGate::new(),
            connect_lock: Mutex::new(()),
            page_flight: Mutex::new(None),
            history_exhausted: AtomicBool::new(false),
            manual_disconnect: AtomicBool::new(false),
            fields_phase: Arc::new(Mutex::new(FieldsPhase::Idle)),
            queued_chat_text: Mutex::new(None),
            reconnect_task: Mutex::new(None),
            shutdown: CancellationToken::new(),
        });
        tokio::spawn(Self::event_loop(Arc::clone(&session)));
        Ok(session)
    }

    /// The session's event hub for subscriptions and observers.
    pub fn events(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Registers a callback observer. The current value of every state
    /// stream is replayed to it before live updates begin.
    pub fn add_observer(&self, observer: Arc<dyn ChatObserver>) {
        self.hub.add_observer(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn ChatObserver>) {
        self.hub.remove_observer(observer);
    }

    // --- Connection lifecycle ---

    /// Opens the socket. Idempotent: a connected session is left alone.
    /// Resolves the client token from the config or from a previously
    /// persisted configuration with the same identity.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ParleyError> {
        self.manual_disconnect.store(false, Ordering::SeqCst);
        let via = match self.hub.current_connection_state() {
            ConnectionState::Connecting => ConnectionState::Connecting,
            _ => ConnectionState::Reconnecting,
        };
        self.connect_inner(via).await
    }

    async fn connect_inner(self: &Arc<Self>, via: ConnectionState) -> Result<(), ParleyError> {
        let _guard = self.connect_lock.lock().await;
        if self.api.is_connected() {
            return Ok(());
        }
        self.cancel_reconnect().await;

        let config = {
            let mut config = self.config.lock().await;
            if config.client_token.is_none()
                && let Some(stored) = self.store.get_config(&config).await?
            {
                debug!("restored client token for returning identity");
                config.client_token = stored.client_token;
            }
            config.clone()
        };

        self.gate.arm().await;
        self.hub.set_connection_state(via);
        match self
            .api
            .connect(&config.url_chat, config.client_token.as_deref(), &config)
            .await
        {
            Ok(()) => {
                info!(url = %config.url_chat, "session connected");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.hub.set_connection_state(ConnectionState::Disconnected);
                self.hub.emit_exception(Arc::new(e.replicate()));
                self.schedule_reconnect().await;
                Err(e)
            }
        }
    }

    /// Closes the socket without releasing the session. No automatic
    /// reconnect follows a manual disconnect.
    pub async fn disconnect(&self) {
        self.manual_disconnect.store(true, Ordering::SeqCst);
        self.cancel_reconnect().await;
        self.api.disconnect().await;
    }

    /// Permanently shuts the session down: stops the event pump, releases
    /// the transport, and drops all observers.
    pub async fn release(&self) {
        self.shutdown.cancel();
        self.cancel_reconnect().await;
        self.gate.release_now().await;
        self.api.release().await;
        self.hub.set_connection_state(ConnectionState::Disconnected);
        self.hub.clear_observers();
        info!("session released");
    }

    async fn schedule_reconnect(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() || self.manual_disconnect.load(Ordering::SeqCst) {
            return;
        }
        let mut slot = self.reconnect_task.lock().await;
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        debug!(delay_secs = RECONNECT_DELAY.as_secs(), "reconnect scheduled");
        *slot = Some(tokio::spawn(Arc::clone(self).reconnect_after_delay()));
    }

    /// Boxed so the spawned task's future type does not embed
    /// `connect_inner`'s own future, which awaits this scheduler on failure.
    fn reconnect_after_delay(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            tokio::select! {
                () = self.shutdown.cancelled() => return,
                () = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
            let _ = self.connect_inner(ConnectionState::Reconnecting).await;
        })
    }

    async fn cancel_reconnect(&self) {
        if let Some(task) = self.reconnect_task.lock().await.take() {
            task.abort();
        }
    }

    // --- Event pump ---

    async fn event_loop(self: Arc<Self>) {
        loop {
            let event = tokio::select! {
                () = self.shutdown.cancelled() => break,
                event = self.api.next_event() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.handle_event(event).await;
        }
        debug!("event pump stopped");
    }

    async fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.hub.set_connection_state(ConnectionState::Connected);
            }
            TransportEvent::Disconnected => {
                self.hub.set_connection_state(ConnectionState::Disconnected);
                self.schedule_reconnect().await;
            }
            TransportEvent::TokenError => {
                // Recovered by repeating the init handshake with the known
                // token on the live socket, not by a full reconnect.
                warn!("session token rejected, re-issuing init");
                let config = self.config.lock().await.clone();
                if let Err(e) = self
                    .api
                    .init_chat(&config, config.client_token.as_deref())
                    .await
                {
                    self.hub.emit_exception(Arc::new(e));
                }
            }
            TransportEvent::ChatInited(init) => self.handle_inited(init).await,
            TransportEvent::OfflineForm { settings, init } => {
                self.hub.set_offline_form(Some(settings));
                self.handle_inited(init).await;
            }
            TransportEvent::MessagesReceived {
                messages,
                historical,
            } => self.apply_messages(messages, historical).await,
            TransportEvent::MessageUpdated(message) => self.apply_update(message).await,
            TransportEvent::Feedback => self.hub.emit_feedback(),
            TransportEvent::SetEmailSuccess => self.flush_queued_chat_text().await,
            TransportEvent::Error(error) => self.hub.emit_exception(error),
        }
    }

    async fn handle_inited(self: &Arc<Self>, init: ChatInit) {
        let active = init
            .status
            .is_some_and(|status| ACTIVE_STATUSES.contains(&status));
        info!(status = ?init.status, active, "chat initialized");

        // Persist the issued token for this identity.
        let config = {
            let mut config = self.config.lock().await;
            config.client_token = Some(init.token.clone());
            config.clone()
        };
        if let Err(e) = self.store.set_config(&config).await {
            self.hub.emit_exception(Arc::new(e));
        }
        self.hub.set_client_token(&init.token);

        // The server snapshot is authoritative; locally pending messages
        // not present in it are appended and resent.
        let pending = match self.store.not_sent_messages().await {
            Ok(pending) => pending,
            Err(e) => {
                self.hub.emit_exception(Arc::new(e));
                Vec::new()
            }
        };
        let (resend, confirmed) = {
            let mut st = self.state.lock().await;
            st.inited = true;
            let previous = std::mem::replace(&mut st.messages, init.messages.clone());
            let mut resend: Vec<Message> = Vec::new();
            let mut confirmed: Vec<i64> = Vec::new();
            for p in pending {
                if st.messages.iter().any(|m| m.same_entry(&p)) {
                    // The snapshot carries the confirmed form; the shadow
                    // row has served its purpose.
                    confirmed.push(p.local_id);
                    continue;
                }
                // A pending message still marked `Sending` in the previous
                // list has a live delivery attempt (parked at the gate or
                // awaiting its echo); resending it would duplicate it.
                let in_flight = previous
                    .iter()
                    .any(|m| m.same_entry(&p) && m.status == Some(SendStatus::Sending));
                if in_flight {
                    st.messages.push(p);
                } else {
                    let p = p.with_status(SendStatus::Sending);
                    st.messages.push(p.clone());
                    resend.push(p);
                }
            }
            for message in &st.messages {
                self.hub.emit_message_received(message);
            }
            self.hub.set_message_list(st.messages.clone());
            (resend, confirmed)
        };

        for local_id in confirmed {
            if let Err(e) = self.store.remove_not_sent(local_id).await {
                self.hub.emit_exception(Arc::new(e));
            }
        }

        if active {
            self.gate.release_after(FIRST_MESSAGE_GRACE).await;
        }

        for message in resend {
            let session = Arc::clone(self);
            tokio::spawn(async move {
                let _ = session.deliver(message).await;
            });
        }

        if init.waiting_email {
            let session = Arc::clone(self);
            let config = config.clone();
            tokio::spawn(async move {
                if let Err(e) = session.api.set_client(&config).await {
                    session.hub.emit_exception(Arc::new(e));
                }
            });
        }

        self.send_init_message_if_needed(&config).await;
        if active {
            self.flush_queued_chat_text().await;
        }
    }

    /// Sends the configured init message once, and only into a chat that
    /// has no client messages yet.
    async fn send_init_message_if_needed(self: &Arc<Self>, config: &ChatConfig) {
        let Some(text) = config.init_message.clone() else {
            return;
        };
        {
            let mut st = self.state.lock().await;
            let has_client_messages = st
                .messages
                .iter()
                .any(|m| m.direction == Direction::Client);
            if st.init_message_sent || has_client_messages {
                return;
            }
            st.init_message_sent = true;
        }
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let _ = session.send_text(&text).await;
        });
    }

    async fn flush_queued_chat_text(self: &Arc<Self>) {
        let Some(text) = self.queued_chat_text.lock().await.take() else {
            return;
        };
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let _ = session.send_text(&text).await;
        });
    }

    // --- Incoming messages ---

    async fn apply_messages(&self, incoming: Vec<Message>, historical: bool) {
        let mut st = self.state.lock().await;
        if historical {
            let mut page: Vec<Message> = incoming
                .into_iter()
                .filter(|m| !st.messages.iter().any(|e| e.same_entry(m)))
                .collect();
            for message in &page {
                self.hub.emit_message_received(message);
            }
            page.append(&mut st.messages);
            st.messages = page;
        } else {
            for message in incoming {
                match st.messages.iter().position(|e| e.same_entry(&message)) {
                    Some(pos) => {
                        // A client message arriving over the wire is the
                        // server echo: the entry is confirmed in place.
                        st.messages[pos] = message.clone();
                        self.hub.emit_message_received(&message);
                        self.hub.emit_message_updated(&message);
                        drop(st);
                        self.confirm_delivery(&message).await;
                        st = self.state.lock().await;
                    }
                    None => {
                        st.messages.push(message.clone());
                        self.hub.emit_message_received(&message);
                        self.hub.emit_new_message(&message);
                    }
                }
            }
        }
        self.hub.set_message_list(st.messages.clone());
    }

    async fn apply_update(&self, message: Message) {
        let mut st = self.state.lock().await;
        let Some(pos) = st.messages.iter().position(|e| e.same_entry(&message)) else {
            return;
        };
        st.messages[pos] = message.clone();
        self.hub.emit_message_updated(&message);
        self.hub.set_message_list(st.messages.clone());
        drop(st);
        self.confirm_delivery(&message).await;
    }

    /// Server confirmation of a client message: drop the shadow copy and
    /// any cached attachment, then arm the additional-fields push.
    async fn confirm_delivery(&self, message: &Message) {
        if message.direction != Direction::Client {
            return;
        }
        let pending = self.store.not_sent_messages().await.unwrap_or_default();
        let Some(entry) = pending.iter().find(|p| p.local_id == message.local_id) else {
            return;
        };
        if let Payload::File(file) = &entry.payload
            && let Err(e) = self.store.remove_cached_file(&file.content).await
        {
            debug!(error = %e, "cached attachment cleanup failed");
        }
        if let Err(e) = self.store.remove_not_sent(message.local_id).await {
            self.hub.emit_exception(Arc::new(e));
        }
        self.arm_additional_fields().await;
    }

    // --- Outgoing messages ---

    /// Sends a text message. The message appears in the list immediately
    /// with `Sending` status; failure flips it to `SendFailed` and the
    /// error is both raised here and pushed to the exception stream.
    pub async fn send_text(&self, text: &str) -> Result<(), ParleyError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let local_id = self.store.next_local_id().await?;
        let message = new_client_text(local_id, text);
        self.push_local(&message).await?;
        self.deliver(message).await
    }

    /// Sends a file attachment. The source is copied into the app-private
    /// cache first so the caller's file need not outlive the upload.
    pub async fn send_file(&self, file: FileInfo) -> Result<(), ParleyError> {
        let local_id = self.store.next_local_id().await?;
        let cached = self.store.cache_file(&file.uri).await?;
        let file = FileInfo {
            uri: cached,
            ..file
        };
        let message = new_client_file(local_id, &file);
        self.push_local(&message).await?;
        self.deliver(message).await
    }

    /// Sends a batch of file attachments. Each file is optimistically
    /// emitted and delivered independently of the others; every delivery
    /// still respects the first-message gate on its own. The first failure
    /// is reported after all deliveries have settled.
    pub async fn send_files(self: &Arc<Self>, files: Vec<FileInfo>) -> Result<(), ParleyError> {
        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let session = Arc::clone(self);
            handles.push(tokio::spawn(async move { session.send_file(file).await }));
        }
        let mut first_error = None;
        for handle in handles {
            let result = handle
                .await
                .unwrap_or_else(|e| Err(ParleyError::Internal(format!("file send task: {e}"))));
            if let Err(e) = result
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Retries a message that previously failed to send.
    pub async fn send_again(&self, local_id: i64) -> Result<(), ParleyError> {
        let message = {
            let st = self.state.lock().await;
            st.messages
                .iter()
                .find(|m| m.local_id == local_id && m.status == Some(SendStatus::SendFailed))
                .cloned()
        };
        let Some(message) = message else {
            return Err(ParleyError::DataNotFound(format!(
                "no failed message with local id {local_id}"
            )));
        };
        let message = message.with_status(SendStatus::Sending);
        self.replace_local(&message).await;
        self.deliver(message).await
    }

    /// Removes a message that was never confirmed by the server. Confirmed
    /// messages cannot be removed.
    pub async fn remove_message(&self, local_id: i64) -> Result<(), ParleyError> {
        let pending = self.store.not_sent_messages().await?;
        if !pending.iter().any(|m| m.local_id == local_id) {
            return Err(ParleyError::DataNotFound(format!(
                "message {local_id} is not pending"
            )));
        }
        self.store.remove_not_sent(local_id).await?;
        let mut st = self.state.lock().await;
        if let Some(pos) = st.messages.iter().position(|m| m.local_id == local_id) {
            let removed = st.messages.remove(pos);
            self.hub.emit_message_removed(&removed);
            self.hub.set_message_list(st.messages.clone());
        }
        Ok(())
    }

    async fn push_local(&self, message: &Message) -> Result<(), ParleyError> {
        if self.config.lock().await.cache_messages {
            self.store.add_not_sent(message).await?;
        }
        let mut st = self.state.lock().await;
        st.messages.push(message.clone());
        self.hub.emit_message_received(message);
        self.hub.emit_new_message(message);
        self.hub.set_message_list(st.messages.clone());
        Ok(())
    }

    async fn replace_local(&self, message: &Message) {
        if self.config.lock().await.cache_messages {
            if let Err(e) = self.store.update_not_sent(message).await {
                self.hub.emit_exception(Arc::new(e));
            }
        }
        let mut st = self.state.lock().await;
        if let Some(pos) = st.messages.iter().position(|m| m.same_entry(message)) {
            st.messages[pos] = message.clone();
            self.hub.emit_message_updated(message);
            self.hub.set_message_list(st.messages.clone());
        }
    }

    async fn deliver(&self, message: Message) -> Result<(), ParleyError> {
        self.gate.pass().await;
        let result = match &message.payload {
            Payload::Text { text, .. } => self.api.send_text(text, message.local_id).await,
            Payload::File(file) => {
                let (config, token) = self.config_and_token().await?;
                let info = FileInfo {
                    uri: file.content.clone(),
                    mime: file.mime.clone(),
                    name: file.name.clone(),
                };
                self.api
                    .upload_file(&config, &token, &info, message.local_id)
                    .await
            }
        };
        match result {
            Ok(()) => {
                // A successful wire send proves the session is established;
                // the gate opens after the grace period.
                self.gate.release_after(FIRST_MESSAGE_GRACE).await;
                Ok(())
            }
            Err(e) => {
                warn!(local_id = message.local_id, error = %e, "send failed");
                self.gate.release_now().await;
                let failed = message.with_status(SendStatus::SendFailed);
                self.replace_local(&failed).await;
                self.hub.emit_exception(Arc::new(e.replicate()));
                Err(e)
            }
        }
    }

    // --- Feedback ---

    /// Submits feedback for an agent message. The local copy is updated
    /// optimistically and rolled back if the submission fails.
    pub async fn send_feedback(
        &self,
        message_id: i64,
        feedback: Feedback,
    ) -> Result<(), ParleyError> {
        let previous = {
            let mut st = self.state.lock().await;
            let Some(pos) = st
                .messages
                .iter()
                .position(|m| m.id == message_id && m.direction == Direction::Agent)
            else {
                return Err(ParleyError::DataNotFound(format!(
                    "no agent message with id {message_id}"
                )));
            };
            let previous = st.messages[pos].clone();
            if let Payload::Text {
                feedback: slot,
                feedback_needed,
                ..
            } = &mut st.messages[pos].payload
            {
                *slot = Some(feedback);
                *feedback_needed = false;
            }
            let updated = st.messages[pos].clone();
            self.hub.emit_message_updated(&updated);
            self.hub.set_message_list(st.messages.clone());
            previous
        };

        match self.api.send_feedback(message_id, feedback).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.replace_local(&previous).await;
                self.hub.emit_exception(Arc::new(e.replicate()));
                Err(e)
            }
        }
    }

    // --- Drafts ---

    pub async fn set_draft(&self, draft: MessageDraft) -> Result<(), ParleyError> {
        self.store.set_draft(&draft).await
    }

    pub async fn get_draft(&self) -> Result<MessageDraft, ParleyError> {
        self.store.get_draft().await
    }

    /// Sends the stored draft: text first, then each attachment. The draft
    /// is consumed atomically, so a concurrent `send_draft` cannot send it
    /// twice.
    pub async fn send_draft(&self) -> Result<(), ParleyError> {
        let draft = self.store.take_draft().await?;
        let mut first_error = None;
        if !draft.text.trim().is_empty()
            && let Err(e) = self.send_text(&draft.text).await
        {
            first_error = Some(e);
        }
        for file in draft.files {
            if let Err(e) = self.send_file(file).await
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    // --- History pagination ---

    /// Loads the page of messages preceding the oldest known server
    /// message. Single-flight: concurrent callers share the one in-flight
    /// request and all resolve to its outcome. Returns whether more pages
    /// remain; once history is exhausted the cached `false` is returned
    /// without touching the network.
    pub async fn load_previous_messages_page(&self) -> Result<bool, ParleyError> {
        if self.history_exhausted.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut rx = {
            let mut flight = self.page_flight.lock().await;
            match flight.clone() {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    *flight = Some(rx);
                    drop(flight);
                    let result = self.fetch_previous_page().await;
                    let _ = tx.send(Some(match &result {
                        Ok(more) => Ok(*more),
                        Err(e) => Err(Arc::new(e.replicate())),
                    }));
                    *self.page_flight.lock().await = None;
                    return result;
                }
            }
        };
        loop {
            let outcome = rx.borrow_and_update().clone();
            if let Some(outcome) = outcome {
                return outcome.map_err(|e| e.replicate());
            }
            if rx.changed().await.is_err() {
                // leader dropped without publishing; fall back to the flag
                return Ok(!self.history_exhausted.load(Ordering::SeqCst));
            }
        }
    }

    async fn fetch_previous_page(&self) -> Result<bool, ParleyError> {
        let oldest = {
            let st = self.state.lock().await;
            st.messages.iter().map(|m| m.id).filter(|id| *id > 0).min()
        };
        let Some(oldest) = oldest else {
            return Ok(false);
        };
        let (config, token) = self.config_and_token().await?;
        let more = self
            .api
            .load_previous_messages(&config, &token, oldest)
            .await?;
        if !more {
            self.history_exhausted.store(true, Ordering::SeqCst);
        }
        Ok(more)
    }

    // --- Offline form ---

    /// Submits an offline form. With the callback-with-chat policy the
    /// form is flattened to text and routed into the chat itself (queued
    /// until the session is ready); otherwise it goes to the HTTP endpoint.
    pub async fn send_offline_form(self: &Arc<Self>, form: &OfflineForm) -> Result<(), ParleyError> {
        let work_type = self
            .hub
            .current_offline_form()
            .map(|s| s.work_type)
            .unwrap_or(OfflineWorkType::AlwaysEnabledCallbackWithoutChat);
        match work_type {
            OfflineWorkType::AlwaysEnabledCallbackWithChat => {
                *self.queued_chat_text.lock().await = Some(form.to_chat_text());
                if self.state.lock().await.inited && self.api.is_connected() {
                    self.flush_queued_chat_text().await;
                    Ok(())
                } else {
                    self.connect().await
                }
            }
            _ => {
                let config = self.config.lock().await.clone();
                self.api.send_offline_form(&config, form).await
            }
        }
    }

    // --- Client profile and chat creation ---

    /// Pushes the configured client profile to the server.
    pub async fn set_client(&self) -> Result<(), ParleyError> {
        let config = self.config.lock().await.clone();
        self.api.set_client(&config).await
    }

    /// Creates a chat out of band using a channel API token and stores the
    /// issued client token for the next connect.
    pub async fn create_chat(&self, api_token: &str) -> Result<String, ParleyError> {
        let config = self.config.lock().await.clone();
        let token = self.api.create_chat(&config, api_token).await?;
        {
            let mut config = self.config.lock().await;
            config.client_token = Some(token.clone());
            self.store.set_config(&config).await?;
        }
        self.hub.set_client_token(&token);
        Ok(token)
    }

    // --- Dynamic forms ---

    /// Loads server-side field definitions for a form and restores any
    /// locally saved values into them.
    pub async fn load_form(&self, form: &Form) -> Result<Form, ParleyError> {
        let (config, token) = self.config_and_token().await?;
        let fields = self.api.load_form(&config, &token, form).await?;
        let mut loaded = Form {
            id: form.id,
            fields,
            state: FormState::Loaded,
        };
        if let Some(saved) = self.store.load_form_values(form.id).await? {
            for field in &mut loaded.fields {
                if let Some(value) = saved.values.get(field.id()) {
                    field.restore_value(value);
                }
            }
            if saved.sent {
                loaded.state = FormState::Sent;
            }
        }
        Ok(loaded)
    }

    /// Persists the form's current field values, surviving restarts.
    pub async fn save_form(&self, form: &Form) -> Result<(), ParleyError> {
        let values = flatten_form_values(form);
        self.store.save_form_values(form.id, &values).await
    }

    /// Validates and submits a form. A form failing validation is returned
    /// with its error flags set and nothing is sent.
    pub async fn send_form(&self, form: &Form) -> Result<Form, ParleyError> {
        let validated = form.validate();
        if validated.has_errors() {
            return Ok(validated);
        }
        let sending = Form {
            state: FormState::Sending,
            ..validated
        };
        let (config, token) = self.config_and_token().await?;
        self.api.send_form(&config, &token, &sending).await?;
        let sent = Form {
            state: FormState::Sent,
            ..sending
        };
        self.save_form(&sent).await?;
        Ok(sent)
    }

    // --- Additional profile fields ---

    /// Schedules the one-time additional-fields push after the first
    /// confirmed send. Re-armed if the push fails.
    async fn arm_additional_fields(&self) {
        let fields = {
            let config = self.config.lock().await;
            let mut fields: Vec<(i64, String)> = config
                .additional_fields
                .iter()
                .map(|(id, value)| (*id, value.clone()))
                .chain(
                    config
                        .additional_nested_fields
                        .iter()
                        .flatten()
                        .map(|(id, value)| (*id, value.clone())),
                )
                .collect();
            fields.sort_by_key(|(id, _)| *id);
            fields
        };
        if fields.is_empty() {
            return;
        }
        {
            let mut phase = self.fields_phase.lock().await;
            if *phase != FieldsPhase::Idle {
                return;
            }
            *phase = FieldsPhase::Scheduled;
        }

        let Ok((config, token)) = self.config_and_token().await else {
            *self.fields_phase.lock().await = FieldsPhase::Idle;
            return;
        };

        let api = Arc::clone(&self.api);
        let hub = Arc::clone(&self.hub);
        let shutdown = self.shutdown.clone();
        let phase = Arc::clone(&self.fields_phase);
        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(ADDITIONAL_FIELDS_DELAY) => {}
            }
            match api.send_additional_fields(&config, &token, fields).await {
                Ok(()) => *phase.lock().await = FieldsPhase::Sent,
                Err(e) => {
                    warn!(error = %e, "additional fields push failed, re-armed");
                    hub.emit_exception(Arc::new(e));
                    *phase.lock().await = FieldsPhase::Idle;
                }
            }
        });
    }

    async fn config_and_token(&self) -> Result<(ChatConfig, String), ParleyError> {
        let config = self.config.lock().await.clone();
        let token = config
            .client_token
            .clone()
            .ok_or_else(|| ParleyError::DataNotFound("no client token issued yet".into()))?;
        Ok((config, token))
    }
}

/// Flattens a form's field values into the persisted map.
fn flatten_form_values(form: &Form) -> SavedFormValues {
    let values = form
        .fields
        .iter()
        .filter_map(|field| {
            field
                .stored_value()
                .map(|value| (field.id().to_string(), value))
        })
        .collect();
    SavedFormValues {
        values,
        sent: form.state == FormState::Sent,
    }
}

