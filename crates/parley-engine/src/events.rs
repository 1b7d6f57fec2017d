// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event fan-out: replay-last state streams, fire-only event streams, and
//! registered observers.
//!
//! State that has a "current value" (connection state, client token, the
//! message list, the last received message, the expected offline form)
//! goes over `watch` channels so a late subscriber immediately sees the
//! latest value; registering a callback observer replays the same values
//! before live updates begin. Point events (new message, update, removal,
//! feedback, exceptions) go over `broadcast` channels and are not
//! replayed.

use std::sync::{Arc, RwLock};

use tokio::sync::{broadcast, watch};

use parley_core::{ConnectionState, Message, OfflineFormSettings, ParleyError};

const EVENT_BUFFER: usize = 64;

/// Callback interface for consumers that prefer push delivery over
/// subscribing to channels. All methods default to no-ops.
pub trait ChatObserver: Send + Sync {
    fn on_connection_state(&self, _state: ConnectionState) {}
    fn on_client_token(&self, _token: &str) {}
    fn on_message_list(&self, _messages: &[Message]) {}
    fn on_message_received(&self, _message: &Message) {}
    fn on_new_message(&self, _message: &Message) {}
    fn on_message_updated(&self, _message: &Message) {}
    fn on_message_removed(&self, _message: &Message) {}
    fn on_offline_form_expected(&self, _settings: &OfflineFormSettings) {}
    fn on_feedback_received(&self) {}
    fn on_exception(&self, _error: &ParleyError) {}
}

/// Fan-out hub owned by the session. Cheap to share.
pub struct EventHub {
    connection_state: watch::Sender<ConnectionState>,
    client_token: watch::Sender<Option<String>>,
    message_list: watch::Sender<Vec<Message>>,
    message_received: watch::Sender<Option<Message>>,
    offline_form: watch::Sender<Option<OfflineFormSettings>>,
    new_message: broadcast::Sender<Message>,
    message_updated: broadcast::Sender<Message>,
    message_removed: broadcast::Sender<Message>,
    feedback: broadcast::Sender<()>,
    exceptions: broadcast::Sender<Arc<ParleyError>>,
    observers: RwLock<Vec<Arc<dyn ChatObserver>>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            // A fresh session is inherently on its way to connecting; every
            // later connect surfaces as a reconnect.
            connection_state: watch::Sender::new(ConnectionState::Connecting),
            client_token: watch::Sender::new(None),
            message_list: watch::Sender::new(Vec::new()),
            message_received: watch::Sender::new(None),
            offline_form: watch::Sender::new(None),
            new_message: broadcast::Sender::new(EVENT_BUFFER),
            message_updated: broadcast::Sender::new(EVENT_BUFFER),
            message_removed: broadcast::Sender::new(EVENT_BUFFER),
            feedback: broadcast::Sender::new(EVENT_BUFFER),
            exceptions: broadcast::Sender::new(EVENT_BUFFER),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer, replaying the current value of every state
    /// stream to it first.
    pub fn add_observer(&self, observer: Arc<dyn ChatObserver>) {
        observer.on_connection_state(*self.connection_state.borrow());
        if let Some(token) = self.client_token.borrow().as_deref() {
            observer.on_client_token(token);
        }
        observer.on_message_list(&self.message_list.borrow());
        if let Some(message) = self.message_received.borrow().as_ref() {
            observer.on_message_received(message);
        }
        if let Some(settings) = self.offline_form.borrow().as_ref() {
            observer.on_offline_form_expected(settings);
        }
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    pub fn remove_observer(&self, observer: &Arc<dyn ChatObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.retain(|o| !Arc::ptr_eq(o, observer));
        }
    }

    pub fn clear_observers(&self) {
        if let Ok(mut observers) = self.observers.write() {
            observers.clear();
        }
    }

    fn each_observer(&self, f: impl Fn(&dyn ChatObserver)) {
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                f(observer.as_ref());
            }
        }
    }

    // --- Replay-last streams ---

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection_state.subscribe()
    }

    pub fn client_token(&self) -> watch::Receiver<Option<String>> {
        self.client_token.subscribe()
    }

    pub fn message_list(&self) -> watch::Receiver<Vec<Message>> {
        self.message_list.subscribe()
    }

    /// Every message as it lands in the list, one at a time, including the
    /// init-snapshot replay. Late subscribers see the most recent one.
    pub fn message_received(&self) -> watch::Receiver<Option<Message>> {
        self.message_received.subscribe()
    }

    pub fn offline_form_expected(&self) -> watch::Receiver<Option<OfflineFormSettings>> {
        self.offline_form.subscribe()
    }

    pub fn current_offline_form(&self) -> Option<OfflineFormSettings> {
        self.offline_form.borrow().clone()
    }

    pub fn current_connection_state(&self) -> ConnectionState {
        *self.connection_state.borrow()
    }

    // --- Fire-only streams ---

    pub fn new_messages(&self) -> broadcast::Receiver<Message> {
        self.new_message.subscribe()
    }

    pub fn message_updates(&self) -> broadcast::Receiver<Message> {
        self.message_updated.subscribe()
    }

    pub fn message_removals(&self) -> broadcast::Receiver<Message> {
        self.message_removed.subscribe()
    }

    pub fn feedback_acks(&self) -> broadcast::Receiver<()> {
        self.feedback.subscribe()
    }

    pub fn exceptions(&self) -> broadcast::Receiver<Arc<ParleyError>> {
        self.exceptions.subscribe()
    }

    // --- Emitters (session-internal) ---

    pub(crate) fn set_connection_state(&self, state: ConnectionState) {
        self.connection_state.send_replace(state);
        self.each_observer(|o| o.on_connection_state(state));
    }

    pub(crate) fn set_client_token(&self, token: &str) {
        self.client_token.send_replace(Some(token.to_string()));
        self.each_observer(|o| o.on_client_token(token));
    }

    pub(crate) fn set_message_list(&self, messages: Vec<Message>) {
        self.each_observer(|o| o.on_message_list(&messages));
        self.message_list.send_replace(messages);
    }

    pub(crate) fn emit_message_received(&self, message: &Message) {
        self.each_observer(|o| o.on_message_received(message));
        self.message_received.send_replace(Some(message.clone()));
    }

    pub(crate) fn set_offline_form(&self, settings: Option<OfflineFormSettings>) {
        if let Some(settings) = &settings {
            self.each_observer(|o| o.on_offline_form_expected(settings));
        }
        self.offline_form.send_replace(settings);
    }

    pub(crate) fn emit_new_message(&self, message: &Message) {
        self.each_observer(|o| o.on_new_message(message));
        let _ = self.new_message.send(message.clone());
    }

    pub(crate) fn emit_message_updated(&self, message: &Message) {
        self.each_observer(|o| o.on_message_updated(message));
        let _ = self.message_updated.send(message.clone());
    }

    pub(crate) fn emit_message_removed(&self, message: &Message) {
        self.each_observer(|o| o.on_message_removed(message));
        let _ = self.message_removed.send(message.clone());
    }

    pub(crate) fn emit_feedback(&self) {
        self.each_observer(|o| o.on_feedback_received());
        let _ = self.feedback.send(());
    }

    pub(crate) fn emit_exception(&self, error: Arc<ParleyError>) {
        self.each_observer(|o| o.on_exception(&error));
        let _ = self.exceptions.send(Arc::clone(&error));
    }
}
