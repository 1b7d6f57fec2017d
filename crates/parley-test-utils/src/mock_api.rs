// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockChatApi` implements `ChatApi` with injectable transport events and
//! captured outgoing traffic for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use parley_core::{
    ChatApi, ChatConfig, Feedback, Field, FileInfo, Form, Message, OfflineForm, ParleyError,
    TransportEvent,
};

/// A mock transport for testing.
///
/// Provides two sides:
/// - **events**: events injected via `inject_event()` are returned by `next_event()`
/// - **captures**: outgoing calls are recorded and retrievable for assertion
#[derive(Default)]
pub struct MockChatApi {
    events: Mutex<VecDeque<TransportEvent>>,
    notify: Notify,
    connected: AtomicBool,
    released: AtomicBool,

    connect_calls: AtomicUsize,
    init_calls: AtomicUsize,
    set_client_calls: AtomicUsize,
    sent_texts: Mutex<Vec<(String, i64)>>,
    sent_feedback: Mutex<Vec<(i64, Feedback)>>,
    uploaded_files: Mutex<Vec<(String, i64)>>,
    sent_offline_forms: Mutex<Vec<OfflineForm>>,
    sent_additional_fields: Mutex<Vec<Vec<(i64, String)>>>,
    sent_forms: Mutex<Vec<Form>>,
    page_requests: Mutex<Vec<i64>>,

    /// Scripted history pages, consumed front to back by
    /// `load_previous_messages`. Each entry is (page, more_remaining).
    pages: Mutex<VecDeque<(Vec<Message>, bool)>>,
    /// Artificial latency before `load_previous_messages` resolves, so
    /// tests can overlap concurrent callers deterministically.
    page_delay: Mutex<Option<std::time::Duration>>,
    /// Field definitions returned by `load_form`.
    loaded_fields: Mutex<Vec<Field>>,
    /// Token returned by `create_chat`.
    create_chat_token: Mutex<Option<String>>,

    fail_next_connect: AtomicBool,
    fail_next_send: AtomicBool,
    fail_next_additional_fields: AtomicBool,
    fail_next_upload: AtomicBool,
}

impl MockChatApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Injects an event into the queue returned by `next_event()`.
    pub async fn inject_event(&self, event: TransportEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Scripts the next history page for `load_previous_messages`.
    pub async fn push_page(&self, messages: Vec<Message>, more: bool) {
        self.pages.lock().await.push_back((messages, more));
    }

    pub async fn set_page_delay(&self, delay: std::time::Duration) {
        *self.page_delay.lock().await = Some(delay);
    }

    pub async fn set_loaded_fields(&self, fields: Vec<Field>) {
        *self.loaded_fields.lock().await = fields;
    }

    pub async fn set_create_chat_token(&self, token: &str) {
        *self.create_chat_token.lock().await = Some(token.to_string());
    }

    /// The next `connect` call fails with a transport error.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// The next `send_text` call fails with a transport error.
    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_additional_fields(&self) {
        self.fail_next_additional_fields.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_upload(&self) {
        self.fail_next_upload.store(true, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn set_client_calls(&self) -> usize {
        self.set_client_calls.load(Ordering::SeqCst)
    }

    pub async fn sent_texts(&self) -> Vec<(String, i64)> {
        self.sent_texts.lock().await.clone()
    }

    pub async fn sent_feedback(&self) -> Vec<(i64, Feedback)> {
        self.sent_feedback.lock().await.clone()
    }

    pub async fn uploaded_files(&self) -> Vec<(String, i64)> {
        self.uploaded_files.lock().await.clone()
    }

    pub async fn sent_offline_forms(&self) -> Vec<OfflineForm> {
        self.sent_offline_forms.lock().await.clone()
    }

    pub async fn sent_additional_fields(&self) -> Vec<Vec<(i64, String)>> {
        self.sent_additional_fields.lock().await.clone()
    }

    pub async fn sent_forms(&self) -> Vec<Form> {
        self.sent_forms.lock().await.clone()
    }

    pub async fn page_requests(&self) -> Vec<i64> {
        self.page_requests.lock().await.clone()
    }

    fn take_flag(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn connect(
        &self,
        _url: &str,
        _token: Option<&str>,
        _config: &ChatConfig,
    ) -> Result<(), ParleyError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_flag(&self.fail_next_connect) {
            return Err(ParleyError::transport("mock connect failure"));
        }
        self.connected.store(true, Ordering::SeqCst);
        self.inject_event(TransportEvent::Connected).await;
        Ok(())
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.inject_event(TransportEvent::Disconnected).await;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        loop {
            {
                let mut queue = self.events.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
            }
            if self.released.load(Ordering::SeqCst) {
                return None;
            }
            self.notify.notified().await;
        }
    }

    async fn init_chat(
        &self,
        _config: &ChatConfig,
        _token: Option<&str>,
    ) -> Result<(), ParleyError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, text: &str, local_id: i64) -> Result<(), ParleyError> {
        if Self::take_flag(&self.fail_next_send) {
            return Err(ParleyError::transport("mock send failure"));
        }
        if !self.is_connected() {
            return Err(ParleyError::Disconnected);
        }
        self.sent_texts
            .lock()
            .await
            .push((text.to_string(), local_id));
        Ok(())
    }

    async fn send_feedback(&self, message_id: i64, feedback: Feedback) -> Result<(), ParleyError> {
        if !self.is_connected() {
            return Err(ParleyError::Disconnected);
        }
        self.sent_feedback.lock().await.push((message_id, feedback));
        self.inject_event(TransportEvent::Feedback).await;
        Ok(())
    }

    async fn upload_file(
        &self,
        _config: &ChatConfig,
        _token: &str,
        file: &FileInfo,
        local_id: i64,
    ) -> Result<(), ParleyError> {
        if Self::take_flag(&self.fail_next_upload) {
            return Err(ParleyError::http("mock upload failure"));
        }
        self.uploaded_files
            .lock()
            .await
            .push((file.uri.clone(), local_id));
        Ok(())
    }

    async fn set_client(&self, _config: &ChatConfig) -> Result<(), ParleyError> {
        self.set_client_calls.fetch_add(1, Ordering::SeqCst);
        self.inject_event(TransportEvent::SetEmailSuccess).await;
        Ok(())
    }

    async fn send_offline_form(
        &self,
        _config: &ChatConfig,
        form: &OfflineForm,
    ) -> Result<(), ParleyError> {
        self.sent_offline_forms.lock().await.push(form.clone());
        Ok(())
    }

    async fn send_additional_fields(
        &self,
        _config: &ChatConfig,
        _token: &str,
        fields: Vec<(i64, String)>,
    ) -> Result<(), ParleyError> {
        if Self::take_flag(&self.fail_next_additional_fields) {
            return Err(ParleyError::http("mock additional fields failure"));
        }
        self.sent_additional_fields.lock().await.push(fields);
        Ok(())
    }

    async fn load_previous_messages(
        &self,
        _config: &ChatConfig,
        _token: &str,
        oldest_message_id: i64,
    ) -> Result<bool, ParleyError> {
        self.page_requests.lock().await.push(oldest_message_id);
        let delay = *self.page_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let page = self.pages.lock().await.pop_front();
        match page {
            Some((messages, more)) => {
                self.inject_event(TransportEvent::MessagesReceived {
                    messages,
                    historical: true,
                })
                .await;
                Ok(more)
            }
            None => Ok(false),
        }
    }

    async fn create_chat(
        &self,
        _config: &ChatConfig,
        _api_token: &str,
    ) -> Result<String, ParleyError> {
        self.create_chat_token
            .lock()
            .await
            .clone()
            .ok_or_else(|| ParleyError::http("mock create_chat not scripted"))
    }

    async fn load_form(
        &self,
        _config: &ChatConfig,
        _token: &str,
        _form: &Form,
    ) -> Result<Vec<Field>, ParleyError> {
        Ok(self.loaded_fields.lock().await.clone())
    }

    async fn send_form(
        &self,
        _config: &ChatConfig,
        _token: &str,
        form: &Form,
    ) -> Result<(), ParleyError> {
        self.sent_forms.lock().await.push(form.clone());
        Ok(())
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}
