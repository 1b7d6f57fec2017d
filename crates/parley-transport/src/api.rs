// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`ChatApi`] implementation backed by the socket plus HTTP fallback.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use parley_codec::{convert_batch, forms};
use parley_core::{
    ChatApi, ChatConfig, Feedback, Field, FileInfo, Form, OfflineForm, ParleyError, TransportEvent,
};

use crate::frames::OutgoingFrame;
use crate::http::HttpApi;
use crate::socket::Socket;

/// Production transport adapter: one socket connection, one HTTP client,
/// and a single consumer-side event queue.
pub struct ServerApi {
    socket: Socket,
    http: HttpApi,
    event_tx: mpsc::Sender<TransportEvent>,
    event_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    shutdown: CancellationToken,
}

impl ServerApi {
    pub fn new() -> Result<Self, ParleyError> {
        let (event_tx, event_rx) = mpsc::channel(256);
        Ok(Self {
            socket: Socket::new(event_tx.clone()),
            http: HttpApi::new()?,
            event_tx,
            event_rx: Mutex::new(event_rx),
            shutdown: CancellationToken::new(),
        })
    }
}

#[async_trait]
impl ChatApi for ServerApi {
    async fn connect(
        &self,
        url: &str,
        token: Option<&str>,
        config: &ChatConfig,
    ) -> Result<(), ParleyError> {
        if self.shutdown.is_cancelled() {
            return Err(ParleyError::transport("transport already released"));
        }
        self.socket.connect(url, token, config).await
    }

    async fn disconnect(&self) {
        self.socket.disconnect().await;
    }

    fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        let mut rx = self.event_rx.lock().await;
        tokio::select! {
            () = self.shutdown.cancelled() => None,
            event = rx.recv() => event,
        }
    }

    async fn init_chat(&self, config: &ChatConfig, token: Option<&str>) -> Result<(), ParleyError> {
        self.socket
            .send(OutgoingFrame::ChatInit {
                token: token.map(str::to_string),
                company_id: config.company_id.clone(),
                channel_id: config.channel_id.clone(),
            })
            .await
    }

    async fn send_text(&self, text: &str, local_id: i64) -> Result<(), ParleyError> {
        self.socket
            .send(OutgoingFrame::MessageSend {
                text: text.to_string(),
                message_id: local_id,
            })
            .await
    }

    async fn send_feedback(&self, message_id: i64, feedback: Feedback) -> Result<(), ParleyError> {
        self.socket
            .send(OutgoingFrame::FeedbackSend {
                message_id,
                data: feedback.to_string(),
            })
            .await
    }

    async fn upload_file(
        &self,
        config: &ChatConfig,
        token: &str,
        file: &FileInfo,
        local_id: i64,
    ) -> Result<(), ParleyError> {
        self.http.upload_file(config, token, file, local_id).await
    }

    async fn set_client(&self, config: &ChatConfig) -> Result<(), ParleyError> {
        let token = config
            .client_token
            .as_deref()
            .ok_or_else(|| ParleyError::Config("client token required to set client".into()))?;
        self.http.set_client(config, token).await
    }

    async fn send_offline_form(
        &self,
        config: &ChatConfig,
        form: &OfflineForm,
    ) -> Result<(), ParleyError> {
        self.http.send_offline_form(config, form).await
    }

    async fn send_additional_fields(
        &self,
        config: &ChatConfig,
        token: &str,
        fields: Vec<(i64, String)>,
    ) -> Result<(), ParleyError> {
        self.http.send_additional_fields(config, token, fields).await
    }

    async fn load_previous_messages(
        &self,
        config: &ChatConfig,
        token: &str,
        oldest_message_id: i64,
    ) -> Result<bool, ParleyError> {
        let page = self
            .http
            .previous_messages(config, token, oldest_message_id)
            .await?;
        if page.is_empty() {
            debug!(oldest_message_id, "history exhausted");
            return Ok(false);
        }
        let messages = convert_batch(&page);
        let _ = self
            .event_tx
            .send(TransportEvent::MessagesReceived {
                messages,
                historical: true,
            })
            .await;
        Ok(true)
    }

    async fn create_chat(&self, config: &ChatConfig, api_token: &str) -> Result<String, ParleyError> {
        self.http.create_chat(config, api_token).await
    }

    async fn load_form(
        &self,
        config: &ChatConfig,
        token: &str,
        form: &Form,
    ) -> Result<Vec<Field>, ParleyError> {
        let field_ids: Vec<&str> = form.fields.iter().map(Field::id).collect();
        let response = self.http.load_form(config, token, &field_ids).await?;
        Ok(forms::merge_loaded_fields(form, &response))
    }

    async fn send_form(
        &self,
        config: &ChatConfig,
        token: &str,
        form: &Form,
    ) -> Result<(), ParleyError> {
        let fields = forms::form_save_fields(form);
        self.http.send_form(config, token, form.id, fields).await
    }

    async fn release(&self) {
        self.socket.disconnect().await;
        self.shutdown.cancel();
        debug!("transport released");
    }
}
