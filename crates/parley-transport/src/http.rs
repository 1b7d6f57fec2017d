// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP fallback for everything the socket does not carry: file uploads,
//! client profile, offline forms, additional fields, pagination, chat
//! creation, and dynamic forms.

use std::time::Duration;

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use parley_codec::wire::{WireFormLoad, WireFormSave, WireMessage};
use parley_core::{ChatConfig, FileInfo, OfflineForm, ParleyError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the chat backend's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ClientRequest<'a> {
    chat_token: &'a str,
    email: Option<&'a str>,
    name: Option<&'a str>,
    phone: Option<&'a str>,
    note: Option<&'a str>,
    additional_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OfflineFormRequest<'a> {
    company_id: &'a str,
    channel_id: &'a str,
    name: &'a str,
    email: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    topic: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_fields: Vec<OfflineFormCustomField<'a>>,
}

#[derive(Debug, Serialize)]
struct OfflineFormCustomField<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AdditionalField {
    id: i64,
    value: String,
}

#[derive(Debug, Serialize)]
struct CreateChatRequest<'a> {
    company_id: &'a str,
    channel_id: &'a str,
    api_token: &'a str,
    email: Option<&'a str>,
    name: Option<&'a str>,
    phone: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateChatResponse {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

impl HttpApi {
    pub fn new() -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ParleyError::Http {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    fn endpoint(config: &ChatConfig, path: &str) -> Result<Url, ParleyError> {
        Url::parse(&config.url_api)
            .and_then(|base| base.join(path))
            .map_err(|e| ParleyError::Config(format!("invalid api url {}: {e}", config.url_api)))
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<reqwest::Response, ParleyError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| ParleyError::Http {
                message: format!("request to {url} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        check_status(response)
    }

    /// Uploads a file as multipart form data, tagged with the client-local
    /// message id for echo matching.
    pub async fn upload_file(
        &self,
        config: &ChatConfig,
        token: &str,
        file: &FileInfo,
        local_id: i64,
    ) -> Result<(), ParleyError> {
        let url = Self::endpoint(config, "v1/chat/send_file")?;
        let bytes = tokio::fs::read(&file.uri).await?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| ParleyError::Http {
                message: format!("invalid mime type {}: {e}", file.mime),
                source: Some(Box::new(e)),
            })?;
        let form = multipart::Form::new()
            .text("chat_token", token.to_string())
            .text("message_id", local_id.to_string())
            .part("file", part);

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParleyError::Http {
                message: format!("file upload to {url} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        check_status(response)?;
        debug!(local_id, name = %file.name, "file uploaded");
        Ok(())
    }

    /// Pushes the client profile. The server answers on the socket with a
    /// `client_set` frame once the profile is applied.
    pub async fn set_client(&self, config: &ChatConfig, token: &str) -> Result<(), ParleyError> {
        let url = Self::endpoint(config, "v1/chat/client")?;
        self.post_json(
            url,
            &ClientRequest {
                chat_token: token,
                email: config.client_email.as_deref(),
                name: config.client_name.as_deref(),
                phone: config.client_phone.as_deref(),
                note: config.client_note.as_deref(),
                additional_id: config.client_additional_id.as_deref(),
            },
        )
        .await?;
        Ok(())
    }

    pub async fn send_offline_form(
        &self,
        config: &ChatConfig,
        form: &OfflineForm,
    ) -> Result<(), ParleyError> {
        let url = Self::endpoint(config, "v1/chat/callback")?;
        self.post_json(
            url,
            &OfflineFormRequest {
                company_id: &config.company_id,
                channel_id: &config.channel_id,
                name: &form.client_name,
                email: &form.client_email,
                message: &form.message,
                topic: &form.topic,
                custom_fields: form
                    .fields
                    .iter()
                    .map(|f| OfflineFormCustomField {
                        key: &f.key,
                        value: &f.value,
                    })
                    .collect(),
            },
        )
        .await?;
        Ok(())
    }

    pub async fn send_additional_fields(
        &self,
        config: &ChatConfig,
        token: &str,
        fields: Vec<(i64, String)>,
    ) -> Result<(), ParleyError> {
        let url = Self::endpoint(config, "v1/chat/additional_fields")?;
        let fields: Vec<AdditionalField> = fields
            .into_iter()
            .map(|(id, value)| AdditionalField { id, value })
            .collect();
        self.post_json(
            url,
            &serde_json::json!({
                "chat_token": token,
                "additional_fields": fields,
            }),
        )
        .await?;
        Ok(())
    }

    /// Fetches the page of messages older than `oldest_message_id`.
    /// An empty page means history is exhausted.
    pub async fn previous_messages(
        &self,
        config: &ChatConfig,
        token: &str,
        oldest_message_id: i64,
    ) -> Result<Vec<WireMessage>, ParleyError> {
        let mut url = Self::endpoint(config, "v1/chat/messages")?;
        url.query_pairs_mut()
            .append_pair("chat_token", token)
            .append_pair("before_id", &oldest_message_id.to_string());

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ParleyError::Http {
                message: format!("request to {url} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let page: MessagesPage = decode_json(check_status(response)?).await?;
        Ok(page.messages)
    }

    /// Creates a chat out of band and returns the assigned client token.
    pub async fn create_chat(
        &self,
        config: &ChatConfig,
        api_token: &str,
    ) -> Result<String, ParleyError> {
        let url = Self::endpoint(config, "v1/chat/create")?;
        let response = self
            .post_json(
                url,
                &CreateChatRequest {
                    company_id: &config.company_id,
                    channel_id: &config.channel_id,
                    api_token,
                    email: config.client_email.as_deref(),
                    name: config.client_name.as_deref(),
                    phone: config.client_phone.as_deref(),
                },
            )
            .await?;
        let body: CreateChatResponse = decode_json(response).await?;
        body.token
            .ok_or_else(|| ParleyError::http("create chat response carried no token"))
    }

    /// Loads server-side definitions for a form's non-text fields.
    pub async fn load_form(
        &self,
        config: &ChatConfig,
        token: &str,
        field_ids: &[&str],
    ) -> Result<WireFormLoad, ParleyError> {
        let url = Self::endpoint(config, "v1/chat/form")?;
        let ids = field_ids.join(",");
        let response = self
            .post_json(
                url,
                &serde_json::json!({
                    "chat_token": token,
                    "field_ids": ids,
                }),
            )
            .await?;
        decode_json(response).await
    }

    /// Submits form field values. The server signals acceptance with a 200
    /// body code.
    pub async fn send_form(
        &self,
        config: &ChatConfig,
        token: &str,
        form_id: i64,
        fields: Vec<Value>,
    ) -> Result<(), ParleyError> {
        let url = Self::endpoint(config, "v1/chat/form/save")?;
        let response = self
            .post_json(
                url,
                &serde_json::json!({
                    "chat_token": token,
                    "form_id": form_id,
                    "fields": fields,
                }),
            )
            .await?;
        let body: WireFormSave = decode_json(response).await?;
        if body.code == Some(200) || body.status == Some(200) {
            Ok(())
        } else {
            Err(ParleyError::http(format!(
                "form save rejected with code {:?}",
                body.code.or(body.status)
            )))
        }
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ParleyError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ParleyError::http(format!(
            "server answered {status} for {}",
            response.url()
        )))
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ParleyError> {
    response.json().await.map_err(|e| ParleyError::Http {
        message: format!("undecodable response body: {e}"),
        source: Some(Box::new(e)),
    })
}
