//! HTTP client for the studio endpoint.
//!
//! Implements both transport paths from the wire contract: a JSON POST
//! answered by a raw `text/plain` chunk stream, and a multipart POST
//! answered by a single JSON document of ordered parts.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use futures::{StreamExt, future};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use atelier_core::message::HistoryEntry;
use atelier_core::request::{ComposedRequest, ContentPart};
use atelier_core::{AtelierError, Result};

use crate::config::StudioConfig;
use crate::error::TransportError;
use crate::wire::{self, GenerateContentResponse, MultimodalReply, StreamRequestBody};
use crate::{ModelClient, RequestMeta, TextStream};

/// Client implementation that talks to the studio HTTP endpoint.
#[derive(Clone, Debug)]
pub struct StudioApiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl StudioApiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no credential is present or the
    /// underlying HTTP client cannot be constructed.
    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AtelierError::config("no model credential configured"))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AtelierError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn check_status(response: Response) -> std::result::Result<Response, TransportError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        Err(TransportError::from_error_body(status, &body))
    }
}

#[async_trait]
impl ModelClient for StudioApiClient {
    async fn stream_text(
        &self,
        request: &ComposedRequest,
        meta: &RequestMeta,
        history: &[HistoryEntry],
    ) -> std::result::Result<TextStream, TransportError> {
        let body = StreamRequestBody {
            prompt: request.prompt_text().to_string(),
            system_instruction: request.system_instruction.clone(),
            workflow_id: meta.workflow_id.clone().unwrap_or_default(),
            module_ids: meta.module_ids.clone(),
            history: history.to_vec(),
        };

        let url = format!("{}/generate/stream", self.endpoint);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError::Network(format!("request failed: {err}")))?;
        let response = Self::check_status(response).await?;

        let stream = response
            .bytes_stream()
            .scan(Vec::new(), |carry: &mut Vec<u8>, chunk| {
                let item = match chunk {
                    Ok(bytes) => {
                        carry.extend_from_slice(&bytes);
                        Ok(drain_valid_utf8(carry))
                    }
                    Err(err) => Err(TransportError::Network(format!(
                        "stream read failed: {err}"
                    ))),
                };
                future::ready(Some(item))
            })
            .filter(|item| {
                // Chunk boundaries can split a multibyte character; the
                // carried remainder may produce an empty fragment.
                let keep = match item {
                    Ok(text) => !text.is_empty(),
                    Err(_) => true,
                };
                future::ready(keep)
            })
            .boxed();
        Ok(stream)
    }

    async fn generate(
        &self,
        request: &ComposedRequest,
        meta: &RequestMeta,
    ) -> std::result::Result<MultimodalReply, TransportError> {
        let module_ids = serde_json::to_string(&meta.module_ids)
            .map_err(|e| TransportError::Decode(format!("failed to encode module ids: {e}")))?;
        let mut form = Form::new()
            .text("prompt", request.prompt_text().to_string())
            .text("systemInstruction", request.system_instruction.clone())
            .text("workflowId", meta.workflow_id.clone().unwrap_or_default())
            .text("moduleIds", module_ids);

        for (index, part) in request.image_parts().enumerate() {
            let ContentPart::InlineImage { mime_type, data } = part else {
                continue;
            };
            let bytes = BASE64_STANDARD
                .decode(data)
                .map_err(|e| TransportError::Decode(format!("invalid inline image data: {e}")))?;
            let file_part = Part::bytes(bytes)
                .file_name(format!("image-{index}"))
                .mime_str(mime_type)
                .map_err(|e| {
                    TransportError::Decode(format!("invalid mime type '{mime_type}': {e}"))
                })?;
            form = form.part(format!("images[{index}]"), file_part);
        }

        let url = format!("{}/generate", self.endpoint);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|err| TransportError::Network(format!("request failed: {err}")))?;
        let response = Self::check_status(response).await?;

        let document: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| TransportError::Decode(format!("failed to parse response: {err}")))?;
        Ok(wire::assemble_multimodal(document))
    }
}

/// Drains the longest valid UTF-8 prefix from the carry buffer.
///
/// Bytes of a character split across chunk boundaries stay in the buffer
/// until its remaining bytes arrive.
fn drain_valid_utf8(carry: &mut Vec<u8>) -> String {
    match std::str::from_utf8(carry) {
        Ok(text) => {
            let text = text.to_string();
            carry.clear();
            text
        }
        Err(err) => {
            let valid = err.valid_up_to();
            let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
            carry.drain(..valid);
            text
        }
    }
}
