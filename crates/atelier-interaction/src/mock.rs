//! Mock model client.
//!
//! Used when no model credential is configured. Reproduces both response
//! shapes with placeholder content so the application always yields a
//! usable (if fake) response: word-paced streaming on the text path, a
//! placeholder image on the image path.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::sleep;

use atelier_core::message::HistoryEntry;
use atelier_core::request::ComposedRequest;
use atelier_core::template;

use crate::error::TransportError;
use crate::wire::MultimodalReply;
use crate::{ModelClient, RequestMeta, TextStream};

const MOCK_IMAGE_URL: &str = "https://via.placeholder.com/512/1e1e1e/00ff99?text=Mocked+Image";

/// A model client that fabricates responses locally.
#[derive(Debug, Clone)]
pub struct MockModelClient {
    chunk_delay: Duration,
    batch_delay: Duration,
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModelClient {
    /// Creates a mock client with the default pacing.
    pub fn new() -> Self {
        Self {
            chunk_delay: Duration::from_millis(50),
            batch_delay: Duration::from_millis(1500),
        }
    }

    /// Overrides the pacing, mainly for tests.
    pub fn with_delays(chunk_delay: Duration, batch_delay: Duration) -> Self {
        Self {
            chunk_delay,
            batch_delay,
        }
    }

    fn workflow_label(meta: &RequestMeta) -> String {
        meta.workflow_id
            .as_deref()
            .map(|id| {
                template::find_workflow(id)
                    .map(|w| w.label.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .unwrap_or_else(|| "None".to_string())
    }

    fn module_labels(meta: &RequestMeta) -> String {
        if meta.module_ids.is_empty() {
            return "None".to_string();
        }
        meta.module_ids
            .iter()
            .map(|id| {
                template::find_module(id)
                    .map(|m| m.label.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn stream_text(
        &self,
        request: &ComposedRequest,
        meta: &RequestMeta,
        _history: &[HistoryEntry],
    ) -> Result<TextStream, TransportError> {
        let text = format!(
            "This is a mocked streaming response for your prompt: \"{}\".\n\n\
             Workflow: {}\nModules: {}\n\n\
             Normally, a real multimodal response would be generated here.",
            request.prompt_text(),
            Self::workflow_label(meta),
            Self::module_labels(meta),
        );
        let words: Vec<String> = text.split(' ').map(|word| format!("{word} ")).collect();
        let delay = self.chunk_delay;
        let stream = futures::stream::iter(words)
            .then(move |word| async move {
                sleep(delay).await;
                Ok(word)
            })
            .boxed();
        Ok(stream)
    }

    async fn generate(
        &self,
        request: &ComposedRequest,
        _meta: &RequestMeta,
    ) -> Result<MultimodalReply, TransportError> {
        sleep(self.batch_delay).await;
        Ok(MultimodalReply {
            text: format!(
                "This is a mocked image generation response for your prompt: \"{}\". \
                 A real image would be generated here.",
                request.prompt_text()
            ),
            images: vec![MOCK_IMAGE_URL.to_string()],
        })
    }
}
