//! Transport layer for Atelier.
//!
//! Defines the [`ModelClient`] seam between the chat pipeline and the
//! generative endpoint, with two implementations: the HTTP client and a
//! mock that reproduces both response shapes when no credential is
//! configured.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use atelier_core::message::HistoryEntry;
use atelier_core::request::ComposedRequest;

pub mod config;
pub mod error;
mod http;
mod mock;
pub mod wire;

pub use config::StudioConfig;
pub use error::TransportError;
pub use http::StudioApiClient;
pub use mock::MockModelClient;
pub use wire::{MultimodalReply, POLICY_BLOCKED_TEXT};

/// An open-ended, order-preserving sequence of text fragments.
pub type TextStream = BoxStream<'static, Result<String, TransportError>>;

/// Template provenance forwarded alongside every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Active workflow id, if any.
    pub workflow_id: Option<String>,
    /// Selected module ids, selection order.
    pub module_ids: Vec<String>,
}

/// Client for the generative model endpoint.
///
/// The text-only path streams fragments; the image path returns a single
/// batched multipart reply. There is no mid-stream cancellation: a request
/// runs to completion or to error.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Issues a streaming text request carrying the prior conversation.
    ///
    /// # Returns
    ///
    /// A stream of text fragments, terminated when the underlying response
    /// body ends.
    async fn stream_text(
        &self,
        request: &ComposedRequest,
        meta: &RequestMeta,
        history: &[HistoryEntry],
    ) -> Result<TextStream, TransportError>;

    /// Issues a single non-streaming multimodal request.
    async fn generate(
        &self,
        request: &ComposedRequest,
        meta: &RequestMeta,
    ) -> Result<MultimodalReply, TransportError>;
}

/// Chooses the model client once at startup.
///
/// A configured credential selects the HTTP client; a missing one degrades
/// to the mock generator so the application always yields a usable (if
/// fake) response.
pub fn build_client(config: &StudioConfig) -> atelier_core::Result<Arc<dyn ModelClient>> {
    match &config.api_key {
        Some(_) => Ok(Arc::new(StudioApiClient::from_config(config)?)),
        None => {
            tracing::warn!(
                "no model credential configured; falling back to the mock model client"
            );
            Ok(Arc::new(MockModelClient::new()))
        }
    }
}
