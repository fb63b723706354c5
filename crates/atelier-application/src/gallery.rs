//! Gallery persistence collaborator.
//!
//! Saving a generated image to the gallery is delegated to an external
//! store. No real storage layer exists yet; the no-op implementation logs
//! the payload and succeeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::Result;
use atelier_core::message::ChatMessage;

/// Everything needed to persist one generated image with its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPayload {
    /// The generated image being saved.
    pub image_url_to_save: String,
    /// Text of the model message the image belongs to.
    pub model_response_text: String,
    /// The user prompt that produced it.
    pub user_prompt_text: String,
    /// Preview handles of the images the user uploaded.
    pub user_uploaded_images: Vec<String>,
    /// Workflow provenance, if any.
    pub workflow_id: Option<String>,
    /// Module provenance, selection order.
    pub module_ids: Vec<String>,
    /// When the save was requested.
    pub created_at: DateTime<Utc>,
}

impl GalleryPayload {
    /// Builds a payload from the exchange's user and model messages.
    pub fn from_exchange(
        user_message: &ChatMessage,
        model_message: &ChatMessage,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            image_url_to_save: image_url.into(),
            model_response_text: model_message.text.clone(),
            user_prompt_text: user_message.text.clone(),
            user_uploaded_images: user_message.images.clone(),
            workflow_id: model_message.workflow_id.clone(),
            module_ids: model_message.module_ids.clone(),
            created_at: Utc::now(),
        }
    }
}

/// An abstract gallery persistence backend.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// Persists one generated image with its context.
    async fn save(&self, payload: GalleryPayload) -> Result<()>;
}

/// Stand-in store used until real persistence is wired up.
#[derive(Debug, Default)]
pub struct NoopGalleryStore;

#[async_trait]
impl GalleryStore for NoopGalleryStore {
    async fn save(&self, payload: GalleryPayload) -> Result<()> {
        tracing::info!(
            image = %payload.image_url_to_save,
            workflow = ?payload.workflow_id,
            "gallery save requested; no persistence configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_exchange_context() {
        let user = ChatMessage::user("1", "try this on", vec!["model.png".to_string()]);
        let mut model = ChatMessage::provisional_model(
            "2",
            Some("workflow_virtual_try_on".to_string()),
            vec!["photo_realism".to_string()],
        );
        model.text = "here you go".to_string();

        let payload =
            GalleryPayload::from_exchange(&user, &model, "data:image/png;base64,QUJD");
        assert_eq!(payload.user_prompt_text, "try this on");
        assert_eq!(payload.model_response_text, "here you go");
        assert_eq!(payload.user_uploaded_images, vec!["model.png"]);
        assert_eq!(
            payload.workflow_id.as_deref(),
            Some("workflow_virtual_try_on")
        );
    }

    #[tokio::test]
    async fn test_noop_store_accepts_any_payload() {
        let user = ChatMessage::user("1", "p", Vec::new());
        let model = ChatMessage::provisional_model("2", None, Vec::new());
        let payload = GalleryPayload::from_exchange(&user, &model, "img");
        assert!(NoopGalleryStore.save(payload).await.is_ok());
    }
}
