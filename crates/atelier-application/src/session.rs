//! Chat session: the send pipeline and response assembly.
//!
//! One `ChatSession` owns the composer and the conversation log for a
//! single conversation. At most one send is outstanding at a time; a send
//! captures the composer's contents before any suspension point, appends
//! the user message and the provisional model message synchronously, then
//! assembles the streamed or batched response into the provisional message
//! by id. The composer is reset unconditionally once the exchange
//! completes or fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio::sync::{Mutex, RwLock, broadcast};

use atelier_core::composer::{ComposerError, ComposerState, DroppedItem, PendingImage};
use atelier_core::conversation::ConversationStore;
use atelier_core::message::{ChatMessage, HistoryEntry};
use atelier_core::request::build_request;
use atelier_core::template;
use atelier_interaction::{ModelClient, RequestMeta, TransportError};

/// Notification emitted whenever the conversation log changes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A message was appended to the log.
    MessageAppended(ChatMessage),
    /// An existing message was rewritten in place.
    MessageUpdated(ChatMessage),
}

/// Result of a `send_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange completed and the model message is final.
    Completed,
    /// The exchange failed; the model message carries the error text.
    Failed(String),
    /// Another send was already in flight; nothing happened.
    Rejected,
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A single chat conversation with its composer and model client.
pub struct ChatSession {
    client: Arc<dyn ModelClient>,
    composer: Mutex<ComposerState>,
    log: RwLock<ConversationStore>,
    in_flight: AtomicBool,
    last_error: Mutex<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    /// Creates a session backed by the given model client.
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            composer: Mutex::new(ComposerState::new()),
            log: RwLock::new(ConversationStore::new()),
            in_flight: AtomicBool::new(false),
            last_error: Mutex::new(None),
            events,
        }
    }

    /// Subscribes to conversation log changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns a snapshot of the conversation log.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.log.read().await.messages().to_vec()
    }

    /// Returns the number of messages in the log.
    pub async fn message_count(&self) -> usize {
        self.log.read().await.len()
    }

    /// Returns a snapshot of the composer state.
    pub async fn composer(&self) -> ComposerState {
        self.composer.lock().await.clone()
    }

    /// Returns the detail of the last failed send, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Returns whether a send is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    // ---- composer operations -------------------------------------------

    /// Handles a drag-and-drop payload from the catalog.
    ///
    /// Malformed payloads are swallowed silently; raw-file drops are
    /// expected at this boundary and are not an error.
    pub async fn apply_drop(&self, payload: &str) {
        if let Some(item) = DroppedItem::parse(payload) {
            self.apply_dropped_item(item).await;
        }
    }

    /// Applies an already-parsed dropped catalog item.
    pub async fn apply_dropped_item(&self, item: DroppedItem) {
        match item {
            DroppedItem::Workflow { id } => {
                self.select_workflow(&id).await;
            }
            DroppedItem::Module { id } => {
                self.select_module(&id).await;
            }
        }
    }

    /// Activates the workflow with the given id. Returns `false` when the
    /// id is not in the catalog.
    pub async fn select_workflow(&self, id: &str) -> bool {
        match template::find_workflow(id) {
            Some(workflow) => {
                self.composer.lock().await.select_workflow(workflow.clone());
                true
            }
            None => false,
        }
    }

    /// Adds the module with the given id to the selection. Returns `false`
    /// when the id is not in the catalog.
    pub async fn select_module(&self, id: &str) -> bool {
        match template::find_module(id) {
            Some(module) => {
                self.composer.lock().await.select_module(module.clone());
                true
            }
            None => false,
        }
    }

    /// Removes a selected module by id.
    pub async fn remove_module(&self, id: &str) {
        self.composer.lock().await.remove_module(id);
    }

    /// Deactivates the active workflow.
    pub async fn remove_workflow(&self) {
        self.composer.lock().await.remove_workflow();
    }

    /// Attaches pending images, addressed to a slot while a workflow is
    /// active.
    pub async fn add_images(
        &self,
        images: Vec<PendingImage>,
        slot_id: Option<&str>,
    ) -> Result<(), ComposerError> {
        self.composer.lock().await.add_images(images, slot_id)
    }

    /// Removes a pending image by id, or clears the named slot.
    pub async fn remove_image(
        &self,
        id: &str,
        slot_id: Option<&str>,
    ) -> Result<(), ComposerError> {
        self.composer.lock().await.remove_image(id, slot_id)
    }

    // ---- send pipeline -------------------------------------------------

    /// Sends the prompt with the current composer contents.
    ///
    /// A send while another is in flight is rejected outright: no queueing,
    /// no cancellation of the prior one, log untouched. On completion or
    /// failure the composer is reset unconditionally.
    pub async fn send_message(&self, prompt: &str) -> SendOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("send rejected: another send is already in flight");
            return SendOutcome::Rejected;
        }

        // Capture the composer contents and the replayable history before
        // any suspension point; composer edits during the send affect the
        // next send only.
        let snapshot = self.composer.lock().await.clone();
        let history = self.log.read().await.history();

        let meta = RequestMeta {
            workflow_id: snapshot.active_workflow().map(|w| w.id.clone()),
            module_ids: snapshot.module_ids(),
        };
        let previews: Vec<String> = snapshot
            .present_images()
            .iter()
            .map(|image| image.preview.clone())
            .collect();

        // User message first, then the provisional model message, both
        // appended before any asynchronous work begins.
        let (user_message, provisional) = {
            let mut log = self.log.write().await;
            let user_id = log.next_message_id();
            let user_message = ChatMessage::user(&user_id, prompt, previews);
            log.append(user_message.clone());

            let model_id = log.next_message_id();
            let provisional = ChatMessage::provisional_model(
                &model_id,
                meta.workflow_id.clone(),
                meta.module_ids.clone(),
            );
            log.append(provisional.clone());
            (user_message, provisional)
        };
        let _ = self.events.send(SessionEvent::MessageAppended(user_message));
        let _ = self.events.send(SessionEvent::MessageAppended(provisional.clone()));

        let result = self
            .run_exchange(prompt, &snapshot, &meta, history, &provisional.id)
            .await;

        let outcome = match result {
            Ok(()) => {
                *self.last_error.lock().await = None;
                SendOutcome::Completed
            }
            Err(err) => {
                let detail = err.to_string();
                tracing::error!(error = %detail, "send failed");
                self.rewrite_message(&provisional.id, |message| {
                    message.text = format!("Error: {detail}");
                })
                .await;
                *self.last_error.lock().await = Some(detail.clone());
                SendOutcome::Failed(detail)
            }
        };

        // The composer never carries state across sent messages.
        self.composer.lock().await.reset();
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_exchange(
        &self,
        prompt: &str,
        snapshot: &ComposerState,
        meta: &RequestMeta,
        history: Vec<HistoryEntry>,
        model_id: &str,
    ) -> Result<(), TransportError> {
        let request = build_request(prompt, snapshot);

        if snapshot.has_images() {
            let reply = self.client.generate(&request, meta).await?;
            self.rewrite_message(model_id, move |message| {
                message.text = reply.text;
                message.images = reply.images;
            })
            .await;
            return Ok(());
        }

        let mut stream = self.client.stream_text(&request, meta, &history).await?;
        let mut first = true;
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            self.rewrite_message(model_id, |message| {
                if first {
                    // The first fragment replaces the placeholder.
                    message.text = fragment;
                } else {
                    message.text.push_str(&fragment);
                }
            })
            .await;
            first = false;
        }
        Ok(())
    }

    /// Applies a targeted rewrite to a message by id and announces it.
    ///
    /// The message is looked up in the log rather than held by reference:
    /// the log may have changed since the id was issued.
    async fn rewrite_message<F>(&self, id: &str, transform: F)
    where
        F: FnOnce(&mut ChatMessage),
    {
        let updated = {
            let mut log = self.log.write().await;
            if !log.update(id, transform) {
                tracing::warn!(message_id = %id, "rewrite target missing from conversation log");
                return;
            }
            log.get(id).cloned()
        };
        if let Some(message) = updated {
            let _ = self.events.send(SessionEvent::MessageUpdated(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atelier_core::composer::{ComposerMode, PendingImage};
    use atelier_core::message::{MessageRole, PROVISIONAL_TEXT};
    use atelier_core::request::ComposedRequest;
    use atelier_interaction::{MultimodalReply, TextStream};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Streams a fixed fragment script and records the history it was
    /// handed.
    struct ScriptedClient {
        fragments: Vec<&'static str>,
        seen_history: StdMutex<Vec<Vec<HistoryEntry>>>,
    }

    impl ScriptedClient {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                seen_history: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn stream_text(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
            history: &[HistoryEntry],
        ) -> Result<TextStream, TransportError> {
            self.seen_history.lock().unwrap().push(history.to_vec());
            let fragments: Vec<Result<String, TransportError>> = self
                .fragments
                .iter()
                .map(|f| Ok(f.to_string()))
                .collect();
            Ok(futures::stream::iter(fragments).boxed())
        }

        async fn generate(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
        ) -> Result<MultimodalReply, TransportError> {
            unreachable!("text-only client")
        }
    }

    /// Returns a fixed batched reply and records the request it was given.
    struct BatchClient {
        reply: MultimodalReply,
        seen_requests: StdMutex<Vec<ComposedRequest>>,
    }

    impl BatchClient {
        fn new(reply: MultimodalReply) -> Self {
            Self {
                reply,
                seen_requests: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for BatchClient {
        async fn stream_text(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
            _history: &[HistoryEntry],
        ) -> Result<TextStream, TransportError> {
            unreachable!("image-path client")
        }

        async fn generate(
            &self,
            request: &ComposedRequest,
            _meta: &RequestMeta,
        ) -> Result<MultimodalReply, TransportError> {
            self.seen_requests.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    /// Fails every request with a fixed message.
    struct FailingClient;

    #[async_trait]
    impl ModelClient for FailingClient {
        async fn stream_text(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
            _history: &[HistoryEntry],
        ) -> Result<TextStream, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }

        async fn generate(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
        ) -> Result<MultimodalReply, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }
    }

    /// Blocks the stream until released, to hold a send in flight.
    struct GatedClient {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ModelClient for GatedClient {
        async fn stream_text(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
            _history: &[HistoryEntry],
        ) -> Result<TextStream, TransportError> {
            self.release.notified().await;
            Ok(futures::stream::iter(vec![Ok("done".to_string())]).boxed())
        }

        async fn generate(
            &self,
            _request: &ComposedRequest,
            _meta: &RequestMeta,
        ) -> Result<MultimodalReply, TransportError> {
            unreachable!("text-only client")
        }
    }

    fn image(preview: &str) -> PendingImage {
        PendingImage::new("image/png", vec![0xAB], preview)
    }

    #[tokio::test]
    async fn test_streaming_assembly_replaces_placeholder_then_appends() {
        let session = ChatSession::new(Arc::new(ScriptedClient::new(vec!["Hello ", "world"])));
        let mut events = session.subscribe();

        let outcome = session.send_message("greet me").await;
        assert_eq!(outcome, SendOutcome::Completed);

        let messages = session.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].text, "greet me");
        assert_eq!(messages[1].role, MessageRole::Model);
        assert_eq!(messages[1].text, "Hello world");

        // Replay the event log: the placeholder appears once on append and
        // never again after the first fragment arrives.
        let mut update_texts = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::MessageAppended(m) if m.role == MessageRole::Model => {
                    assert_eq!(m.text, PROVISIONAL_TEXT);
                }
                SessionEvent::MessageUpdated(m) => update_texts.push(m.text),
                SessionEvent::MessageAppended(_) => {}
            }
        }
        assert_eq!(update_texts, vec!["Hello ", "Hello world"]);
    }

    #[tokio::test]
    async fn test_user_message_precedes_model_placeholder() {
        let session = ChatSession::new(Arc::new(ScriptedClient::new(vec!["ok"])));
        session.send_message("first").await;

        let messages = session.messages().await;
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Model);
        assert!(messages[0].id < messages[1].id);
    }

    #[tokio::test]
    async fn test_image_path_writes_reply_and_provenance() {
        let client = Arc::new(BatchClient::new(MultimodalReply {
            text: "rendered".to_string(),
            images: vec!["data:image/png;base64,QUJD".to_string()],
        }));
        let session = ChatSession::new(client.clone());

        assert!(session.select_workflow("workflow_cinema_scene").await);
        assert!(session.select_module("photo_realism").await);
        session
            .add_images(vec![image("master.png")], Some("Img1"))
            .await
            .unwrap();

        let outcome = session.send_message("new angle").await;
        assert_eq!(outcome, SendOutcome::Completed);

        let messages = session.messages().await;
        assert_eq!(messages[1].text, "rendered");
        assert_eq!(messages[1].images, vec!["data:image/png;base64,QUJD"]);
        assert_eq!(messages[1].workflow_id.as_deref(), Some("workflow_cinema_scene"));
        assert_eq!(messages[1].module_ids, vec!["photo_realism"]);

        // The user message carries the preview handles of the captured images.
        assert_eq!(messages[0].images, vec!["master.png"]);

        // The built request put the image before the trailing text part.
        let requests = client.seen_requests.lock().unwrap();
        assert!(requests[0].parts[0].is_image());
        assert_eq!(requests[0].prompt_text(), "new angle");
    }

    #[tokio::test]
    async fn test_composer_resets_after_success_and_failure() {
        let session = ChatSession::new(Arc::new(ScriptedClient::new(vec!["ok"])));
        session.select_workflow("workflow_beauty_ad").await;
        session.send_message("one").await;
        assert_eq!(session.composer().await, ComposerState::new());

        let session = ChatSession::new(Arc::new(FailingClient));
        session.select_workflow("workflow_beauty_ad").await;
        session.select_module("vintage_look").await;
        let outcome = session.send_message("two").await;
        assert!(matches!(outcome, SendOutcome::Failed(_)));

        let composer = session.composer().await;
        assert!(composer.active_workflow().is_none());
        assert!(composer.selected_modules().is_empty());
        assert!(matches!(
            composer.mode(),
            ComposerMode::Standard { images } if images.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_failure_rewrites_model_message_and_keeps_user_message() {
        let session = ChatSession::new(Arc::new(FailingClient));
        let outcome = session.send_message("hello").await;
        assert_eq!(
            outcome,
            SendOutcome::Failed("connection refused".to_string())
        );

        let messages = session.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[1].text, "Error: connection refused");
        assert_eq!(
            session.last_error().await,
            Some("connection refused".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_send_is_rejected_without_log_changes() {
        let release = Arc::new(Notify::new());
        let session = Arc::new(ChatSession::new(Arc::new(GatedClient {
            release: release.clone(),
        })));

        let background = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("slow").await })
        };

        // Wait until the first send is holding the in-flight guard.
        while !session.is_in_flight() {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.message_count().await, 2);

        let outcome = session.send_message("eager").await;
        assert_eq!(outcome, SendOutcome::Rejected);
        assert_eq!(session.message_count().await, 2);

        release.notify_one();
        assert_eq!(background.await.unwrap(), SendOutcome::Completed);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_history_excludes_the_in_flight_exchange() {
        let client = Arc::new(ScriptedClient::new(vec!["reply"]));
        let session = ChatSession::new(client.clone());

        session.send_message("first").await;
        session.send_message("second").await;

        let seen = client.seen_history.lock().unwrap();
        assert!(seen[0].is_empty());
        // The second send replays only the completed first exchange.
        assert_eq!(seen[1].len(), 2);
        assert_eq!(seen[1][0].text, "first");
        assert_eq!(seen[1][1].text, "reply");
    }

    #[tokio::test]
    async fn test_apply_drop_selects_catalog_items_and_ignores_noise() {
        let session = ChatSession::new(Arc::new(ScriptedClient::new(vec![])));

        session
            .apply_drop(r#"{"type":"workflow","id":"workflow_fashion_ad"}"#)
            .await;
        session
            .apply_drop(r#"{"type":"module","id":"cinematic_lighting"}"#)
            .await;
        session.apply_drop("file:///tmp/photo.png").await;
        session
            .apply_drop(r#"{"type":"module","id":"not_in_catalog"}"#)
            .await;

        let composer = session.composer().await;
        assert_eq!(
            composer.active_workflow().map(|w| w.id.as_str()),
            Some("workflow_fashion_ad")
        );
        assert_eq!(composer.module_ids(), vec!["cinematic_lighting"]);
    }
}
