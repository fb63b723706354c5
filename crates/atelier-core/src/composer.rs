//! Composer state machine.
//!
//! The composer holds an in-progress message: at most one active workflow,
//! a set of selected prompt modules, and the pending images. The image
//! state is a tagged union so that it can never disagree with whether a
//! workflow is active: free-form image lists only exist in standard mode,
//! slot-indexed images only exist while a workflow is active.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AtelierError;
use crate::template::{AdvancedWorkflow, ImageSlot, PromptModule};

/// An image attached to the composer but not yet submitted.
///
/// The raw bytes are exclusively owned by the composer until submission.
/// `preview` is a display-only handle (a path or data URI) released when
/// the image is removed or the message is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    /// Unique id within the session.
    pub id: String,
    /// Mime type captured at attach time.
    pub mime_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// Display-only preview handle.
    pub preview: String,
}

impl PendingImage {
    /// Creates a pending image with a fresh unique id.
    pub fn new(
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        preview: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mime_type: mime_type.into(),
            bytes,
            preview: preview.into(),
        }
    }
}

/// Derives a mime type from a file name's extension.
///
/// Unknown extensions fall back to `application/octet-stream`.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// One named image slot of the active workflow and its current content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotState {
    /// The slot declaration from the workflow.
    pub slot: ImageSlot,
    /// The image currently filling the slot, if any.
    pub image: Option<PendingImage>,
}

/// The composer's image state, tagged by whether a workflow is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerMode {
    /// No workflow active: an ordered, free-form list of pending images.
    Standard { images: Vec<PendingImage> },
    /// A workflow is active: one slot per declared image slot, each holding
    /// at most one image, in declaration order.
    Workflow {
        workflow: AdvancedWorkflow,
        slots: Vec<SlotState>,
    },
}

/// Errors raised by misaddressed composer image operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    /// A slot id was passed while no workflow is active.
    #[error("slot ids are only accepted while a workflow is active")]
    SlotNotAccepted,
    /// A slot id is required while a workflow is active.
    #[error("a slot id is required while a workflow is active")]
    SlotRequired,
    /// The slot id is not declared by the active workflow.
    #[error("image slot '{0}' is not declared by the active workflow")]
    UnknownSlot(String),
}

impl From<ComposerError> for AtelierError {
    fn from(err: ComposerError) -> Self {
        Self::Composer(err.to_string())
    }
}

/// The in-progress message state for one chat session.
///
/// Invariants:
/// - at most one workflow is active, and the image state variant matches it;
/// - selected modules are unique by id, insertion order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerState {
    mode: ComposerMode,
    modules: Vec<PromptModule>,
}

impl Default for ComposerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerState {
    /// Creates an empty composer in standard mode.
    pub fn new() -> Self {
        Self {
            mode: ComposerMode::Standard { images: Vec::new() },
            modules: Vec::new(),
        }
    }

    /// Returns the current image state.
    pub fn mode(&self) -> &ComposerMode {
        &self.mode
    }

    /// Returns the active workflow, if any.
    pub fn active_workflow(&self) -> Option<&AdvancedWorkflow> {
        match &self.mode {
            ComposerMode::Standard { .. } => None,
            ComposerMode::Workflow { workflow, .. } => Some(workflow),
        }
    }

    /// Returns the selected modules in selection order.
    pub fn selected_modules(&self) -> &[PromptModule] {
        &self.modules
    }

    /// Returns the ids of the selected modules in selection order.
    pub fn module_ids(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.id.clone()).collect()
    }

    /// Activates a workflow, defining a fresh interaction contract.
    ///
    /// Selecting a workflow is destructive: previously selected modules and
    /// pending images are discarded, and one empty slot is initialized per
    /// declared image slot.
    pub fn select_workflow(&mut self, workflow: AdvancedWorkflow) {
        self.modules.clear();
        let slots = workflow
            .image_slots
            .iter()
            .map(|slot| SlotState {
                slot: slot.clone(),
                image: None,
            })
            .collect();
        self.mode = ComposerMode::Workflow { workflow, slots };
    }

    /// Adds a module to the selection. Selecting an already-selected module
    /// is a no-op, not an error.
    pub fn select_module(&mut self, module: PromptModule) {
        if !self.modules.iter().any(|m| m.id == module.id) {
            self.modules.push(module);
        }
    }

    /// Removes a module by id; no-op if absent.
    pub fn remove_module(&mut self, id: &str) {
        self.modules.retain(|m| m.id != id);
    }

    /// Deactivates the workflow, resetting the images to an empty free-form
    /// list. No-op when no workflow is active.
    pub fn remove_workflow(&mut self) {
        if matches!(self.mode, ComposerMode::Workflow { .. }) {
            self.mode = ComposerMode::Standard { images: Vec::new() };
        }
    }

    /// Adds pending images.
    ///
    /// In standard mode `slot_id` must be absent and the images are
    /// appended. While a workflow is active `slot_id` is required and must
    /// name a declared slot; the addition replaces any existing image in
    /// that slot, and only the first of multiple supplied files is
    /// retained.
    pub fn add_images(
        &mut self,
        images: Vec<PendingImage>,
        slot_id: Option<&str>,
    ) -> Result<(), ComposerError> {
        match (&mut self.mode, slot_id) {
            (ComposerMode::Standard { images: pending }, None) => {
                pending.extend(images);
                Ok(())
            }
            (ComposerMode::Standard { .. }, Some(_)) => Err(ComposerError::SlotNotAccepted),
            (ComposerMode::Workflow { .. }, None) => Err(ComposerError::SlotRequired),
            (ComposerMode::Workflow { slots, .. }, Some(slot_id)) => {
                let slot = slots
                    .iter_mut()
                    .find(|s| s.slot.id == slot_id)
                    .ok_or_else(|| ComposerError::UnknownSlot(slot_id.to_string()))?;
                // Slot capacity is exactly one; the first file wins.
                slot.image = images.into_iter().next();
                Ok(())
            }
        }
    }

    /// Removes a pending image.
    ///
    /// In standard mode the image is removed by id. While a workflow is
    /// active the slot is the addressing key: the named slot is cleared
    /// regardless of the passed id.
    pub fn remove_image(&mut self, id: &str, slot_id: Option<&str>) -> Result<(), ComposerError> {
        match (&mut self.mode, slot_id) {
            (ComposerMode::Standard { images }, None) => {
                images.retain(|img| img.id != id);
                Ok(())
            }
            (ComposerMode::Standard { .. }, Some(_)) => Err(ComposerError::SlotNotAccepted),
            (ComposerMode::Workflow { .. }, None) => Err(ComposerError::SlotRequired),
            (ComposerMode::Workflow { slots, .. }, Some(slot_id)) => {
                let slot = slots
                    .iter_mut()
                    .find(|s| s.slot.id == slot_id)
                    .ok_or_else(|| ComposerError::UnknownSlot(slot_id.to_string()))?;
                slot.image = None;
                Ok(())
            }
        }
    }

    /// Returns all currently present images.
    ///
    /// Standard mode yields insertion order; workflow mode yields slot
    /// declaration order with empty slots dropped.
    pub fn present_images(&self) -> Vec<&PendingImage> {
        match &self.mode {
            ComposerMode::Standard { images } => images.iter().collect(),
            ComposerMode::Workflow { slots, .. } => {
                slots.iter().filter_map(|s| s.image.as_ref()).collect()
            }
        }
    }

    /// Returns whether at least one image is present.
    pub fn has_images(&self) -> bool {
        !self.present_images().is_empty()
    }

    /// Returns to the initial empty standard-mode state.
    ///
    /// Invoked after a message send completes, success or failure; the
    /// composer never carries state across sent messages.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// The envelope carried by a drag-and-drop payload for catalog items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DroppedItem {
    /// A prompt module dragged from the catalog.
    Module { id: String },
    /// An advanced workflow dragged from the catalog.
    Workflow { id: String },
}

impl DroppedItem {
    /// Parses a drag payload, returning `None` for anything malformed.
    ///
    /// Non-JSON drag payloads (raw files and the like) are expected at the
    /// drop boundary and are not an error.
    pub fn parse(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }
}
