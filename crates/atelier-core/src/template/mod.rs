//! Template registry: prompt modules and advanced workflows.
//!
//! The registry is a static, process-wide catalog loaded once at first
//! access and immutable for the lifetime of the application. Lookups never
//! fail beyond returning `None`.

use serde::{Deserialize, Serialize};

mod catalog;

/// A named, reusable instruction fragment appended verbatim to the system
/// instruction of a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptModule {
    /// Unique identifier for the module.
    pub id: String,
    /// Human-readable label shown in the composer.
    pub label: String,
    /// Instruction text appended to the system instruction.
    pub text: String,
}

/// A named placeholder within a workflow expecting exactly one image.
///
/// Slot order is display order; the slot *id* is the semantic key used for
/// substitution inside the workflow's system prompt (e.g. `Img1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSlot {
    /// Semantic key referenced by the workflow template.
    pub id: String,
    /// Human-readable label (e.g. "Model", "Top").
    pub label: String,
}

/// A named template defining a fixed system prompt plus a set of named
/// image slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedWorkflow {
    /// Unique identifier for the workflow.
    pub id: String,
    /// Human-readable label shown in the composer.
    pub label: String,
    /// Ordered, named image inputs the template expects.
    pub image_slots: Vec<ImageSlot>,
    /// Full system prompt template for this workflow.
    pub system_prompt: String,
}

/// Returns all prompt modules, in catalog order.
pub fn modules() -> &'static [PromptModule] {
    catalog::prompt_modules()
}

/// Returns all advanced workflows, in catalog order.
pub fn workflows() -> &'static [AdvancedWorkflow] {
    catalog::advanced_workflows()
}

/// Finds a prompt module by id.
pub fn find_module(id: &str) -> Option<&'static PromptModule> {
    modules().iter().find(|m| m.id == id)
}

/// Finds an advanced workflow by id.
pub fn find_workflow(id: &str) -> Option<&'static AdvancedWorkflow> {
    workflows().iter().find(|w| w.id == id)
}
