//! Request builder.
//!
//! Merges the composer state and the free-text prompt into a single model
//! request: a system instruction string plus an ordered list of content
//! parts. Building is pure and never fails.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::composer::ComposerState;

/// Fixed base system instruction every request starts from.
pub const BASE_SYSTEM_INSTRUCTION: &str = "You are a creative, multimodal AI assistant.";

/// One unit of a model request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Inline text.
    Text(String),
    /// Inline image bytes, base64-encoded, paired with the source mime type.
    InlineImage { mime_type: String, data: String },
}

impl ContentPart {
    /// Returns whether this part is an image.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::InlineImage { .. })
    }
}

/// A fully composed model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    /// The merged system instruction.
    pub system_instruction: String,
    /// Ordered content parts. All image parts precede the trailing text
    /// part; workflow templates refer to images positionally.
    pub parts: Vec<ContentPart>,
}

impl ComposedRequest {
    /// Returns the image parts in order.
    pub fn image_parts(&self) -> impl Iterator<Item = &ContentPart> {
        self.parts.iter().filter(|p| p.is_image())
    }

    /// Returns the literal prompt held by the trailing text part.
    pub fn prompt_text(&self) -> &str {
        self.parts
            .iter()
            .rev()
            .find_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::InlineImage { .. } => None,
            })
            .unwrap_or_default()
    }
}

/// Builds the request for the given prompt and composer state.
///
/// The system instruction starts from [`BASE_SYSTEM_INSTRUCTION`]; an
/// active workflow appends its label and full template, and selected
/// modules append their texts newline-joined in selection order. No
/// truncation and no deduplication is applied.
///
/// The parts collect every currently present image (base64-encoded with
/// its mime type) followed by one final text part holding the literal
/// prompt.
pub fn build_request(prompt: &str, composer: &ComposerState) -> ComposedRequest {
    let mut system_instruction = BASE_SYSTEM_INSTRUCTION.to_string();

    if let Some(workflow) = composer.active_workflow() {
        system_instruction.push_str(&format!(
            "\n\nWORKFLOW: {}\n{}",
            workflow.label, workflow.system_prompt
        ));
    }

    let modules = composer.selected_modules();
    if !modules.is_empty() {
        let module_texts: Vec<&str> = modules.iter().map(|m| m.text.as_str()).collect();
        system_instruction.push_str(&format!(
            "\n\nAPPLY THE FOLLOWING MODIFIERS:\n{}",
            module_texts.join("\n")
        ));
    }

    let mut parts: Vec<ContentPart> = composer
        .present_images()
        .into_iter()
        .map(|image| ContentPart::InlineImage {
            mime_type: image.mime_type.clone(),
            data: BASE64_STANDARD.encode(&image.bytes),
        })
        .collect();
    parts.push(ContentPart::Text(prompt.to_string()));

    ComposedRequest {
        system_instruction,
        parts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::PendingImage;
    use crate::template::{AdvancedWorkflow, ImageSlot, PromptModule};

    fn workflow() -> AdvancedWorkflow {
        AdvancedWorkflow {
            id: "wf".to_string(),
            label: "Lookbook".to_string(),
            image_slots: vec![
                ImageSlot {
                    id: "Img1".to_string(),
                    label: "Model".to_string(),
                },
                ImageSlot {
                    id: "Img2".to_string(),
                    label: "Outfit".to_string(),
                },
            ],
            system_prompt: "Render the outfit on the model.".to_string(),
        }
    }

    fn module(id: &str, text: &str) -> PromptModule {
        PromptModule {
            id: id.to_string(),
            label: id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_base_instruction_without_workflow_or_modules() {
        let composer = ComposerState::new();
        let request = build_request("hello", &composer);
        assert_eq!(request.system_instruction, BASE_SYSTEM_INSTRUCTION);
        assert_eq!(request.parts, vec![ContentPart::Text("hello".to_string())]);
    }

    #[test]
    fn test_workflow_and_modules_are_appended_in_order() {
        let mut composer = ComposerState::new();
        composer.select_workflow(workflow());
        composer.select_module(module("a", "First modifier."));
        composer.select_module(module("b", "Second modifier."));

        let request = build_request("go", &composer);
        assert_eq!(
            request.system_instruction,
            format!(
                "{}\n\nWORKFLOW: Lookbook\nRender the outfit on the model.\
                 \n\nAPPLY THE FOLLOWING MODIFIERS:\nFirst modifier.\nSecond modifier.",
                BASE_SYSTEM_INSTRUCTION
            )
        );
    }

    #[test]
    fn test_all_image_parts_precede_the_text_part() {
        let mut composer = ComposerState::new();
        composer
            .add_images(
                vec![
                    PendingImage::new("image/png", vec![1], "a.png"),
                    PendingImage::new("image/jpeg", vec![2], "b.jpg"),
                    PendingImage::new("image/webp", vec![3], "c.webp"),
                ],
                None,
            )
            .unwrap();

        let request = build_request("caption these", &composer);
        assert_eq!(request.parts.len(), 4);
        assert!(request.parts[..3].iter().all(ContentPart::is_image));
        assert_eq!(
            request.parts[3],
            ContentPart::Text("caption these".to_string())
        );
    }

    #[test]
    fn test_workflow_images_follow_slot_order() {
        let mut composer = ComposerState::new();
        composer.select_workflow(workflow());
        composer
            .add_images(vec![PendingImage::new("image/png", vec![2], "outfit")], Some("Img2"))
            .unwrap();
        composer
            .add_images(vec![PendingImage::new("image/png", vec![1], "model")], Some("Img1"))
            .unwrap();

        let request = build_request("try on", &composer);
        let mime_and_data: Vec<_> = request
            .image_parts()
            .map(|part| match part {
                ContentPart::InlineImage { data, .. } => data.clone(),
                ContentPart::Text(_) => unreachable!(),
            })
            .collect();
        // Slot Img1's image (bytes [1]) comes first regardless of add order.
        assert_eq!(
            mime_and_data,
            vec![BASE64_STANDARD.encode([1u8]), BASE64_STANDARD.encode([2u8])]
        );
    }

    #[test]
    fn test_image_bytes_are_base64_encoded_with_mime_type() {
        let mut composer = ComposerState::new();
        composer
            .add_images(
                vec![PendingImage::new("image/png", b"raw-bytes".to_vec(), "a.png")],
                None,
            )
            .unwrap();

        let request = build_request("", &composer);
        assert_eq!(
            request.parts[0],
            ContentPart::InlineImage {
                mime_type: "image/png".to_string(),
                data: BASE64_STANDARD.encode(b"raw-bytes"),
            }
        );
    }
}
