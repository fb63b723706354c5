//! Wire types for the generative endpoint, and response assembly.
//!
//! The text path posts a JSON document and reads back a raw text stream;
//! the image path posts a multipart form and reads back a single JSON
//! document of ordered parts, each either a text fragment or an inlined
//! image.

use atelier_core::message::HistoryEntry;
use serde::{Deserialize, Serialize};

/// Fixed fallback shown when the model returns zero candidates or parts.
///
/// An empty response is a policy-blocked outcome, not an error.
pub const POLICY_BLOCKED_TEXT: &str = "I couldn't generate a response. The request may have \
     been blocked due to safety policies. Please try again with a different prompt or image.";

/// JSON body of the text-only streaming request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequestBody {
    /// The literal user prompt.
    pub prompt: String,
    /// The composed system instruction.
    pub system_instruction: String,
    /// Active workflow id, empty if none.
    pub workflow_id: String,
    /// Selected module ids, selection order.
    pub module_ids: Vec<String>,
    /// Prior conversation as role/text pairs; images are never replayed.
    pub history: Vec<HistoryEntry>,
}

/// Response document of the image path.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// One part of a multimodal response: a text fragment or an inlined image.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// The assembled image-path reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultimodalReply {
    /// All text parts concatenated in response order, no separator.
    pub text: String,
    /// All image parts as directly displayable data URIs, response order.
    pub images: Vec<String>,
}

/// Assembles a multimodal response document into a displayable reply.
///
/// Text parts are concatenated in response order with no separator; image
/// parts become `data:{mime};base64,{data}` URIs in response order. Zero
/// candidates or an empty part list yields [`POLICY_BLOCKED_TEXT`] with no
/// images.
pub fn assemble_multimodal(response: GenerateContentResponse) -> MultimodalReply {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    if parts.is_empty() {
        return MultimodalReply {
            text: POLICY_BLOCKED_TEXT.to_string(),
            images: Vec::new(),
        };
    }

    let mut reply = MultimodalReply::default();
    for part in parts {
        if let Some(text) = part.text {
            reply.text.push_str(&text);
        }
        if let Some(inline) = part.inline_data {
            reply
                .images
                .push(format!("data:{};base64,{}", inline.mime_type, inline.data));
        }
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::message::MessageRole;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("valid response document")
    }

    #[test]
    fn test_stream_request_body_field_names() {
        let body = StreamRequestBody {
            prompt: "hi".to_string(),
            system_instruction: "base".to_string(),
            workflow_id: String::new(),
            module_ids: vec!["m".to_string()],
            history: vec![HistoryEntry {
                role: MessageRole::User,
                text: "earlier".to_string(),
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["systemInstruction"], "base");
        assert_eq!(value["workflowId"], "");
        assert_eq!(value["moduleIds"][0], "m");
        assert_eq!(value["history"][0]["role"], "user");
    }

    #[test]
    fn test_assembly_concatenates_text_parts_without_separator() {
        let reply = assemble_multimodal(parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" world"}]}}]}"#,
        ));
        assert_eq!(reply.text, "Hello world");
        assert!(reply.images.is_empty());
    }

    #[test]
    fn test_assembly_builds_data_uris_in_response_order() {
        let reply = assemble_multimodal(parse(
            r#"{"candidates":[{"content":{"parts":[
                {"inlineData":{"mimeType":"image/png","data":"QUJD"}},
                {"text":"done"},
                {"inlineData":{"mimeType":"image/jpeg","data":"REVG"}}
            ]}}]}"#,
        ));
        assert_eq!(reply.text, "done");
        assert_eq!(
            reply.images,
            vec![
                "data:image/png;base64,QUJD".to_string(),
                "data:image/jpeg;base64,REVG".to_string(),
            ]
        );
    }

    #[test]
    fn test_zero_candidates_yields_policy_blocked_fallback() {
        let reply = assemble_multimodal(parse(r#"{"candidates":[]}"#));
        assert_eq!(reply.text, POLICY_BLOCKED_TEXT);
        assert!(reply.images.is_empty());

        let reply = assemble_multimodal(parse(r#"{}"#));
        assert_eq!(reply.text, POLICY_BLOCKED_TEXT);
        assert!(reply.images.is_empty());
    }

    #[test]
    fn test_empty_part_list_yields_policy_blocked_fallback() {
        let reply = assemble_multimodal(parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#));
        assert_eq!(reply.text, POLICY_BLOCKED_TEXT);
        assert!(reply.images.is_empty());
    }

    #[test]
    fn test_only_first_candidate_is_used() {
        let reply = assemble_multimodal(parse(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"first"}]}},
                {"content":{"parts":[{"text":"second"}]}}
            ]}"#,
        ));
        assert_eq!(reply.text, "first");
    }
}
