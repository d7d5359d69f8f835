//! Construction of the vendor's request envelopes
//!
//! Payloads are sparse positional arrays serialized as JSON-in-JSON: the
//! inner array is serialized to a string, then wrapped in an outer array
//! that goes into the `f.req` form field. The shapes here mirror what the
//! web app sends and must be reproduced verbatim to avoid rejection.

use serde_json::{Value, json};
use uuid::Uuid;

use crate::state::ConversationState;

/// Reference to an already-uploaded image attachment.
#[derive(Debug, Clone)]
pub struct ImageRef {
    /// Upload reference returned by the upload service.
    pub reference: String,
    /// Short filename shown in the conversation.
    pub filename: String,
}

/// Provider-side tool a prompt may be routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Gmail,
    GoogleDocs,
    GoogleDrive,
    GoogleFlights,
    GoogleHotels,
    GoogleMaps,
    YouTube,
}

impl Tool {
    /// Wire selector embedded in the chat envelope.
    pub fn wire_id(&self) -> &'static str {
        match self {
            Self::Gmail => "workspace_tool_gmail",
            Self::GoogleDocs => "workspace_tool_docs",
            Self::GoogleDrive => "workspace_tool_drive",
            Self::GoogleFlights => "flights_tool",
            Self::GoogleHotels => "hotels_tool",
            Self::GoogleMaps => "maps_tool",
            Self::YouTube => "youtube_tool",
        }
    }
}

/// Builds the `f.req` value for a chat turn.
///
/// Empty continuation ids (first turn) are encoded as empty strings, which
/// the server reads as "start a new conversation".
pub fn chat_envelope(
    prompt: &str,
    state: &ConversationState,
    image: Option<&ImageRef>,
    tool: Option<Tool>,
) -> String {
    let attachments = match image {
        Some(img) => json!([[[img.reference, 1], img.filename]]),
        None => json!([]),
    };
    let tools = match tool {
        Some(t) => json!([[t.wire_id()]]),
        None => json!([]),
    };

    let inner = json!([
        [prompt, 0, null, attachments, null, null, 0],
        ["en"],
        [
            state.conversation_id,
            state.response_id,
            state.choice_id,
            null,
            null,
            []
        ],
        "", // opaque blob the web app sends; accepted empty
        Uuid::new_v4().simple().to_string(),
        null,
        [1],
        0,
        [],
        tools,
    ]);

    json!([null, inner.to_string()]).to_string()
}

/// Wraps an RPC payload in the batch-execute envelope.
pub fn batch_envelope(rpc_id: &str, payload: &Value) -> String {
    json!([[[rpc_id, payload.to_string(), null, "generic"]]]).to_string()
}

/// Inner payload for speech synthesis.
pub fn speech_payload(text: &str, lang: &str) -> Value {
    json!([null, text, lang, null, 2])
}

/// Inner payload for a share-link export of one conversation turn.
pub fn share_payload(
    conversation_id: &str,
    response_id: &str,
    choice_id: &str,
    title: &str,
) -> Value {
    json!([[conversation_id, response_id, choice_id], title])
}

/// Inner payload for a sandbox export of a code snippet.
pub fn sandbox_payload(instructions: &str, code: &str, filename: &str) -> Value {
    json!([instructions, 5, code, [[filename, code]]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwrap_inner(envelope: &str) -> Value {
        let outer: Value = serde_json::from_str(envelope).unwrap();
        assert!(outer[0].is_null());
        serde_json::from_str(outer[1].as_str().unwrap()).unwrap()
    }

    #[test]
    fn test_first_turn_sends_empty_ids() {
        let state = ConversationState::new();
        let inner = unwrap_inner(&chat_envelope("hi", &state, None, None));

        assert_eq!(inner[0][0], "hi");
        assert_eq!(inner[2][0], "");
        assert_eq!(inner[2][1], "");
        assert_eq!(inner[2][2], "");
    }

    #[test]
    fn test_continuation_embeds_state() {
        let mut state = ConversationState::new();
        state.advance("c_1", "r_1", "rc_1");
        let inner = unwrap_inner(&chat_envelope("again", &state, None, None));

        assert_eq!(inner[2][0], "c_1");
        assert_eq!(inner[2][1], "r_1");
        assert_eq!(inner[2][2], "rc_1");
    }

    #[test]
    fn test_image_reference_and_filename() {
        let state = ConversationState::new();
        let image = ImageRef {
            reference: "upload/ref123".into(),
            filename: "cat.jpg".into(),
        };
        let inner = unwrap_inner(&chat_envelope("what is this", &state, Some(&image), None));

        assert_eq!(inner[0][3][0][0][0], "upload/ref123");
        assert_eq!(inner[0][3][0][0][1], 1);
        assert_eq!(inner[0][3][0][1], "cat.jpg");
    }

    #[test]
    fn test_tool_selector_embedded() {
        let state = ConversationState::new();
        let inner = unwrap_inner(&chat_envelope("mail", &state, None, Some(Tool::Gmail)));
        assert_eq!(inner[9][0][0], "workspace_tool_gmail");
    }

    #[test]
    fn test_per_request_marker_is_unique() {
        let state = ConversationState::new();
        let a = unwrap_inner(&chat_envelope("x", &state, None, None));
        let b = unwrap_inner(&chat_envelope("x", &state, None, None));
        assert_ne!(a[4], b[4]);
        assert_eq!(a[4].as_str().unwrap().len(), 32);
    }

    #[test]
    fn test_batch_envelope_shape() {
        let envelope = batch_envelope("XqA3Ic", &speech_payload("hello", "en-US"));
        let outer: Value = serde_json::from_str(&envelope).unwrap();
        let rpc = &outer[0][0];

        assert_eq!(rpc[0], "XqA3Ic");
        assert_eq!(rpc[3], "generic");
        let payload: Value = serde_json::from_str(rpc[1].as_str().unwrap()).unwrap();
        assert_eq!(payload[1], "hello");
        assert_eq!(payload[2], "en-US");
        assert_eq!(payload[4], 2);
    }

    #[test]
    fn test_sandbox_payload_carries_file_pair() {
        let payload = sandbox_payload("", "print(1)", "main.py");
        assert_eq!(payload[1], 5);
        assert_eq!(payload[2], "print(1)");
        assert_eq!(payload[3][0][0], "main.py");
        assert_eq!(payload[3][0][1], "print(1)");
    }
}
