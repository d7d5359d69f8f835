//! Decoding of the provider's streamed response bodies
//!
//! Responses are newline-delimited: each line is a JSON array whose third
//! element is a JSON-encoded *string* containing the real payload array, so
//! every payload is decoded twice. Payload lines are located by the
//! `[["wrb.fr` envelope marker; fixed offsets from the end of the body are
//! kept as a fallback for bodies that carry no marker.
//!
//! All positional knowledge about the resolved payload lives in this module
//! as named indices; everything else goes through the accessors on
//! [`ChatPayload`]. When the provider's framing drifts, this is the only
//! file that needs touching.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tracing::debug;

use crate::answer::{Answer, Choice};
use crate::constants::{
    BATCH_PAYLOAD_LINE, FALLBACK_LINE_OFFSETS, PAYLOAD_LINE_MARKER, SHARE_URL_PREFIX,
};
use crate::error::Error;

// Layout of the resolved chat payload array.
const IDX_IDENTIFIERS: usize = 1; // [conversation_id, response_id]
const IDX_QUERY_ECHO: usize = 2; // [echoed query text, ...]
const IDX_FACTUALITY: usize = 3;
const IDX_DRAFTS: usize = 4; // [[id, [fragments...], _, _, images], ...]

// Layout of one draft entry.
const IDX_DRAFT_ID: usize = 0;
const IDX_DRAFT_FRAGMENTS: usize = 1;
const IDX_DRAFT_IMAGES: usize = 4;

/// A resolved chat payload with named accessors over the positional array.
#[derive(Debug, Clone)]
pub struct ChatPayload {
    root: Value,
}

/// Double-decodes one response line into its payload array.
/// Returns `None` for heartbeat lines and null payload slots.
fn decode_line(line: &str) -> Option<Value> {
    let outer: Value = serde_json::from_str(line).ok()?;
    let inner = outer.get(0)?.get(2)?.as_str()?;
    serde_json::from_str(inner).ok()
}

fn has_drafts(payload: &Value) -> bool {
    payload
        .get(IDX_DRAFTS)
        .and_then(Value::as_array)
        .is_some_and(|drafts| !drafts.is_empty())
}

/// Locates and resolves the chat payload within a response body.
///
/// The last marker line with a non-empty draft list wins; earlier lines are
/// tried next because the provider sometimes emits a heartbeat line after
/// the real payload. Bodies without any usable payload surface as
/// [`Error::EmptyResponse`] with the raw body attached for diagnostics.
pub fn chat_payload(body: &str) -> Result<ChatPayload, Error> {
    let lines: Vec<&str> = body.lines().collect();

    let mut candidates: Vec<Value> = lines
        .iter()
        .filter(|line| line.starts_with(PAYLOAD_LINE_MARKER))
        .filter_map(|line| decode_line(line))
        .collect();

    if candidates.is_empty() {
        debug!("No marker lines in response; probing fixed offsets");
        for &offset in FALLBACK_LINE_OFFSETS {
            if lines.len() >= offset {
                if let Some(payload) = decode_line(lines[lines.len() - offset]) {
                    candidates.push(payload);
                }
            }
        }
    }

    for payload in candidates.into_iter().rev() {
        if has_drafts(&payload) {
            return Ok(ChatPayload { root: payload });
        }
    }

    Err(Error::EmptyResponse {
        raw: body.to_string(),
    })
}

impl ChatPayload {
    pub fn conversation_id(&self) -> Option<&str> {
        self.root
            .get(IDX_IDENTIFIERS)
            .and_then(|ids| ids.get(0))
            .and_then(Value::as_str)
    }

    pub fn response_id(&self) -> Option<&str> {
        self.root
            .get(IDX_IDENTIFIERS)
            .and_then(|ids| ids.get(1))
            .and_then(Value::as_str)
    }

    /// The query as echoed back by the provider, empty when absent.
    pub fn text_query(&self) -> String {
        self.root
            .get(IDX_QUERY_ECHO)
            .and_then(|echo| echo.get(0))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn factuality_queries(&self) -> Vec<Value> {
        self.root
            .get(IDX_FACTUALITY)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Candidate drafts. Entries without a continuation id are skipped.
    pub fn choices(&self) -> Vec<Choice> {
        let Some(drafts) = self.root.get(IDX_DRAFTS).and_then(Value::as_array) else {
            return Vec::new();
        };
        drafts
            .iter()
            .filter_map(|draft| {
                let id = draft.get(IDX_DRAFT_ID)?.as_str()?.to_string();
                let content = draft
                    .get(IDX_DRAFT_FRAGMENTS)
                    .and_then(Value::as_array)
                    .map(|fragments| {
                        fragments
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Some(Choice { id, content })
            })
            .collect()
    }

    /// Image URLs attached to the accepted draft; empty on any mismatch.
    pub fn images(&self) -> Vec<String> {
        self.root
            .get(IDX_DRAFTS)
            .and_then(|drafts| drafts.get(0))
            .and_then(|draft| draft.get(IDX_DRAFT_IMAGES))
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .filter_map(|img| img.get(0)?.get(0)?.get(0)?.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Absolute URLs anywhere in the drafts tree.
    pub fn links(&self) -> Vec<String> {
        self.root
            .get(IDX_DRAFTS)
            .map(extract_links)
            .unwrap_or_default()
    }

    /// Assembles the caller-facing answer. Identifiers and at least one
    /// draft are required; everything else defaults to empty.
    pub fn into_answer(self, status_code: u16) -> Result<Answer, Error> {
        let conversation_id = self
            .conversation_id()
            .ok_or_else(|| Error::Parse("payload is missing the conversation id".into()))?
            .to_string();
        let response_id = self
            .response_id()
            .ok_or_else(|| Error::Parse("payload is missing the response id".into()))?
            .to_string();

        let choices = self.choices();
        let content = choices
            .first()
            .and_then(|choice| choice.text())
            .ok_or_else(|| Error::Parse("payload has no usable draft".into()))?
            .to_string();

        let (program_lang, code) = match extract_code(&content) {
            Some((lang, body)) => (Some(lang), Some(body)),
            None => (None, None),
        };

        Ok(Answer {
            text_query: self.text_query(),
            factuality_queries: self.factuality_queries(),
            links: self.links(),
            images: self.images(),
            content,
            conversation_id,
            response_id,
            choices,
            program_lang,
            code,
            status_code,
        })
    }
}

/// Recursively collects every string that looks like an absolute URL,
/// skipping favicon assets. Idempotent over an already-flat link list.
pub fn extract_links(value: &Value) -> Vec<String> {
    let mut links = Vec::new();
    collect_links(value, &mut links);
    links
}

fn collect_links(value: &Value, links: &mut Vec<String>) {
    if let Value::Array(items) = value {
        for item in items {
            match item {
                Value::Array(_) => collect_links(item, links),
                Value::String(s) if s.starts_with("http") && !s.contains("favicon") => {
                    links.push(s.clone());
                }
                _ => {}
            }
        }
    }
}

/// Finds the first fenced code block in `content`.
///
/// The text between the opening delimiter and the first newline is the
/// declared language (possibly empty); the remainder up to the closing
/// delimiter is the body. No fence, no code — not an error.
pub fn extract_code(content: &str) -> Option<(String, String)> {
    let open = content.find("```")?;
    let after = &content[open + 3..];
    let newline = after.find('\n')?;
    let language = after[..newline].trim().to_string();
    let rest = &after[newline + 1..];
    let body = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some((language, body.to_string()))
}

/// Resolves the payload of a batch-RPC response body.
fn batch_payload(body: &str) -> Result<Value, Error> {
    let lines: Vec<&str> = body.lines().collect();

    let fixed = lines
        .get(BATCH_PAYLOAD_LINE)
        .and_then(|line| decode_line(line));
    let payload = fixed.or_else(|| {
        lines
            .iter()
            .filter(|line| line.starts_with(PAYLOAD_LINE_MARKER))
            .find_map(|line| decode_line(line))
    });

    payload.ok_or_else(|| Error::EmptyResponse {
        raw: body.to_string(),
    })
}

/// Decodes the base64 audio out of a speech response body.
pub fn speech_audio(body: &str) -> Result<Vec<u8>, Error> {
    let payload = batch_payload(body)?;
    let encoded = payload
        .get(0)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse("speech payload is missing the audio slot".into()))?;
    BASE64
        .decode(encoded)
        .map_err(|e| Error::Parse(format!("speech audio is not valid base64: {e}")))
}

/// Extracts the share id out of an export response body and expands it
/// into the public share URL.
pub fn share_url(body: &str) -> Result<String, Error> {
    let payload = batch_payload(body)?;
    let id = payload
        .get(2)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse("share payload is missing the url id".into()))?;
    Ok(format!("{SHARE_URL_PREFIX}{id}"))
}

/// Extracts the sandbox URL out of an export response body.
pub fn sandbox_url(body: &str) -> Result<String, Error> {
    let payload = batch_payload(body)?;
    payload
        .get(0)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Parse("sandbox payload is missing the url slot".into()))
}
