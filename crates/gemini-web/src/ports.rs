//! Capability ports
//!
//! External collaborators the client depends on but does not implement:
//! translation backends, the vendor upload service, browser cookie stores
//! and code interpreters. Each is an injected trait object, so absence of a
//! capability is a construction-time decision rather than runtime optional
//! state.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Error;

/// A natural-language translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates `text` into the `target` language code. The source
    /// language is detected by the backend.
    async fn translate(&self, text: &str, target: &str) -> Result<String, Error>;
}

/// The vendor upload service that turns image bytes into an attachment
/// reference usable in chat envelopes.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, bytes: &[u8]) -> Result<String, Error>;
}

/// A local browser cookie store the session cookies can be pulled from.
pub trait BrowserCookies: Send + Sync {
    /// Returns the Gemini session cookies by name.
    fn extract(&self) -> Result<HashMap<String, String>, Error>;
}

/// Executes a code snippet returned in an answer. Failures are reported by
/// the implementation's `Err`, but the client never lets them escape a
/// call.
pub trait CodeRunner: Send + Sync {
    fn run(&self, language: Option<&str>, code: &str) -> Result<(), Error>;
}
