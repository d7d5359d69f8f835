//! Client for the Gemini web front end
//!
//! This crate talks to the conversational endpoint behind gemini.google.com
//! the way the web app itself does: a cookie-authenticated session, an
//! anti-CSRF nonce scraped from the landing page, and batch-RPC envelopes
//! whose payloads are positionally indexed JSON arrays. It keeps the
//! conversation identifiers threaded across turns so multi-turn chats and
//! draft branching work like they do in the browser.
//!
//! External capabilities (translation, image upload, browser cookie stores,
//! code execution) are injected through the traits in [`ports`].

pub mod answer;
pub mod client;
pub mod constants;
pub mod decode;
pub mod envelope;
pub mod error;
pub mod ports;
pub mod session;
pub mod state;
mod translate;

pub use answer::{Answer, Choice, ExportedUrl, SpeechAudio};
pub use client::{AskOptions, GeminiClient, GeminiClientBuilder, ImageAttachment};
pub use envelope::Tool;
pub use error::Error;
pub use ports::{BrowserCookies, CodeRunner, ImageUploader, Translator};
pub use state::ConversationState;
