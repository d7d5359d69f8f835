//! The client itself: one cookie-authenticated session plus the public
//! operations (ask, speech, share export, sandbox export).
//!
//! Every operation runs its network round-trips sequentially and mutates
//! only instance-local state; callers that want parallelism use independent
//! client instances.

use std::sync::Arc;

use common::Config;
use tracing::{debug, info, warn};

use crate::answer::{Answer, ExportedUrl, SpeechAudio};
use crate::constants::{
    BATCH_EXECUTE_URL, BUILD_LABEL, DEFAULT_SPEECH_LANG, RPC_SANDBOX_EXPORT, RPC_SHARE_EXPORT,
    RPC_SPEECH, STREAM_GENERATE_URL, sandbox_filename,
};
use crate::decode;
use crate::envelope::{self, ImageRef, Tool};
use crate::error::{Error, Result};
use crate::ports::{BrowserCookies, CodeRunner, ImageUploader, Translator};
use crate::session::{self, resolve_credential};
use crate::state::ConversationState;
use crate::translate::TranslationAdapter;

/// An image to attach to a prompt. Uploading happens through the configured
/// [`ImageUploader`] right before the request is encoded.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl ImageAttachment {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }
}

/// Optional extras for a single ask.
#[derive(Default)]
pub struct AskOptions {
    pub image: Option<ImageAttachment>,
    pub tool: Option<Tool>,
}

/// Client for the Gemini web front end.
pub struct GeminiClient {
    http: reqwest::Client,
    nonce: String,
    state: ConversationState,
    translation: TranslationAdapter,
    uploader: Option<Arc<dyn ImageUploader>>,
    code_runner: Option<Arc<dyn CodeRunner>>,
    run_code: bool,
}

/// Builder wiring configuration and capability ports into a ready client.
#[derive(Default)]
pub struct GeminiClientBuilder {
    config: Config,
    http: Option<reqwest::Client>,
    translator: Option<Arc<dyn Translator>>,
    uploader: Option<Arc<dyn ImageUploader>>,
    browser_cookies: Option<Arc<dyn BrowserCookies>>,
    code_runner: Option<Arc<dyn CodeRunner>>,
}

impl GeminiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = Some(language.into());
        self
    }

    /// Resume a previous conversation instead of starting fresh.
    pub fn conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.config.conversation_id = Some(conversation_id.into());
        self
    }

    /// Use an externally built HTTP client as-is (cookies, proxy and
    /// timeout included).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn image_uploader(mut self, uploader: Arc<dyn ImageUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn browser_cookies(mut self, source: Arc<dyn BrowserCookies>) -> Self {
        self.browser_cookies = Some(source);
        self
    }

    pub fn code_runner(mut self, runner: Arc<dyn CodeRunner>) -> Self {
        self.code_runner = Some(runner);
        self
    }

    /// Resolves the credential, builds the session and fetches the nonce.
    /// One network GET against the landing page.
    pub async fn build(self) -> Result<GeminiClient> {
        let config = self.config;

        let browser = if config.token_from_browser {
            self.browser_cookies.as_deref()
        } else {
            None
        };
        let credential = resolve_credential(
            config.token.clone(),
            std::env::var(common::config::ENV_TOKEN).ok(),
            browser,
            config.multi_cookies,
        )?;

        let http = match self.http {
            Some(http) => http,
            None => session::build_http_client(&config, &credential)?,
        };
        let nonce = session::fetch_nonce(&http).await?;

        let state = match config.conversation_id.as_deref() {
            Some(id) => ConversationState::resume(id),
            None => ConversationState::new(),
        };
        info!(
            "Session established (resuming: {})",
            !state.conversation_id.is_empty()
        );

        Ok(GeminiClient {
            http,
            nonce,
            state,
            translation: TranslationAdapter::new(self.translator, config.language.clone()),
            uploader: self.uploader,
            code_runner: self.code_runner,
            run_code: config.run_code,
        })
    }
}

impl GeminiClient {
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Asks a plain text question on the current conversation.
    pub async fn ask(&mut self, prompt: &str) -> Result<Answer> {
        self.ask_with(prompt, AskOptions::default()).await
    }

    /// Asks with optional image attachment and tool routing.
    pub async fn ask_with(&mut self, prompt: &str, options: AskOptions) -> Result<Answer> {
        let outbound = self.translation.outbound(prompt).await;

        let image = match options.image {
            Some(attachment) => Some(self.upload_image(attachment).await?),
            None => None,
        };

        let envelope =
            envelope::chat_envelope(&outbound, &self.state, image.as_ref(), options.tool);
        let reqid = self.state.request_id().to_string();

        debug!("Sending chat request (_reqid {reqid})");
        let response = self
            .http
            .post(STREAM_GENERATE_URL)
            .query(&[("bl", BUILD_LABEL), ("_reqid", reqid.as_str()), ("rt", "c")])
            .form(&[("f.req", envelope.as_str()), ("at", self.nonce.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("chat endpoint returned {status}")));
        }
        let body = response.text().await?;

        let mut answer = decode::chat_payload(&body)?.into_answer(status.as_u16())?;
        self.translation.localize(&mut answer).await;

        if let Some(first) = answer.choices.first() {
            let choice_id = first.id.clone();
            self.state
                .advance(&answer.conversation_id, &answer.response_id, choice_id);
        }
        self.state.bump_request_id();

        self.maybe_run_code(&answer);
        Ok(answer)
    }

    /// Synthesizes speech for a piece of text. `lang` defaults to en-US.
    pub async fn speech(&self, text: &str, lang: Option<&str>) -> Result<SpeechAudio> {
        let lang = lang.unwrap_or(DEFAULT_SPEECH_LANG);
        let payload = envelope::speech_payload(text, lang);
        let reqid = self.state.request_id().to_string();

        let (status_code, body) = self
            .batch_execute(
                RPC_SPEECH,
                &payload,
                &[("bl", BUILD_LABEL), ("_reqid", reqid.as_str()), ("rt", "c")],
            )
            .await?;

        Ok(SpeechAudio {
            audio: decode::speech_audio(&body)?,
            status_code,
        })
    }

    /// Exports one answered turn as a public share link.
    pub async fn export_conversation(
        &mut self,
        answer: &Answer,
        title: &str,
    ) -> Result<ExportedUrl> {
        let choice_id = answer
            .choices
            .first()
            .map(|choice| choice.id.as_str())
            .ok_or_else(|| Error::Config("answer has no drafts to share".into()))?;
        let payload = envelope::share_payload(
            &answer.conversation_id,
            &answer.response_id,
            choice_id,
            title,
        );

        let (status_code, body) = self
            .batch_execute(
                RPC_SHARE_EXPORT,
                &payload,
                &[
                    ("rpcids", RPC_SHARE_EXPORT),
                    ("source-path", "/"),
                    ("bl", BUILD_LABEL),
                    ("rt", "c"),
                ],
            )
            .await?;

        let url = decode::share_url(&body)?;
        self.state.bump_request_id();
        Ok(ExportedUrl { url, status_code })
    }

    /// Exports a code snippet to the online sandbox. Unsupported languages
    /// need an explicit filename.
    pub async fn export_replit(
        &mut self,
        code: &str,
        program_lang: Option<&str>,
        filename: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<ExportedUrl> {
        let filename = resolve_sandbox_filename(program_lang, filename)?;
        let payload = envelope::sandbox_payload(instructions.unwrap_or(""), code, &filename);
        let reqid = self.state.request_id().to_string();

        let (status_code, body) = self
            .batch_execute(
                RPC_SANDBOX_EXPORT,
                &payload,
                &[
                    ("rpcids", RPC_SANDBOX_EXPORT),
                    ("source-path", "/"),
                    ("bl", BUILD_LABEL),
                    ("_reqid", reqid.as_str()),
                    ("rt", "c"),
                ],
            )
            .await?;

        let url = decode::sandbox_url(&body)?;
        self.state.bump_request_id();
        Ok(ExportedUrl { url, status_code })
    }

    /// Re-fetches the landing-page nonce (after long-lived sessions go
    /// stale).
    pub async fn refresh_nonce(&mut self) -> Result<()> {
        self.nonce = session::fetch_nonce(&self.http).await?;
        Ok(())
    }

    /// Current conversation state, snapshotable via serde.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Restores a previously snapshotted conversation.
    pub fn set_state(&mut self, state: ConversationState) {
        self.state = state;
    }

    /// Continues the next turn from a different draft of the last answer.
    pub fn select_choice(&mut self, choice_id: impl Into<String>) {
        self.state.select_choice(choice_id);
    }

    /// Starts a new conversation on the same session.
    pub fn reset_conversation(&mut self) {
        self.state.reset();
    }

    async fn batch_execute(
        &self,
        rpc_id: &str,
        payload: &serde_json::Value,
        query: &[(&str, &str)],
    ) -> Result<(u16, String)> {
        let envelope = envelope::batch_envelope(rpc_id, payload);
        debug!("Calling batch RPC {rpc_id}");
        let response = self
            .http
            .post(BATCH_EXECUTE_URL)
            .query(query)
            .form(&[("f.req", envelope.as_str()), ("at", self.nonce.as_str())])
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn upload_image(&self, attachment: ImageAttachment) -> Result<ImageRef> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| Error::Config("image prompts need an ImageUploader".into()))?;
        let reference = uploader.upload(&attachment.bytes).await?;
        Ok(ImageRef {
            reference,
            filename: attachment.filename,
        })
    }

    fn maybe_run_code(&self, answer: &Answer) {
        if !self.run_code {
            return;
        }
        let Some(code) = answer.code.as_deref() else {
            return;
        };
        let Some(runner) = self.code_runner.as_deref() else {
            warn!("run_code enabled but no CodeRunner configured");
            return;
        };
        if let Err(e) = runner.run(answer.program_lang.as_deref(), code) {
            warn!("Code execution failed: {e}");
        }
    }
}

fn resolve_sandbox_filename(program_lang: Option<&str>, filename: Option<&str>) -> Result<String> {
    if let Some(name) = filename {
        return Ok(name.to_string());
    }
    let lang = program_lang.unwrap_or_default();
    sandbox_filename(lang)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Upstream(format!(
                "language {lang:?} is not supported by the sandbox; set a filename explicitly"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn stub_body(conv: &str, resp: &str, choice: &str) -> String {
        let payload = json!([
            null,
            [conv, resp],
            ["query"],
            [],
            [[choice, ["answer text"]]]
        ]);
        format!(
            ")]}}'\n\n1\n{}\n",
            json!([["wrb.fr", null, payload.to_string()]])
        )
    }

    fn envelope_ids(envelope: &str) -> Value {
        let outer: Value = serde_json::from_str(envelope).unwrap();
        let inner: Value = serde_json::from_str(outer[1].as_str().unwrap()).unwrap();
        inner[2].clone()
    }

    #[test]
    fn test_conversation_continuity_round_trip() {
        let mut state = ConversationState::new();

        // First turn goes out with empty continuation ids.
        let first = envelope::chat_envelope("hi", &state, None, None);
        assert_eq!(envelope_ids(&first), json!(["", "", "", null, null, []]));

        // Decoding a stubbed response seeds the next request.
        let answer = decode::chat_payload(&stub_body("c_1", "r_1", "rc_1"))
            .unwrap()
            .into_answer(200)
            .unwrap();
        state.advance(
            &answer.conversation_id,
            &answer.response_id,
            &answer.choices[0].id,
        );
        state.bump_request_id();

        let second = envelope::chat_envelope("again", &state, None, None);
        assert_eq!(
            envelope_ids(&second),
            json!(["c_1", "r_1", "rc_1", null, null, []])
        );
    }

    #[test]
    fn test_continuity_across_many_turns() {
        let mut state = ConversationState::new();
        for turn in 0..4 {
            let envelope = envelope::chat_envelope("q", &state, None, None);
            let ids = envelope_ids(&envelope);
            if turn == 0 {
                assert_eq!(ids[0], "");
            } else {
                assert_eq!(ids[0], format!("c_{}", turn - 1));
                assert_eq!(ids[1], format!("r_{}", turn - 1));
            }

            let body = stub_body(
                &format!("c_{turn}"),
                &format!("r_{turn}"),
                &format!("rc_{turn}"),
            );
            let answer = decode::chat_payload(&body)
                .unwrap()
                .into_answer(200)
                .unwrap();
            state.advance(
                &answer.conversation_id,
                &answer.response_id,
                &answer.choices[0].id,
            );
            state.bump_request_id();
        }
        assert_eq!(state.conversation_id, "c_3");
    }

    #[test]
    fn test_sandbox_filename_resolution() {
        assert_eq!(
            resolve_sandbox_filename(Some("python"), None).unwrap(),
            "main.py"
        );
        assert_eq!(
            resolve_sandbox_filename(Some("brainfuck"), Some("bf.b")).unwrap(),
            "bf.b"
        );
        assert!(matches!(
            resolve_sandbox_filename(Some("brainfuck"), None),
            Err(Error::Upstream(_))
        ));
        assert!(matches!(
            resolve_sandbox_filename(None, None),
            Err(Error::Upstream(_))
        ));
    }
}
