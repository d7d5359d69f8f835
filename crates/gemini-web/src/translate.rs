//! Optional translation of prompts and answers
//!
//! Prompts in a language the provider does not answer natively are pivoted
//! to English before encoding; decoded answers are translated back to the
//! target language fragment by fragment. A failing backend never aborts a
//! call: the original text is kept and the failure is logged.

use std::sync::Arc;

use tracing::warn;

use crate::answer::Answer;
use crate::constants::{NATIVE_LANGUAGES, PIVOT_LANGUAGE};
use crate::ports::Translator;

pub(crate) struct TranslationAdapter {
    translator: Option<Arc<dyn Translator>>,
    language: Option<String>,
}

impl TranslationAdapter {
    pub(crate) fn new(translator: Option<Arc<dyn Translator>>, language: Option<String>) -> Self {
        if translator.is_none() {
            if let Some(lang) = language.as_deref() {
                if !is_native(lang) {
                    warn!(
                        "Language {lang:?} configured without a translator; text passes through untranslated"
                    );
                }
            }
        }
        Self {
            translator,
            language,
        }
    }

    fn target(&self) -> Option<(&dyn Translator, &str)> {
        let lang = self.language.as_deref()?;
        if is_native(lang) {
            return None;
        }
        let translator = self.translator.as_deref()?;
        Some((translator, lang))
    }

    /// Pivots an outbound prompt to English.
    pub(crate) async fn outbound(&self, text: &str) -> String {
        let Some((translator, _)) = self.target() else {
            return text.to_string();
        };
        match translator.translate(text, PIVOT_LANGUAGE).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Outbound translation failed, sending original text: {e}");
                text.to_string()
            }
        }
    }

    /// Translates the answer's text fragments in place; ids, links, images
    /// and code stay untouched.
    pub(crate) async fn localize(&self, answer: &mut Answer) {
        let Some((translator, lang)) = self.target() else {
            return;
        };

        answer.content = match translator.translate(&answer.content, lang).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Answer translation failed, keeping original text: {e}");
                return;
            }
        };

        for choice in &mut answer.choices {
            if let Some(first) = choice.content.first_mut() {
                match translator.translate(first, lang).await {
                    Ok(translated) => *first = translated,
                    Err(e) => warn!("Draft translation failed, keeping original text: {e}"),
                }
            }
        }
    }
}

fn is_native(lang: &str) -> bool {
    NATIVE_LANGUAGES.contains(&lang)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::Choice;
    use crate::error::Error;
    use async_trait::async_trait;

    struct Upper;

    #[async_trait]
    impl Translator for Upper {
        async fn translate(&self, text: &str, _target: &str) -> Result<String, Error> {
            Ok(text.to_uppercase())
        }
    }

    struct Broken;

    #[async_trait]
    impl Translator for Broken {
        async fn translate(&self, _text: &str, _target: &str) -> Result<String, Error> {
            Err(Error::Translation("backend down".into()))
        }
    }

    fn answer(content: &str) -> Answer {
        Answer {
            content: content.to_string(),
            conversation_id: "c".into(),
            response_id: "r".into(),
            factuality_queries: Vec::new(),
            text_query: String::new(),
            choices: vec![Choice {
                id: "rc_1".into(),
                content: vec![content.to_string()],
            }],
            links: Vec::new(),
            images: Vec::new(),
            program_lang: None,
            code: None,
            status_code: 200,
        }
    }

    #[tokio::test]
    async fn test_native_language_passes_through() {
        let adapter = TranslationAdapter::new(Some(Arc::new(Upper)), Some("en".into()));
        assert_eq!(adapter.outbound("hello").await, "hello");
    }

    #[tokio::test]
    async fn test_outbound_pivots_non_native() {
        let adapter = TranslationAdapter::new(Some(Arc::new(Upper)), Some("de".into()));
        assert_eq!(adapter.outbound("hallo").await, "HALLO");
    }

    #[tokio::test]
    async fn test_localize_translates_fragments() {
        let adapter = TranslationAdapter::new(Some(Arc::new(Upper)), Some("de".into()));
        let mut a = answer("hello");
        adapter.localize(&mut a).await;
        assert_eq!(a.content, "HELLO");
        assert_eq!(a.choices[0].content[0], "HELLO");
        assert_eq!(a.choices[0].id, "rc_1");
    }

    #[tokio::test]
    async fn test_failure_preserves_original_text() {
        let adapter = TranslationAdapter::new(Some(Arc::new(Broken)), Some("de".into()));
        assert_eq!(adapter.outbound("hallo").await, "hallo");

        let mut a = answer("hello");
        adapter.localize(&mut a).await;
        assert_eq!(a.content, "hello");
        assert_eq!(a.choices[0].content[0], "hello");
    }

    #[tokio::test]
    async fn test_no_translator_passes_through() {
        let adapter = TranslationAdapter::new(None, Some("de".into()));
        assert_eq!(adapter.outbound("hallo").await, "hallo");
    }
}
