//! Wire-level constants for the Gemini web front end
//!
//! Everything here is reverse-engineered from browser traffic and subject to
//! drift on the provider's side. The line offsets and positional indices are
//! framing observations, not protocol guarantees.

/// Landing page; also the origin every request must claim.
pub const GEMINI_BASE_URL: &str = "https://gemini.google.com";

/// Streaming chat endpoint.
pub const STREAM_GENERATE_URL: &str =
    "https://gemini.google.com/_/BardChatUi/data/assistant.lamda.BardFrontendService/StreamGenerate";

/// Batch-RPC endpoint used for speech, share-link export and sandbox export.
pub const BATCH_EXECUTE_URL: &str = "https://gemini.google.com/_/BardChatUi/data/batchexecute";

/// Build label sent as the `bl` query parameter on every call.
pub const BUILD_LABEL: &str = "boq_assistant-bard-web-server_20230716.16_p2";

// =============================================================================
// Batch-RPC method ids
// =============================================================================

/// Speech synthesis.
pub const RPC_SPEECH: &str = "XqA3Ic";

/// Share-link export of a conversation turn.
pub const RPC_SHARE_EXPORT: &str = "fuVx7";

/// Code export to the online sandbox.
pub const RPC_SANDBOX_EXPORT: &str = "qACoKe";

/// Share links are shortened under this prefix.
pub const SHARE_URL_PREFIX: &str = "https://g.co/bard/share/";

// =============================================================================
// Response framing
// =============================================================================

/// Chat payload lines start with this envelope marker.
pub const PAYLOAD_LINE_MARKER: &str = "[[\"wrb.fr";

/// Line offsets from the end of the body to probe when no marker line is
/// present. Tied to the current response framing; adjust on drift.
pub const FALLBACK_LINE_OFFSETS: &[usize] = &[5, 7];

/// Line index carrying the payload in batch-RPC responses.
pub const BATCH_PAYLOAD_LINE: usize = 3;

// =============================================================================
// Session cookies and headers
// =============================================================================

/// The credential cookie. Its value is what the client calls "the token".
pub const PRIMARY_COOKIE: &str = "__Secure-1PSID";

/// Full cookie set required in multi-cookie mode.
pub const REQUIRED_COOKIES: &[&str] = &[
    "__Secure-1PSID",
    "__Secure-1PSIDTS",
    "__Secure-1PSIDCC",
    "NID",
];

/// Browser-imitating default headers attached to the session.
pub const SESSION_HEADERS: &[(&str, &str)] = &[
    ("Host", "gemini.google.com"),
    ("X-Same-Domain", "1"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36",
    ),
    ("Content-Type", "application/x-www-form-urlencoded;charset=UTF-8"),
    ("Origin", "https://gemini.google.com"),
    ("Referer", "https://gemini.google.com/"),
];

// =============================================================================
// Request id
// =============================================================================

/// Fixed increment applied to the `_reqid` parameter after every exchange.
/// Only uniqueness/ordering matters; the value is reproduced verbatim.
pub const REQUEST_ID_STEP: u64 = 100_000;

// =============================================================================
// Languages
// =============================================================================

/// Languages the provider answers natively; no pivot translation needed.
pub const NATIVE_LANGUAGES: &[&str] = &["en", "ko", "ja"];

/// Pivot language for outbound prompts when translating.
pub const PIVOT_LANGUAGE: &str = "en";

/// Default speech synthesis voice locale.
pub const DEFAULT_SPEECH_LANG: &str = "en-US";

// =============================================================================
// Sandbox export
// =============================================================================

/// Languages the sandbox export accepts, with the filename each maps to.
/// Other languages need an explicit filename override.
pub const SANDBOX_LANGUAGE_FILES: &[(&str, &str)] = &[
    ("python", "main.py"),
    ("javascript", "index.js"),
    ("typescript", "main.ts"),
    ("go", "main.go"),
    ("java", "Main.java"),
    ("kotlin", "main.kt"),
    ("php", "index.php"),
    ("c#", "main.cs"),
    ("swift", "main.swift"),
    ("r", "main.r"),
    ("ruby", "main.rb"),
    ("c", "main.c"),
    ("c++", "main.cpp"),
    ("matlab", "main.m"),
    ("scala", "main.scala"),
    ("sql", "main.sql"),
    ("html", "index.html"),
    ("css", "style.css"),
    ("rust", "main.rs"),
    ("perl", "main.pl"),
];

/// Looks up the sandbox filename for a program language, if supported.
pub fn sandbox_filename(language: &str) -> Option<&'static str> {
    let needle = language.to_ascii_lowercase();
    SANDBOX_LANGUAGE_FILES
        .iter()
        .find(|(lang, _)| *lang == needle)
        .map(|(_, file)| *file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_filename_lookup() {
        assert_eq!(sandbox_filename("python"), Some("main.py"));
        assert_eq!(sandbox_filename("Rust"), Some("main.rs"));
        assert_eq!(sandbox_filename("brainfuck"), None);
    }
}
