use thiserror::Error;

/// Errors surfaced by the client.
///
/// Transport and authentication failures are hard errors; structural
/// mismatches in optional payload fields never reach here — the decoder
/// falls back to empty defaults for those.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential, or required cookies missing.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider answered, but not with what the client needs
    /// (non-200 landing page, missing nonce, rejected operation).
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Every candidate payload line was empty or null. Usually stale
    /// cookies or an account/network block; the raw body is kept for
    /// diagnostics.
    #[error("upstream returned no usable payload")]
    EmptyResponse { raw: String },

    /// A required slot of the nested payload was absent or mistyped.
    #[error("malformed response payload: {0}")]
    Parse(String),

    /// A translation backend failed.
    #[error("translation failed: {0}")]
    Translation(String),

    /// An option combination the client cannot act on.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Connection, TLS, timeout or other transport-layer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
