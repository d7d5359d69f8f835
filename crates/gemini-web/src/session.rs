//! Session construction: credential resolution, the cookie-authenticated
//! HTTP client, and the anti-CSRF nonce scraped from the landing page.

use std::collections::HashMap;
use std::sync::Arc;

use common::Config;
use regex::Regex;
use reqwest::Url;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::constants::{GEMINI_BASE_URL, PRIMARY_COOKIE, REQUIRED_COOKIES, SESSION_HEADERS};
use crate::error::Error;
use crate::ports::BrowserCookies;

/// A resolved credential: the `__Secure-1PSID` value plus any companion
/// cookies that came with it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub cookies: HashMap<String, String>,
}

impl Credential {
    fn bare(token: String) -> Self {
        Self {
            token,
            cookies: HashMap::new(),
        }
    }
}

/// Resolves the credential with strict precedence: explicit token, then
/// environment, then the browser cookie source.
pub fn resolve_credential(
    explicit: Option<String>,
    env_token: Option<String>,
    browser: Option<&dyn BrowserCookies>,
    multi_cookies: bool,
) -> Result<Credential, Error> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Ok(Credential::bare(token));
    }
    if let Some(token) = env_token.filter(|t| !t.is_empty()) {
        return Ok(Credential::bare(token));
    }

    if let Some(source) = browser {
        let cookies = source.extract()?;
        if multi_cookies {
            let missing: Vec<&str> = REQUIRED_COOKIES
                .iter()
                .copied()
                .filter(|name| !cookies.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                return Err(Error::Authentication(format!(
                    "browser cookie store is missing required cookies: {}",
                    missing.join(", ")
                )));
            }
        }
        return match cookies.get(PRIMARY_COOKIE) {
            Some(token) => Ok(Credential {
                token: token.clone(),
                cookies,
            }),
            None => Err(Error::Authentication(format!(
                "browser cookie store has no {PRIMARY_COOKIE} cookie"
            ))),
        };
    }

    Err(Error::Authentication(format!(
        "no credential found; pass a token, set {}, or enable browser extraction",
        common::config::ENV_TOKEN
    )))
}

/// Builds the cookie-authenticated HTTP client with the browser-imitating
/// headers, proxy and timeout applied.
pub fn build_http_client(config: &Config, credential: &Credential) -> Result<reqwest::Client, Error> {
    let mut headers = HeaderMap::new();
    for &(name, value) in SESSION_HEADERS {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("invalid session header {name:?}: {e}")))?;
        headers.insert(header, HeaderValue::from_static(value));
    }

    let base: Url = GEMINI_BASE_URL
        .parse()
        .map_err(|e| Error::Config(format!("invalid base url: {e}")))?;

    let jar = Arc::new(Jar::default());
    jar.add_cookie_str(
        &cookie_header(PRIMARY_COOKIE, &credential.token),
        &base,
    );
    for (name, value) in credential.cookies.iter().chain(config.cookies.iter()) {
        if name != PRIMARY_COOKIE {
            jar.add_cookie_str(&cookie_header(name, value), &base);
        }
    }

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .cookie_provider(jar)
        .timeout(config.timeout());
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    Ok(builder.build()?)
}

fn cookie_header(name: &str, value: &str) -> String {
    format!("{name}={value}; Domain=.google.com; Path=/; Secure")
}

/// Fetches the landing page and scrapes the anti-CSRF nonce out of it.
/// A missing nonce means the cookies no longer carry a valid session.
pub async fn fetch_nonce(http: &reqwest::Client) -> Result<String, Error> {
    debug!("Fetching landing page for the anti-CSRF nonce");
    let response = http.get(GEMINI_BASE_URL).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Upstream(format!("landing page returned {status}")));
    }
    let body = response.text().await?;
    scrape_nonce(&body).ok_or_else(|| {
        Error::Upstream(
            "nonce not found in the landing page; cookies are likely stale or invalid".into(),
        )
    })
}

pub(crate) fn scrape_nonce(body: &str) -> Option<String> {
    let re = Regex::new(r#"nonce="([^"]+)""#).ok()?;
    Some(re.captures(body)?.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubCookies(HashMap<String, String>);

    impl BrowserCookies for StubCookies {
        fn extract(&self) -> Result<HashMap<String, String>, Error> {
            Ok(self.0.clone())
        }
    }

    fn browser_with(names: &[&str]) -> StubCookies {
        StubCookies(
            names
                .iter()
                .map(|n| (n.to_string(), format!("value-of-{n}")))
                .collect(),
        )
    }

    #[test]
    fn test_explicit_token_wins() {
        let browser = browser_with(&[PRIMARY_COOKIE]);
        let credential = resolve_credential(
            Some("explicit".into()),
            Some("from-env".into()),
            Some(&browser),
            false,
        )
        .unwrap();
        assert_eq!(credential.token, "explicit");
    }

    #[test]
    fn test_env_token_beats_browser() {
        let browser = browser_with(&[PRIMARY_COOKIE]);
        let credential =
            resolve_credential(None, Some("from-env".into()), Some(&browser), false).unwrap();
        assert_eq!(credential.token, "from-env");
    }

    #[test]
    fn test_browser_is_last_resort() {
        let browser = browser_with(&[PRIMARY_COOKIE]);
        let credential = resolve_credential(None, None, Some(&browser), false).unwrap();
        assert_eq!(credential.token, format!("value-of-{PRIMARY_COOKIE}"));
    }

    #[test]
    fn test_no_source_is_authentication_error() {
        match resolve_credential(None, None, None, false) {
            Err(Error::Authentication(_)) => {}
            other => panic!("expected Authentication, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_explicit_token_falls_through() {
        let credential =
            resolve_credential(Some(String::new()), Some("from-env".into()), None, false).unwrap();
        assert_eq!(credential.token, "from-env");
    }

    #[test]
    fn test_multi_cookie_mode_requires_full_set() {
        let browser = browser_with(&[PRIMARY_COOKIE, "__Secure-1PSIDTS"]);
        match resolve_credential(None, None, Some(&browser), true) {
            Err(Error::Authentication(message)) => {
                assert!(message.contains("__Secure-1PSIDCC"));
                assert!(message.contains("NID"));
            }
            other => panic!("expected Authentication, got {other:?}"),
        }
    }

    #[test]
    fn test_multi_cookie_mode_keeps_companions() {
        let browser = browser_with(REQUIRED_COOKIES);
        let credential = resolve_credential(None, None, Some(&browser), true).unwrap();
        assert_eq!(credential.cookies.len(), REQUIRED_COOKIES.len());
    }

    #[test]
    fn test_scrape_nonce() {
        let body = r#"<script data-id="x" nonce="AbC123xyz">init()</script>"#;
        assert_eq!(scrape_nonce(body).as_deref(), Some("AbC123xyz"));
        assert_eq!(scrape_nonce("<html>no nonce</html>"), None);
    }
}
