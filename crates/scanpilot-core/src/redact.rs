use crate::request::Credentials;
use regex::Regex;
use std::sync::LazyLock;

static URL_USERINFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?://)[^/\s@]+@").unwrap());

/// Strip `user:password@` from any URL in `text`.
pub fn redact_url(text: &str) -> String {
    URL_USERINFO_RE.replace_all(text, "${1}***@").to_string()
}

/// Remove the caller's own secrets from text that may be echoed into logs or
/// build output, such as raw response bodies. Everything else is left as is.
pub fn redact_credentials(text: &str, credentials: &Credentials) -> String {
    let result = redact_url(text);

    if credentials.api_token.is_empty() {
        result
    } else {
        result.replace(&credentials.api_token, "***")
    }
}
