//! Shared blocking HTTP client.

use crate::{Config, Error, Result};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

pub fn client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(concat!("scriptkit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::from)
}

/// Turn a non-2xx response into an operation error that includes the body.
pub fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let detail = body.trim();
    let message = if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", truncate(detail, 200))
    };
    Err(Error::Operation(message))
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }
}
