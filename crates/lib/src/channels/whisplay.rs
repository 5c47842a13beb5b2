//! whisplay-im channel: long-poll `/whisplay-im/poll` and reply via `/whisplay-im/send`.

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::Serialize;

use super::payload::{poll_result, safe_json, Payload, PollResult};
use crate::config::ChannelConfig;

pub const POLL_PATH: &str = "/whisplay-im/poll";
pub const SEND_PATH: &str = "/whisplay-im/send";

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("whisplay-im request timed out: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("whisplay-im connection failed: {0}")]
    Connection(#[source] reqwest::Error),
    #[error("whisplay-im request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("whisplay-im http error: {status} {body}")]
    HttpStatus { status: u16, body: String },
    #[error("whisplay-im token is not a valid header value: {0}")]
    InvalidToken(#[from] InvalidHeaderValue),
    #[error("whisplay-im request encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChannelError::Timeout(e)
        } else if e.is_connect() {
            ChannelError::Connection(e)
        } else {
            ChannelError::Request(e)
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    reply: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    emoji: Option<&'a str>,
}

/// Client for one bridge. Holds a single HTTP client so connections are kept alive
/// across calls.
pub struct WhisplayImChannel {
    config: ChannelConfig,
    base_url: String,
    client: reqwest::Client,
}

impl WhisplayImChannel {
    pub fn new(config: ChannelConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            base_url: config.base_url(),
            config,
            client,
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers sent with every request: JSON content type, plus bearer auth when a
    /// non-blank token is configured.
    pub fn headers(&self) -> Result<HeaderMap, ChannelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.config.bearer_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// GET /whisplay-im/poll?waitSec=N. `wait_sec` overrides the configured default.
    /// Returns `Ok(None)` when the bridge has no message for this cycle.
    pub async fn poll(&self, wait_sec: Option<i64>) -> Result<Option<PollResult>, ChannelError> {
        let wait = wait_sec.unwrap_or(self.config.wait_sec);
        let url = format!("{}{}", self.base_url, POLL_PATH);
        log::debug!("whisplay-im: GET {} waitSec={}", url, wait);
        let res = self
            .client
            .get(&url)
            .query(&[("waitSec", wait)])
            .headers(self.headers()?)
            .send()
            .await?;
        let payload = read_payload(Method::GET, res).await?;
        let result = poll_result(payload);
        if result.is_none() {
            log::debug!("whisplay-im: no message");
        }
        Ok(result)
    }

    /// POST /whisplay-im/send with `{"reply": ..., "emoji"?: ...}`. The emoji is only sent
    /// when non-empty. Returns the decoded response body unchanged.
    pub async fn send(&self, reply: &str, emoji: Option<&str>) -> Result<Payload, ChannelError> {
        let body = SendRequest {
            reply,
            emoji: emoji.filter(|e| !e.is_empty()),
        };
        let body = serde_json::to_string(&body)?;
        let url = format!("{}{}", self.base_url, SEND_PATH);
        log::debug!("whisplay-im: POST {} ({} bytes)", url, body.len());
        let res = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .body(body)
            .send()
            .await?;
        read_payload(Method::POST, res).await
    }
}

/// Fail on non-2xx, otherwise decode the body with [`safe_json`].
async fn read_payload(method: Method, res: Response) -> Result<Payload, ChannelError> {
    let status = res.status();
    if !status.is_success() {
        let url = res.url().clone();
        let body = res.text().await.unwrap_or_default();
        log::warn!("whisplay-im: {} {} returned {}", method, url.path(), status);
        return Err(ChannelError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }
    let text = res.text().await?;
    Ok(safe_json(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(token: Option<&str>) -> WhisplayImChannel {
        let config = ChannelConfig::new("10.0.0.5:8080/").with_token(token.map(String::from));
        WhisplayImChannel::new(config).unwrap()
    }

    #[test]
    fn base_url_is_normalized_once() {
        assert_eq!(channel(None).base_url(), "http://10.0.0.5:8080");
    }

    #[test]
    fn headers_without_token() {
        let headers = channel(None).headers().unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn headers_with_blank_token() {
        let headers = channel(Some("  ")).headers().unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn headers_with_token_are_trimmed() {
        let headers = channel(Some(" secret ")).headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = channel(Some("bad\ntoken")).headers().unwrap_err();
        assert!(matches!(err, ChannelError::InvalidToken(_)));
    }

    #[test]
    fn send_body_keeps_unicode_unescaped() {
        let body = SendRequest {
            reply: "héllo",
            emoji: Some("👍"),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"reply":"héllo","emoji":"👍"}"#
        );
    }

    #[test]
    fn send_body_omits_missing_emoji() {
        let body = SendRequest {
            reply: "hi",
            emoji: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"reply":"hi"}"#);
    }
}
