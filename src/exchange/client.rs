//! HTTP client for the chat endpoint.
//!
//! One operation: deliver a prompt to `{base_url}/chat` and bring back the
//! reply. Failures never cross this seam as errors; the deadline passing
//! substitutes a canned reply and everything else is logged and swallowed,
//! so the caller only ever sees "a reply" or "no reply".

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Fixed deadline for one prompt round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Substituted reply text when the deadline passes without an answer.
pub const TIMEOUT_MESSAGE: &str = "Request timeout. Please try again later.";

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    message: &'a str,
}

/// A reply from the chat endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply text; empty when the server sends none.
    #[serde(default)]
    pub message: String,
    /// Caps charged for this reply. Absent means unpriced.
    #[serde(rename = "CAPS")]
    pub caps: Option<i64>,
    /// Server-side balance echo. Logged, never trusted for the local meter.
    #[serde(rename = "totalCAPS")]
    pub total_caps: Option<i64>,
}

impl ChatReply {
    /// The canned substitute for a request that hit the deadline. Unpriced,
    /// so appending it leaves the meter alone.
    fn timed_out() -> Self {
        Self {
            message: TIMEOUT_MESSAGE.to_string(),
            caps: None,
            total_caps: None,
        }
    }
}

/// Failure taxonomy for one exchange. Collapsed to `Option<ChatReply>` at
/// the public seam.
#[derive(Debug, Error)]
enum ExchangeError {
    #[error("request timed out")]
    Timeout,
    #[error("server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("transport failure: {0}")]
    Transport(reqwest::Error),
    #[error("unreadable reply body: {0}")]
    Body(serde_json::Error),
}

impl ExchangeError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

pub struct ChatClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ChatClient {
    /// Build against a base URL (trailing slashes dropped) with the fixed
    /// production deadline.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Same client with a caller-chosen deadline. Lets tests take the
    /// timeout branch without waiting out the production deadline.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Deliver one prompt and bring back the reply.
    ///
    /// - `Some(reply)` with the parsed body on success, or with the canned
    ///   timeout text when the deadline passed.
    /// - `None` when the server sent nothing usable (empty or `null` body)
    ///   or the exchange failed outright. Those failures are logged here;
    ///   the caller appends nothing.
    pub async fn send_prompt(&self, prompt: &str) -> Option<ChatReply> {
        match self.post_chat(prompt).await {
            Ok(reply) => reply,
            Err(ExchangeError::Timeout) => {
                debug!("no reply within {:?}, substituting timeout notice", self.timeout);
                Some(ChatReply::timed_out())
            }
            Err(err) => {
                error!("chat request failed: {err}");
                None
            }
        }
    }

    async fn post_chat(&self, prompt: &str) -> Result<Option<ChatReply>, ExchangeError> {
        let url = format!("{}/chat", self.base_url);
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(&PromptRequest { message: prompt })
            .send()
            .await
            .map_err(ExchangeError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(ExchangeError::from_reqwest)?;
        if body.is_empty() {
            return Ok(None);
        }

        // `null` is a valid body and means "no reply".
        let reply: Option<ChatReply> =
            serde_json::from_slice(&body).map_err(ExchangeError::Body)?;
        if let Some(total) = reply.as_ref().and_then(|r| r.total_caps) {
            debug!("server reports a balance of {total} caps");
        }
        Ok(reply)
    }
}
