use log::{debug, info};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::api::{ApiError, DigestApi};
use crate::auth::SessionToken;
use crate::domain::digest::{Digest, DigestItem, EmailId, SummarizeOutcome};
use crate::domain::stats::UsageStats;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    emails: Option<Vec<DigestItem>>,
    global_summary: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogUsageResponse {
    #[serde(default)]
    time_saved: f64,
}

/// Blocking client for the digest backend. Every mailbox call carries the
/// session token as the `state` query parameter.
pub struct DigestClient {
    http: Client,
    base_url: String,
    session: Option<SessionToken>,
}

impl DigestClient {
    pub fn new(
        base_url: impl Into<String>,
        session: SessionToken,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Self::build(base_url.into(), Some(session), timeout)
    }

    /// Client for the endpoints that need no login (`/api/stats`, `/api/log_usage`).
    /// Mailbox calls made through it are rejected by the backend as unauthorized.
    pub fn without_session(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        Self::build(base_url.into(), None, timeout)
    }

    fn build(
        base_url: String,
        session: Option<SessionToken>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_session(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => req.query(&[("state", session.as_str())]),
            None => req,
        }
    }

    fn post_action(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
    ) -> Result<String, ApiError> {
        debug!("POST {path}");
        let req = self.with_session(self.http.post(self.url(path))).json(&body);
        let resp: ActionResponse = read_json(req, fallback)?;
        Ok(resp.message.unwrap_or_else(|| "OK".to_string()))
    }
}

/// Send the request and decode a JSON body, mapping the backend's
/// `{"error": ...}` payloads into `ApiError`.
fn read_json<T: DeserializeOwned>(req: RequestBuilder, fallback: &str) -> Result<T, ApiError> {
    let resp = req.send()?;
    let status = resp.status();
    let text = resp.text()?;

    let backend_error = || {
        serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.trim().is_empty())
    };

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(
            backend_error().unwrap_or_else(|| "User not logged in".to_string()),
        ));
    }
    if !status.is_success() {
        return Err(ApiError::Backend {
            status: status.as_u16(),
            message: backend_error().unwrap_or_else(|| fallback.to_string()),
        });
    }

    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

impl DigestApi for DigestClient {
    fn summarize(&self) -> Result<SummarizeOutcome, ApiError> {
        info!("requesting digest from {}", self.base_url);
        let req = self.with_session(self.http.get(self.url("/summarize")));
        let resp: SummarizeResponse = read_json(req, "Failed to fetch summaries")?;

        match (resp.emails, resp.summary) {
            (Some(items), _) => {
                info!("digest contains {} emails", items.len());
                Ok(SummarizeOutcome::Digest(Digest::new(
                    items,
                    resp.global_summary,
                )))
            }
            (None, Some(message)) => Ok(SummarizeOutcome::Message(message)),
            (None, None) => Err(ApiError::Decode(
                "summary response has neither emails nor summary".to_string(),
            )),
        }
    }

    fn trash(&self, id: &str) -> Result<String, ApiError> {
        self.post_action("/action/trash", json!({ "id": id }), "Failed to trash email")
    }

    fn mark_read(&self, id: &str) -> Result<String, ApiError> {
        self.post_action(
            "/action/mark_read",
            json!({ "id": id }),
            "Failed to mark read",
        )
    }

    fn mark_all_read(&self, ids: &[EmailId]) -> Result<String, ApiError> {
        self.post_action(
            "/action/mark_all_read",
            json!({ "ids": ids }),
            "Failed to mark all as read",
        )
    }

    fn reply(&self, to: &str, subject: &str, body: &str) -> Result<String, ApiError> {
        self.post_action(
            "/action/reply",
            json!({ "to": to, "subject": subject, "body": body }),
            "Failed to send reply",
        )
    }

    fn stats(&self) -> Result<UsageStats, ApiError> {
        read_json(self.http.get(self.url("/api/stats")), "Failed to fetch stats")
    }

    fn log_usage(&self, emails_processed: usize) -> Result<f64, ApiError> {
        let req = self
            .http
            .post(self.url("/api/log_usage"))
            .json(&json!({ "emails_processed": emails_processed }));
        let resp: LogUsageResponse = read_json(req, "Failed to log usage")?;
        Ok(resp.time_saved)
    }
}
