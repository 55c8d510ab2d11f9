// slackflow — Slack Web API client

pub mod response;
pub mod transport;
pub mod workflow;

pub use response::{ResponseMetadata, SlackResponse};
pub use transport::{HttpReply, HttpTransport, Transport};
pub use workflow::{WorkflowInput, WorkflowOutput, WorkflowStepUpdate};

use crate::config::SlackConfig;
use crate::error::{Result, SlackError};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// SlackClient owns the bot token and a shared transport.
///
/// Cheap to clone; clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct SlackClient {
    token: String,
    api_base: String,
    transport: Arc<dyn Transport>,
}

impl SlackClient {
    /// Client against the public Slack API with default transport settings.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::from_config(&SlackConfig {
            token: token.into(),
            ..SlackConfig::default()
        })
    }

    pub fn from_config(cfg: &SlackConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(cfg)?;
        let api_base = if cfg.api_base.is_empty() {
            DEFAULT_API_BASE.to_string()
        } else {
            cfg.api_base.clone()
        };

        Ok(Self::with_transport(
            cfg.token.clone(),
            api_base,
            Arc::new(transport),
        ))
    }

    pub fn with_transport(
        token: impl Into<String>,
        api_base: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into(),
            transport,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Full URL for a Web API method, e.g. `https://slack.com/api/workflows.updateStep`.
    pub fn method_url(&self, method: &str) -> Result<String> {
        let raw = format!("{}/{}", self.api_base.trim_end_matches('/'), method);
        url::Url::parse(&raw)
            .map(String::from)
            .map_err(|e| SlackError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// Call a Web API method with a JSON body.
    pub async fn post_json<T>(&self, method: &str, payload: &T) -> Result<SlackResponse>
    where
        T: Serialize + ?Sized,
    {
        let url = self.method_url(method)?;
        let body = serde_json::to_vec(payload).map_err(SlackError::Encode)?;

        tracing::debug!(method = %method, body_len = body.len(), "Sending Slack API request");
        let reply = self.transport.post_json(&url, &self.token, body).await?;

        handle_reply(method, reply)
    }

    /// Call a Web API method with a form-encoded body.
    pub async fn post_form(
        &self,
        method: &str,
        form: &[(String, String)],
    ) -> Result<SlackResponse> {
        let url = self.method_url(method)?;

        tracing::debug!(method = %method, fields = form.len(), "Sending Slack API form request");
        let reply = self.transport.post_form(&url, &self.token, form).await?;

        handle_reply(method, reply)
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

fn handle_reply(method: &str, reply: HttpReply) -> Result<SlackResponse> {
    tracing::debug!(method = %method, status = reply.status, body_len = reply.body.len(), "Slack API response received");

    if reply.status == 429 {
        return Err(SlackError::RateLimited {
            retry_after: reply.retry_after,
        });
    }

    if !(200..300).contains(&reply.status) {
        return Err(SlackError::Status {
            status: reply.status,
            body: reply.body,
        });
    }

    let envelope: SlackResponse = serde_json::from_str(&reply.body).map_err(SlackError::Decode)?;

    for warning in envelope.warnings() {
        tracing::warn!(method = %method, warning = %warning, "Slack API warning");
    }

    envelope.into_result()
}
