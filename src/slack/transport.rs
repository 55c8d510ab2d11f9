// slackflow — HTTP transport for Web API calls

use crate::config::SlackConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;

/// Raw HTTP outcome, before the envelope is decoded.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    /// Seconds from the `Retry-After` header, when present and numeric.
    pub retry_after: Option<u64>,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }
}

/// Transport is the seam between the API client and the network.
///
/// Implementations perform exactly one POST per call and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, token: &str, body: Vec<u8>) -> Result<HttpReply>;
    async fn post_form(
        &self,
        url: &str,
        token: &str,
        form: &[(String, String)],
    ) -> Result<HttpReply>;
}

/// reqwest-backed transport. Cloning shares the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(
        timeout: Option<Duration>,
        connect_timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(connect_timeout);

        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        if let Some(proxy_url) = proxy {
            if !proxy_url.is_empty() {
                builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
            }
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_config(cfg: &SlackConfig) -> Result<Self> {
        Self::new(
            cfg.timeout_secs.map(Duration::from_secs),
            Duration::from_secs(cfg.connect_timeout_secs),
            Some(cfg.proxy.as_str()),
        )
    }

    async fn read_reply(resp: reqwest::Response) -> Result<HttpReply> {
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok());
        let body = resp.text().await?;

        Ok(HttpReply {
            status,
            retry_after,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, token: &str, body: Vec<u8>) -> Result<HttpReply> {
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await?;

        Self::read_reply(resp).await
    }

    async fn post_form(
        &self,
        url: &str,
        token: &str,
        form: &[(String, String)],
    ) -> Result<HttpReply> {
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .form(form)
            .send()
            .await?;

        Self::read_reply(resp).await
    }
}
