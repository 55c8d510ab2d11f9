// slackflow — Slack Web API response envelope

use crate::error::{Result, SlackError};
use serde::{Deserialize, Serialize};

/// The `ok`/`error` wrapper returned by every Web API method.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SlackResponse {
    /// All warnings the server attached, top-level and from metadata.
    pub fn warnings(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.warning.as_deref().into_iter().collect();
        if let Some(meta) = &self.response_metadata {
            out.extend(meta.warnings.iter().map(String::as_str));
        }
        out
    }

    /// Turn a not-ok envelope into `SlackError::Api`.
    pub fn into_result(self) -> Result<Self> {
        if self.ok {
            return Ok(self);
        }

        let messages = self
            .response_metadata
            .map(|m| m.messages)
            .unwrap_or_default();

        Err(SlackError::Api {
            error: self.error.unwrap_or_else(|| "unknown_error".to_string()),
            messages,
        })
    }
}
