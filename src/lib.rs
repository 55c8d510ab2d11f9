// slackflow — Slack workflow step client in Rust
// License: Apache-2.0

pub mod config;
pub mod error;
pub mod logger;
pub mod slack;

pub use error::SlackError;
pub use slack::{SlackClient, WorkflowInput, WorkflowOutput, WorkflowStepUpdate};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
