// slackflow — workflows.updateStep
//
// Reference: https://api.slack.com/methods/workflows.updateStep

use super::SlackClient;
use crate::error::{Result, SlackError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

pub const UPDATE_STEP_METHOD: &str = "workflows.updateStep";

// ---------------------------------------------------------------------------
// Data shapes
// ---------------------------------------------------------------------------

/// A single step input binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_variable_replacement: bool,
}

impl WorkflowInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn skip_variable_replacement(mut self) -> Self {
        self.skip_variable_replacement = true;
        self
    }
}

/// A variable the step exposes to later steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    pub label: String,
}

impl WorkflowOutput {
    pub fn new(
        name: impl Into<String>,
        output_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            output_type: output_type.into(),
            label: label.into(),
        }
    }
}

/// Arguments of one `workflows.updateStep` call.
///
/// `None` fields are left off the wire entirely. `Some(empty)` is sent as-is,
/// which clears that part of the step configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStepUpdate {
    pub workflow_step_edit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<WorkflowOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<HashMap<String, WorkflowInput>>,
}

impl WorkflowStepUpdate {
    /// No validation happens here; an empty id is rejected by Slack, not by us.
    pub fn new(workflow_step_edit_id: impl Into<String>) -> Self {
        Self {
            workflow_step_edit_id: workflow_step_edit_id.into(),
            ..Self::default()
        }
    }

    pub fn with_step_name(mut self, name: impl Into<String>) -> Self {
        self.step_name = Some(name.into());
        self
    }

    pub fn with_step_image_url(mut self, url: impl Into<String>) -> Self {
        self.step_image_url = Some(url.into());
        self
    }

    pub fn with_output(mut self, output: WorkflowOutput) -> Self {
        self.outputs.get_or_insert_with(Vec::new).push(output);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<WorkflowOutput>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, input: WorkflowInput) -> Self {
        self.inputs
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), input);
        self
    }

    /// Legacy form encoding: scalar fields as-is, `inputs`/`outputs` as JSON strings.
    pub fn to_form(&self, token: &str) -> Result<Vec<(String, String)>> {
        let mut form = vec![
            (
                "workflow_step_edit_id".to_string(),
                self.workflow_step_edit_id.clone(),
            ),
            ("token".to_string(), token.to_string()),
        ];

        if let Some(name) = &self.step_name {
            form.push(("step_name".to_string(), name.clone()));
        }
        if let Some(url) = &self.step_image_url {
            form.push(("step_image_url".to_string(), url.clone()));
        }
        if let Some(inputs) = &self.inputs {
            let data = serde_json::to_string(inputs).map_err(SlackError::Encode)?;
            form.push(("inputs".to_string(), data));
        }
        if let Some(outputs) = &self.outputs {
            let data = serde_json::to_string(outputs).map_err(SlackError::Encode)?;
            form.push(("outputs".to_string(), data));
        }

        Ok(form)
    }
}

// ---------------------------------------------------------------------------
// API calls
// ---------------------------------------------------------------------------

impl SlackClient {
    /// Save the configuration of a workflow step (JSON body).
    pub async fn update_workflow_step(&self, update: &WorkflowStepUpdate) -> Result<()> {
        self.post_json(UPDATE_STEP_METHOD, update).await?;
        tracing::debug!(edit_id = %update.workflow_step_edit_id, "Workflow step updated");
        Ok(())
    }

    /// Same call, sent as `application/x-www-form-urlencoded`.
    pub async fn update_workflow_step_form(&self, update: &WorkflowStepUpdate) -> Result<()> {
        let form = update.to_form(self.token())?;
        self.post_form(UPDATE_STEP_METHOD, &form).await?;
        tracing::debug!(edit_id = %update.workflow_step_edit_id, "Workflow step updated (form)");
        Ok(())
    }

    /// `update_workflow_step`, abandoned with `SlackError::Cancelled` once `cancel` fires.
    pub async fn update_workflow_step_with_cancel(
        &self,
        update: &WorkflowStepUpdate,
        cancel: &CancellationToken,
    ) -> Result<()> {
        until_cancelled(update, cancel, self.update_workflow_step(update)).await
    }

    /// `update_workflow_step_form`, abandoned with `SlackError::Cancelled` once `cancel` fires.
    pub async fn update_workflow_step_form_with_cancel(
        &self,
        update: &WorkflowStepUpdate,
        cancel: &CancellationToken,
    ) -> Result<()> {
        until_cancelled(update, cancel, self.update_workflow_step_form(update)).await
    }
}

// Dropping `call` on cancellation aborts the in-flight request.
async fn until_cancelled<F>(
    update: &WorkflowStepUpdate,
    cancel: &CancellationToken,
    call: F,
) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(edit_id = %update.workflow_step_edit_id, "Workflow step update cancelled");
            Err(SlackError::Cancelled)
        }
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::stub::{client, Sent, StubTransport};
    use crate::slack::{HttpReply, Transport};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn full_update() -> WorkflowStepUpdate {
        WorkflowStepUpdate::new("12345.98765.abcd2358fdea")
            .with_step_name("Send approval")
            .with_step_image_url("https://example.com/step.png")
            .with_output(WorkflowOutput::new("ticket_id", "text", "Ticket ID"))
            .with_output(WorkflowOutput::new("assignee", "user", "Assignee"))
            .with_input(
                "title",
                WorkflowInput::new("{{trigger.title}}").with_variable("trigger.title", "Title"),
            )
            .with_input("raw", WorkflowInput::new("{{literal}}").skip_variable_replacement())
    }

    #[test]
    fn test_minimal_request_serializes_only_id() {
        let v = serde_json::to_value(WorkflowStepUpdate::new("edit-1")).unwrap();
        assert_eq!(v, json!({"workflow_step_edit_id": "edit-1"}));
    }

    #[test]
    fn test_empty_id_is_accepted() {
        let update = WorkflowStepUpdate::new("");
        assert_eq!(update.workflow_step_edit_id, "");
        assert!(update.step_name.is_none());
        assert!(update.outputs.is_none());
        assert!(update.inputs.is_none());
    }

    #[test]
    fn test_full_request_wire_shape() {
        let v = serde_json::to_value(full_update()).unwrap();
        assert_eq!(v["workflow_step_edit_id"], "12345.98765.abcd2358fdea");
        assert_eq!(v["step_name"], "Send approval");
        assert_eq!(v["step_image_url"], "https://example.com/step.png");
        assert_eq!(
            v["outputs"],
            json!([
                {"name": "ticket_id", "type": "text", "label": "Ticket ID"},
                {"name": "assignee", "type": "user", "label": "Assignee"}
            ])
        );
        assert_eq!(
            v["inputs"]["title"],
            json!({"value": "{{trigger.title}}", "variables": {"trigger.title": "Title"}})
        );
        assert_eq!(
            v["inputs"]["raw"],
            json!({"value": "{{literal}}", "skip_variable_replacement": true})
        );
    }

    #[test]
    fn test_request_survives_decode() {
        let update = full_update();
        let text = serde_json::to_string(&update).unwrap();
        assert!(!text.contains("null"));
        let decoded: WorkflowStepUpdate = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn test_empty_outputs_are_sent() {
        let v = serde_json::to_value(WorkflowStepUpdate::new("e").with_outputs(vec![])).unwrap();
        assert_eq!(v, json!({"workflow_step_edit_id": "e", "outputs": []}));
    }

    #[test]
    fn test_input_decodes_missing_skip_flag_as_false() {
        let input: WorkflowInput = serde_json::from_str(r#"{"value": "x"}"#).unwrap();
        assert!(!input.skip_variable_replacement);
        assert!(input.variables.is_none());
    }

    #[test]
    fn test_form_minimal() {
        let form = WorkflowStepUpdate::new("edit-1").to_form("xoxb-t").unwrap();
        assert_eq!(
            form,
            vec![
                ("workflow_step_edit_id".to_string(), "edit-1".to_string()),
                ("token".to_string(), "xoxb-t".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_json_encodes_nested_fields() {
        let form: HashMap<String, String> =
            full_update().to_form("xoxb-t").unwrap().into_iter().collect();
        assert_eq!(form["step_name"], "Send approval");
        assert_eq!(form["step_image_url"], "https://example.com/step.png");

        let outputs: Vec<WorkflowOutput> = serde_json::from_str(&form["outputs"]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].output_type, "user");

        let inputs: HashMap<String, WorkflowInput> =
            serde_json::from_str(&form["inputs"]).unwrap();
        assert!(inputs["raw"].skip_variable_replacement);
    }

    #[tokio::test]
    async fn test_update_ok() {
        let stub = StubTransport::replying(r#"{"ok": true}"#);
        let c = client(stub.clone());

        c.update_workflow_step(&full_update()).await.unwrap();

        match &stub.sent()[..] {
            [Sent::Json { url, body, .. }] => {
                assert!(url.ends_with("/workflows.updateStep"));
                assert_eq!(body["workflow_step_edit_id"], "12345.98765.abcd2358fdea");
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_invalid_trigger() {
        let stub = StubTransport::replying(r#"{"ok": false, "error": "invalid_trigger"}"#);
        let err = client(stub)
            .update_workflow_step(&WorkflowStepUpdate::new("stale"))
            .await
            .unwrap_err();
        assert_eq!(err.api_error(), Some("invalid_trigger"));
        assert!(err.to_string().contains("invalid_trigger"));
    }

    #[tokio::test]
    async fn test_transport_failure_returned_once() {
        let stub = StubTransport::new(|| {
            let e = reqwest::Client::new()
                .post("http://[::1")
                .build()
                .unwrap_err();
            Err(SlackError::Transport(e))
        });
        let err = client(stub.clone())
            .update_workflow_step(&WorkflowStepUpdate::new("edit-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlackError::Transport(ref e) if e.is_builder()));
        assert_eq!(stub.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_form_update_sends_form() {
        let stub = StubTransport::replying(r#"{"ok": true}"#);
        client(stub.clone())
            .update_workflow_step_form(&WorkflowStepUpdate::new("edit-1").with_step_name("S"))
            .await
            .unwrap();

        match &stub.sent()[..] {
            [Sent::Form { token, form, .. }] => {
                assert_eq!(token, "xoxb-test");
                assert!(form.contains(&("token".to_string(), "xoxb-test".to_string())));
                assert!(form.contains(&("step_name".to_string(), "S".to_string())));
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let stub = StubTransport::new(|| Ok(HttpReply::ok(r#"{"ok": true}"#)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client(stub.clone())
            .update_workflow_step_with_cancel(&WorkflowStepUpdate::new("edit-1"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SlackError::Cancelled));
        assert!(stub.sent().is_empty());
    }

    /// Transport that never answers; signals once a request is in flight.
    struct HangingTransport {
        in_flight: Arc<Notify>,
    }

    impl HangingTransport {
        async fn hang(&self) -> Result<HttpReply> {
            self.in_flight.notify_one();
            std::future::pending().await
        }
    }

    #[async_trait]
    impl Transport for HangingTransport {
        async fn post_json(&self, _url: &str, _token: &str, _body: Vec<u8>) -> Result<HttpReply> {
            self.hang().await
        }

        async fn post_form(
            &self,
            _url: &str,
            _token: &str,
            _form: &[(String, String)],
        ) -> Result<HttpReply> {
            self.hang().await
        }
    }

    fn hanging_client() -> (SlackClient, CancellationToken) {
        let in_flight = Arc::new(Notify::new());
        let c = SlackClient::with_transport(
            "xoxb-test",
            "https://slack.test/api",
            Arc::new(HangingTransport {
                in_flight: in_flight.clone(),
            }),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            in_flight.notified().await;
            trigger.cancel();
        });

        (c, cancel)
    }

    #[tokio::test]
    async fn test_cancelled_while_in_flight() {
        let (c, cancel) = hanging_client();
        let update = WorkflowStepUpdate::new("edit-1");

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            c.update_workflow_step_with_cancel(&update, &cancel),
        )
        .await
        .expect("cancellation did not interrupt the request");

        assert!(matches!(result, Err(SlackError::Cancelled)));
    }

    #[tokio::test]
    async fn test_form_cancelled_while_in_flight() {
        let (c, cancel) = hanging_client();
        let update = WorkflowStepUpdate::new("edit-1");

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            c.update_workflow_step_form_with_cancel(&update, &cancel),
        )
        .await
        .expect("cancellation did not interrupt the request");

        assert!(matches!(result, Err(SlackError::Cancelled)));
    }

    #[tokio::test]
    async fn test_not_cancelled_completes() {
        let stub = StubTransport::replying(r#"{"ok": true}"#);
        let cancel = CancellationToken::new();
        client(stub)
            .update_workflow_step_with_cancel(&WorkflowStepUpdate::new("edit-1"), &cancel)
            .await
            .unwrap();
    }
}
