use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, log_enabled, warn, Level};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{DispatchContent, DispatchPayload};
use crate::workflow::{InjectionPoint, PatchOutcome, WorkflowTemplate};

pub const DEFAULT_CLIENT_ID: &str = "clipboard_script";

/// A payload ready to submit, along with what happened to the target node.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDispatch {
    pub payload: DispatchPayload,
    pub outcome: PatchOutcome,
}

/// Patches the workflow template with new clipboard content and posts it
/// to the engine.
pub struct Dispatcher {
    client: Client,
    endpoint: Url,
    template_path: PathBuf,
    client_id: String,
}

impl Dispatcher {
    pub fn new(
        endpoint: Url,
        template_path: impl Into<PathBuf>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            endpoint,
            template_path: template_path.into(),
            client_id: client_id.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Loads the template fresh from disk and injects `content`.
    ///
    /// A missing or mismatched target node is only a warning; the template
    /// is still returned for submission.
    pub fn prepare(&self, content: &DispatchContent) -> Result<PreparedDispatch> {
        let mut template = WorkflowTemplate::load(&self.template_path)?;

        let kind = content.kind();
        let point = InjectionPoint::for_kind(kind);
        let value = match content {
            DispatchContent::Image(saved) => Value::String(saved.engine_path.clone()),
            DispatchContent::Text(text) => Value::String(text.clone()),
        };

        let outcome = template.inject(point, value);
        match &outcome {
            PatchOutcome::Patched { node_id } => info!(
                "Found and updated node '{}' (ID: {}) with the new {}.",
                point.title, node_id, kind
            ),
            PatchOutcome::ClassMismatch { node_id, class_type } => warn!(
                "Node with title '{}' (ID: {}) was found but it is not a {} node (class_type: {})",
                point.title,
                node_id,
                point.class_type.unwrap_or_default(),
                class_type.as_deref().unwrap_or("<missing>")
            ),
            PatchOutcome::MalformedInputs { node_id } => warn!(
                "Node with title '{}' (ID: {}) has non-object inputs; the clipboard {} will not be used.",
                point.title, node_id, kind
            ),
            PatchOutcome::NodeNotFound => warn!(
                "No node with the title '{}' found. The clipboard {} will not be used.",
                point.title, kind
            ),
        }

        Ok(PreparedDispatch {
            payload: template.into_payload(self.client_id.clone()),
            outcome,
        })
    }

    /// POSTs `payload` and returns the decoded JSON response.
    pub async fn submit(&self, payload: &DispatchPayload) -> Result<Value> {
        let transport = |source| Error::Transport {
            endpoint: self.endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(Error::Status { status, body });
        }

        serde_json::from_str(&body).map_err(Error::ResponseDecode)
    }

    /// Prepares and submits one piece of content. Nothing is retried.
    pub async fn dispatch(&self, content: &DispatchContent) -> Result<Value> {
        let prepared = self.prepare(content)?;

        if log_enabled!(Level::Debug) {
            match serde_json::to_string_pretty(&prepared.payload) {
                Ok(body) => debug!("Sending API prompt: {}", body),
                Err(e) => debug!("Sending API prompt (not printable: {})", e),
            }
        }

        let response = self.submit(&prepared.payload).await?;
        info!("Engine API response: {}", response);
        Ok(response)
    }
}
