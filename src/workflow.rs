//! API-format workflow templates and the node patching done before each submit.
//!
//! A template maps node ids to `{class_type, inputs, _meta: {title}}`. The
//! node that receives clipboard content is found by its `_meta.title`, which
//! is what users can set from the engine's UI.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{ContentKind, DispatchPayload};

pub const IMAGE_NODE_TITLE: &str = "load_clipboard_image";
pub const TEXT_NODE_TITLE: &str = "load_clipboard_text";
pub const LOAD_IMAGE_CLASS: &str = "LoadImage";

/// Where content of one kind goes in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionPoint {
    pub title: &'static str,
    pub input: &'static str,
    /// Required `class_type` of the target node, if any.
    pub class_type: Option<&'static str>,
}

impl InjectionPoint {
    pub const IMAGE: Self = Self {
        title: IMAGE_NODE_TITLE,
        input: "image",
        class_type: Some(LOAD_IMAGE_CLASS),
    };

    // No class guard for text: any node titled `load_clipboard_text` is patched.
    pub const TEXT: Self = Self {
        title: TEXT_NODE_TITLE,
        input: "text",
        class_type: None,
    };

    pub fn for_kind(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Image => Self::IMAGE,
            ContentKind::Text => Self::TEXT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched { node_id: String },
    NodeNotFound,
    ClassMismatch {
        node_id: String,
        class_type: Option<String>,
    },
    MalformedInputs { node_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowTemplate {
    nodes: Map<String, Value>,
}

impl WorkflowTemplate {
    /// Reads and parses the template at `path`. Never cached.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&raw).map_err(|source| Error::TemplateParse {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_value(value).ok_or_else(|| Error::TemplateShape {
            path: path.to_path_buf(),
        })
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(nodes) => Some(Self { nodes }),
            _ => None,
        }
    }

    pub fn nodes(&self) -> &Map<String, Value> {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Value> {
        self.nodes.get(id)
    }

    /// First node, in document order, whose `_meta.title` is `title`.
    pub fn find_node_by_title(&self, title: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, node)| node_title(node) == Some(title))
            .map(|(id, _)| id.as_str())
    }

    /// Writes `value` into the target node's `inputs`. Leaves the template
    /// untouched unless the outcome is `Patched`.
    pub fn inject(&mut self, point: InjectionPoint, value: impl Into<Value>) -> PatchOutcome {
        let Some(node_id) = self.find_node_by_title(point.title).map(str::to_owned) else {
            return PatchOutcome::NodeNotFound;
        };
        let Some(node) = self.nodes.get_mut(&node_id).and_then(Value::as_object_mut) else {
            return PatchOutcome::NodeNotFound;
        };

        if let Some(expected) = point.class_type {
            let actual = node.get("class_type").and_then(Value::as_str);
            if actual != Some(expected) {
                return PatchOutcome::ClassMismatch {
                    node_id,
                    class_type: actual.map(str::to_owned),
                };
            }
        }

        let inputs = node
            .entry("inputs")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(inputs) = inputs.as_object_mut() else {
            return PatchOutcome::MalformedInputs { node_id };
        };

        inputs.insert(point.input.to_owned(), value.into());
        PatchOutcome::Patched { node_id }
    }

    pub fn into_payload(self, client_id: impl Into<String>) -> DispatchPayload {
        DispatchPayload {
            prompt: self.nodes,
            client_id: client_id.into(),
        }
    }
}

fn node_title(node: &Value) -> Option<&str> {
    node.get("_meta")?.get("title")?.as_str()
}
