//! Stack checkpoint loading.
//!
//! A checkpoint file nests the resource list under
//! `checkpoint.latest.resources`. Records are decoded one at a time so a
//! single bad record costs that record, not the whole stack.

use crate::error::{Result, StateError};
use crate::resource::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A stack and its deployed resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub resources: Vec<Resource>,
    /// Outputs exported by the stack's root resource.
    pub outputs: Map<String, Value>,
}

impl Stack {
    /// Builds a stack from resources already in memory.
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Self {
        let outputs = stack_outputs(&resources);
        Self {
            name: name.into(),
            resources,
            outputs,
        }
    }

    /// Loads a stack from a checkpoint file. The stack is named after the
    /// file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| StateError::io(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let document: Value =
            serde_json::from_str(&text).map_err(|e| StateError::json(path, e))?;
        Self::from_document(name, &document)
            .ok_or_else(|| StateError::MissingCheckpoint(path.to_path_buf()))
    }

    /// Parses a checkpoint document held in a string.
    pub fn from_checkpoint_str(name: impl Into<String>, json: &str) -> Result<Self> {
        let document: Value =
            serde_json::from_str(json).map_err(|e| StateError::json("<memory>", e))?;
        Self::from_document(name.into(), &document)
            .ok_or_else(|| StateError::MissingCheckpoint("<memory>".into()))
    }

    /// Returns `None` when the document has no `checkpoint.latest`.
    fn from_document(name: String, document: &Value) -> Option<Self> {
        let latest = document.get("checkpoint")?.get("latest")?;

        let records = match latest.get("resources") {
            Some(Value::Array(records)) => records.as_slice(),
            _ => &[],
        };

        let mut resources = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for (index, record) in records.iter().enumerate() {
            match Resource::deserialize(record) {
                Ok(resource) if !resource.id.is_empty() => resources.push(resource),
                Ok(_) => {
                    warn!("Skipping resource #{} in stack {}: empty urn", index, name);
                    skipped += 1;
                }
                Err(e) => match salvage(record) {
                    Some(resource) => {
                        warn!(
                            "Resource {} in stack {} has malformed fields, keeping the readable ones: {}",
                            resource.id, name, e
                        );
                        resources.push(resource);
                    }
                    None => {
                        warn!("Skipping resource #{} in stack {}: {}", index, name, e);
                        skipped += 1;
                    }
                },
            }
        }

        debug!(
            "Loaded stack {} ({} resources, {} skipped)",
            name,
            resources.len(),
            skipped
        );

        Some(Self::new(name, resources))
    }

    /// Finds a resource by id.
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Finds resources by display name.
    pub fn find_by_name(&self, name: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.display_name() == name)
            .collect()
    }
}

/// Rebuilds a record that failed to decode from whichever fields have the
/// expected shape. Needs a non-empty string urn.
fn salvage(record: &Value) -> Option<Resource> {
    let urn = record.get("urn")?.as_str().filter(|urn| !urn.is_empty())?;
    let field = |key: &str| record.get(key);
    let text = |key: &str| field(key).and_then(Value::as_str).map(str::to_string);
    let object = |key: &str| field(key).and_then(Value::as_object).cloned().unwrap_or_default();
    let timestamp = |key: &str| field(key).and_then(Value::as_str).and_then(|t| t.parse::<DateTime<Utc>>().ok());

    let mut resource = Resource::new(urn, text("type").unwrap_or_default());
    resource.custom = field("custom").and_then(Value::as_bool).unwrap_or(false);
    resource.cloud_id = text("id");
    resource.parent = text("parent");
    resource.provider = text("provider");
    resource.inputs = object("inputs");
    resource.outputs = object("outputs");
    resource.created = timestamp("created");
    resource.modified = timestamp("modified");
    Some(resource)
}

/// Outputs of the first stack root resource, or an empty map.
pub fn stack_outputs(resources: &[Resource]) -> Map<String, Value> {
    resources
        .iter()
        .find(|r| r.is_stack())
        .map(|r| r.outputs.clone())
        .unwrap_or_default()
}
