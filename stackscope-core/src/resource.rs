//! Resource records.
//!
//! A resource is one deployed infrastructure object as it appears in a
//! stack checkpoint. Everything downstream (inference, assembly, layout)
//! reads these records and never modifies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between the segments of a resource URN.
pub const URN_SEPARATOR: &str = "::";

/// Type tag of the root resource every stack carries.
pub const STACK_RESOURCE_TYPE: &str = "pulumi:pulumi:Stack";

/// One deployed infrastructure object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique identifier within the stack (the URN).
    #[serde(rename = "urn")]
    pub id: String,

    /// Resource type tag, e.g. `aws:s3/bucket:Bucket`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Whether the resource is managed by a provider (as opposed to a
    /// component that only groups other resources).
    #[serde(default)]
    pub custom: bool,

    /// Identifier assigned by the cloud provider, if any.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<String>,

    /// URN of the structural container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Provider reference string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Declared configuration.
    #[serde(default, deserialize_with = "map_or_null")]
    pub inputs: Map<String, Value>,

    /// Values observed after provisioning.
    #[serde(default, deserialize_with = "map_or_null")]
    pub outputs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Checkpoints write `"inputs": null` for some resources.
fn map_or_null<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Resource {
    /// Creates a resource with no parent, inputs or outputs.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            custom: true,
            cloud_id: None,
            parent: None,
            provider: None,
            inputs: Map::new(),
            outputs: Map::new(),
            created: None,
            modified: None,
        }
    }

    /// Sets the structural parent.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds a declared input.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Adds an observed output.
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// The conventional display name: the last `::` segment of the id.
    pub fn display_name(&self) -> &str {
        display_name(&self.id)
    }

    /// The parent id, ignoring empty strings.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }

    /// Returns true for the stack's own root resource.
    pub fn is_stack(&self) -> bool {
        self.kind == STACK_RESOURCE_TYPE
    }
}

/// Extracts the display name from a resource id.
///
/// Returns the substring after the last `::`, or the whole id when the
/// separator is absent.
pub fn display_name(id: &str) -> &str {
    match id.rfind(URN_SEPARATOR) {
        Some(pos) => &id[pos + URN_SEPARATOR.len()..],
        None => id,
    }
}
