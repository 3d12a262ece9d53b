//! Change planning for a single resource

use crate::error::{CloudError, Result};
use crate::schema::{FieldKind, FieldSchema, requires_replacement, validate_fields};
use serde::{Deserialize, Serialize};

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete and re-create the resource
    Replace,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Planned action for one resource instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub action_type: ActionType,

    /// Resource type (e.g., "sshkey")
    pub resource_type: String,

    /// Configurable attributes whose desired value differs from state
    pub changed: Vec<String>,
}

impl Plan {
    /// Removal of a resource the host no longer wants
    pub fn delete(resource_type: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Delete,
            resource_type: resource_type.into(),
            changed: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.action_type != ActionType::NoOp
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.resource_type, self.action_type)?;
        if !self.changed.is_empty() {
            write!(f, " ({})", self.changed.join(", "))?;
        }
        Ok(())
    }
}

/// Compare desired attributes with the prior state
///
/// `prior` is `None` when the resource is not in state (or was found gone
/// on refresh). Computed attributes are ignored; optional+computed ones are
/// compared only when the desired value is set. Every desired attribute must
/// be declared in `schema`.
pub fn plan_change<T: Serialize>(
    resource_type: &str,
    schema: &[FieldSchema],
    prior: Option<&T>,
    desired: &T,
) -> Result<Plan> {
    let desired = to_object(desired)?;
    validate_fields(schema, desired.keys().map(String::as_str))?;

    let Some(prior) = prior else {
        return Ok(Plan {
            action_type: ActionType::Create,
            resource_type: resource_type.to_string(),
            changed: Vec::new(),
        });
    };

    let prior = to_object(prior)?;

    let mut changed = Vec::new();
    for field in schema.iter().filter(|f| f.kind.is_configurable()) {
        let want = desired.get(field.name).unwrap_or(&serde_json::Value::Null);
        if field.kind == FieldKind::OptionalComputed && is_unset(want) {
            continue;
        }
        let have = prior.get(field.name).unwrap_or(&serde_json::Value::Null);
        if want != have {
            changed.push(field.name.to_string());
        }
    }

    let action_type = if changed.is_empty() {
        ActionType::NoOp
    } else if requires_replacement(schema, changed.iter().map(String::as_str)) {
        ActionType::Replace
    } else {
        ActionType::Update
    };

    tracing::debug!("Planned {} for {}: {:?}", action_type, resource_type, changed);

    Ok(Plan {
        action_type,
        resource_type: resource_type.to_string(),
        changed,
    })
}

fn to_object<T: Serialize>(value: &T) -> Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(CloudError::InvalidConfig(format!(
            "resource attributes must serialize to an object, got {}",
            other
        ))),
    }
}

fn is_unset(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}
