//! Schema declarations for resource attributes
//!
//! A resource declares each of its attributes once. The declaration decides
//! who owns the value (user, server, or both) and whether changing it can be
//! done in place or requires the resource to be replaced.

use crate::error::{CloudError, Result};

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Must be set by the user
    Required,
    /// May be set by the user
    Optional,
    /// Set by the server only
    Computed,
    /// May be set by the user; the server fills it in otherwise
    OptionalComputed,
}

impl FieldKind {
    /// Whether a user-supplied value for this field is diffed against state
    pub fn is_configurable(&self) -> bool {
        !matches!(self, FieldKind::Computed)
    }
}

/// Declaration of a single resource attribute
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    /// Attribute name as it appears in state
    pub name: &'static str,

    pub kind: FieldKind,

    /// Changing this attribute forces delete + create
    pub force_new: bool,

    pub description: &'static str,
}

impl FieldSchema {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Required,
            force_new: false,
            description,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Optional,
            force_new: false,
            description,
        }
    }

    pub const fn computed(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Computed,
            force_new: false,
            description,
        }
    }

    pub const fn optional_computed(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::OptionalComputed,
            force_new: false,
            description,
        }
    }

    /// Mark the field as replacement-forcing
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// Look up a field declaration by name
pub fn field<'a>(schema: &'a [FieldSchema], name: &str) -> Option<&'a FieldSchema> {
    schema.iter().find(|f| f.name == name)
}

/// Check that every name refers to a declared field
pub fn validate_fields<'a>(
    schema: &[FieldSchema],
    names: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    for name in names {
        if field(schema, name).is_none() {
            return Err(CloudError::UnknownField(name.to_string()));
        }
    }
    Ok(())
}

/// Whether any of the named fields forces replacement
pub fn requires_replacement<'a>(
    schema: &[FieldSchema],
    names: impl IntoIterator<Item = &'a str>,
) -> bool {
    names
        .into_iter()
        .any(|name| field(schema, name).is_some_and(|f| f.force_new))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[FieldSchema] = &[
        FieldSchema::required("name", "Name"),
        FieldSchema::required("body", "Body").force_new(),
        FieldSchema::computed("size", "Size"),
    ];

    #[test]
    fn test_field_lookup() {
        assert_eq!(field(SCHEMA, "body").unwrap().kind, FieldKind::Required);
        assert!(field(SCHEMA, "missing").is_none());
    }

    #[test]
    fn test_validate_fields() {
        assert!(validate_fields(SCHEMA, ["name", "size"]).is_ok());

        let err = validate_fields(SCHEMA, ["name", "colour"]).unwrap_err();
        assert!(matches!(err, CloudError::UnknownField(f) if f == "colour"));
    }

    #[test]
    fn test_requires_replacement() {
        assert!(!requires_replacement(SCHEMA, ["name"]));
        assert!(requires_replacement(SCHEMA, ["name", "body"]));
        assert!(!requires_replacement(SCHEMA, std::iter::empty::<&str>()));
    }

    #[test]
    fn test_computed_is_not_configurable() {
        assert!(!FieldKind::Computed.is_configurable());
        assert!(FieldKind::OptionalComputed.is_configurable());
    }
}
