//! Schema validation helpers.
//!
//! Runtime input arrives as `serde_json::Value`. These helpers check it
//! against a [`Schema`] before any field is read, and produce diagnostics
//! pointing at the offending attribute.
//!
//! # Example
//!
//! ```
//! use csp_provider::schema::{Attribute, Schema};
//! use csp_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("visible", Attribute::optional_bool());
//!
//! let diagnostics = validate(&schema, &json!({"name": "viewer", "visible": true}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "viewer", "visible": "yes"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("visible".to_string()));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Validate a JSON object against a schema.
///
/// Returns a list of diagnostics; an empty list means the value is valid.
///
/// # Validation Rules
///
/// - The value must be an object (or null, which is treated as empty)
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attributes not declared in the schema are rejected
/// - Attribute types must match the schema; set elements must be unique
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let empty = serde_json::Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object").with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for name in obj.keys() {
        if schema.attribute(name).is_none() {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not declared in the schema")
                    .with_attribute(name.clone()),
            );
        }
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Check a single value against an attribute type.
///
/// Returns the diagnostics for `value`, reported under `path`. Null is
/// accepted for any type.
pub fn check_value(attr_type: &AttributeType, value: &Value, path: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if !value.is_null() {
        validate_attribute_type(attr_type, value, path, &mut diagnostics);
    }
    diagnostics
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(arr) => validate_elements(element_type, arr, path, diagnostics),
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Set(element_type) => match value.as_array() {
            // Sets travel as JSON arrays.
            Some(arr) => {
                validate_elements(element_type, arr, path, diagnostics);
                for (i, elem) in arr.iter().enumerate() {
                    if arr[..i].contains(elem) {
                        diagnostics.push(
                            Diagnostic::error(format!("Duplicate value in set '{}'", path))
                                .with_detail(format!("{} appears more than once", elem))
                                .with_attribute(format!("{}.{}", path, i)),
                        );
                    }
                }
            }
            None => diagnostics.push(type_error(path, "set", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object_type(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn validate_elements(
    element_type: &AttributeType,
    arr: &[Value],
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (i, elem) in arr.iter().enumerate() {
        let elem_path = format!("{}.{}", path, i);
        validate_attribute_type(element_type, elem, &elem_path, diagnostics);
    }
}

fn validate_object_type(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Object members carry no required/optional flags, so absence is fine.
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name) {
            let attr_path = format!("{}.{}", path, name);
            validate_attribute_type(attr_type, value, &attr_path, diagnostics);
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "viewer"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
        assert_eq!(
            diagnostics[0].detail,
            Some("Expected string, got number".to_string())
        );
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("visible", Attribute::optional_bool());

        assert!(validate(&schema, &json!({"visible": true})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"visible": null})).is_empty());
        assert_eq!(validate(&schema, &json!({"visible": "yes"})).len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_rejects_unknown_attributes() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        let diagnostics = validate(&schema, &json!({"name": "viewer", "colour": "red"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("colour".to_string()));
        assert!(diagnostics[0].summary.contains("Unsupported attribute"));
    }

    #[test]
    fn test_validate_null_and_non_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert_eq!(validate(&schema, &Value::Null).len(), 1);

        let diagnostics = validate(&schema, &json!(["name"]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = Schema::v0().with_attribute(
            "permissions",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );
        assert!(validate(&schema, &json!({"permissions": ["read", "read"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"permissions": ["read", 7]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("permissions.1".to_string()));

        let diagnostics = validate(&schema, &json!({"permissions": "read"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_set_uniqueness() {
        let schema = Schema::v0().with_attribute(
            "disallowed_resource_types",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );
        assert!(validate(&schema, &json!({"disallowed_resource_types": ["a", "b"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"disallowed_resource_types": ["a", "a"]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Duplicate value"));
    }

    #[test]
    fn test_validate_object_members() {
        let schema = Schema::v0().with_attribute(
            "roles",
            Attribute::new(
                AttributeType::list(AttributeType::object([
                    ("name", AttributeType::String),
                    ("visible", AttributeType::Bool),
                ])),
                AttributeFlags::optional(),
            ),
        );
        assert!(validate(&schema, &json!({"roles": [{"name": "a"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"roles": [{"name": "a", "visible": 1}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("roles.0.visible".to_string()));
    }

    #[test]
    fn test_check_value() {
        assert!(check_value(&AttributeType::Bool, &json!(true), "visible").is_empty());
        assert!(check_value(&AttributeType::Bool, &Value::Null, "visible").is_empty());
        assert_eq!(check_value(&AttributeType::Bool, &json!("no"), "visible").len(), 1);
    }

    #[test]
    fn test_validate_result_and_is_valid() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate_result(&schema, &json!({"name": "x"})).is_ok());
        assert!(validate_result(&schema, &json!({})).is_err());
        assert!(is_valid(&schema, &json!({"name": "x"})));
        assert!(!is_valid(&schema, &json!({})));
    }
}
