//! Tracked state of a single resource instance.
//!
//! [`ResourceData`] wraps the JSON state the runtime hands to a lifecycle
//! transition. Reads go through [`ResourceData::decode`] into a typed struct;
//! writes go through [`ResourceData::set`], which checks each value against
//! the resource schema so a mismatched value is rejected instead of being
//! stored.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{AttributeType, Schema};
use crate::validation::check_value;

/// Name of the attribute holding the tracked identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// State of one resource instance as tracked by the runtime.
#[derive(Debug, Clone)]
pub struct ResourceData<'a> {
    schema: &'a Schema,
    id: Option<String>,
    attributes: Map<String, Value>,
    prior: Option<Map<String, Value>>,
}

impl<'a> ResourceData<'a> {
    /// Wrap a state or configuration object.
    ///
    /// A non-empty string `id` member becomes the tracked identifier.
    pub fn new(schema: &'a Schema, state: Value) -> Result<Self, ProviderError> {
        let mut attributes = into_object(state)?;
        let id = match attributes.remove(ID_ATTRIBUTE) {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            _ => None,
        };
        Ok(Self {
            schema,
            id,
            attributes,
            prior: None,
        })
    }

    /// Attach the prior state this instance is being changed from.
    ///
    /// If no identifier is tracked yet, the prior state's identifier is used.
    pub fn with_prior(mut self, prior: Value) -> Result<Self, ProviderError> {
        let mut prior = into_object(prior)?;
        if self.id.is_none() {
            if let Some(Value::String(id)) = prior.get(ID_ATTRIBUTE) {
                if !id.is_empty() {
                    self.id = Some(id.clone());
                }
            }
        }
        prior.remove(ID_ATTRIBUTE);
        self.prior = Some(prior);
        Ok(self)
    }

    /// The tracked identifier, if set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The tracked identifier, or a validation error if none is set.
    pub fn require_id(&self) -> Result<&str, ProviderError> {
        self.id()
            .ok_or_else(|| ProviderError::Validation("resource state has no id".to_string()))
    }

    /// Set the tracked identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Clear the tracked identifier; the resource no longer exists.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// Read a raw attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Store an attribute value.
    ///
    /// Fails with [`ProviderError::Assignment`] if the attribute is not in
    /// the schema or the value does not match its declared type.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), ProviderError> {
        let assignment = |detail: String| ProviderError::Assignment {
            attribute: key.to_string(),
            detail,
        };

        let attr = self
            .schema
            .attribute(key)
            .ok_or_else(|| assignment("attribute is not declared in the schema".to_string()))?;
        let value = serde_json::to_value(value).map_err(|e| assignment(e.to_string()))?;

        if let Some(diag) = check_value(&attr.attr_type, &value, key).into_iter().next() {
            return Err(assignment(diag.detail.unwrap_or(diag.summary)));
        }

        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    /// Whether `key` differs from the prior state.
    ///
    /// Unset values compare equal to their type's zero value, and sets
    /// compare without regard to order or repeated elements. Without a prior state every
    /// attribute counts as changed.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(prior) = &self.prior else {
            return true;
        };
        match self.schema.attribute(key) {
            Some(attr) => {
                normalize(&attr.attr_type, self.attributes.get(key))
                    != normalize(&attr.attr_type, prior.get(key))
            }
            None => self.attributes.get(key) != prior.get(key),
        }
    }

    /// Whether any of `keys` differs from the prior state.
    pub fn has_changes(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.has_change(key))
    }

    /// Deserialize the attributes into a typed struct.
    ///
    /// Null members are treated as unset, so the target's field defaults
    /// apply to them.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        let set: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        serde_json::from_value(Value::Object(set))
            .map_err(|e| ProviderError::Validation(e.to_string()))
    }

    /// The state to hand back to the runtime, including `id`.
    pub fn into_state(self) -> Value {
        let mut attributes = self.attributes;
        attributes.insert(
            ID_ATTRIBUTE.to_string(),
            self.id.map(Value::String).unwrap_or(Value::Null),
        );
        Value::Object(attributes)
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::Validation(format!(
            "expected state object, got {}",
            other
        ))),
    }
}

fn normalize(attr_type: &AttributeType, value: Option<&Value>) -> Value {
    match (attr_type, value) {
        (AttributeType::String, None | Some(Value::Null)) => Value::String(String::new()),
        (AttributeType::Bool, None | Some(Value::Null)) => Value::Bool(false),
        (AttributeType::List(_), None | Some(Value::Null)) => Value::Array(Vec::new()),
        (AttributeType::Set(_), None | Some(Value::Null)) => Value::Array(Vec::new()),
        (AttributeType::Set(_), Some(Value::Array(items))) => {
            let mut items = items.clone();
            items.sort_by_key(|item| item.to_string());
            items.dedup();
            Value::Array(items)
        }
        (_, Some(value)) => value.clone(),
        (_, None) => Value::Null,
    }
}
