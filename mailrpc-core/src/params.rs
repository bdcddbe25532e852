//! Parameter binding
//!
//! Raw `params` are bound into a method's argument type in two phases:
//!
//! 1. The raw JSON is parsed into a generic key-value tree (a JSON object).
//! 2. A [`ParamBinder`] walks the argument type's field table
//!    ([`RpcParams::FIELDS`]), converting each present member through the
//!    [`HookTable`], and the result is deserialized into the target type.
//!
//! Fields missing from the params keep their `Default` value, unknown
//! members are ignored, and a member whose JSON kind does not match the
//! declared field kind is a hard failure unless a hook converts it.
//!
//! The default hook table knows one conversion: an RFC3339 string into a
//! [`FieldKind::Timestamp`] field.
//!
//! # Positional params
//!
//! By default only by-name (object) params are accepted. With
//! [`ParamBinder::positional`] enabled, an array is bound onto the fields in
//! declaration order.
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_core::{Field, FieldKind, ParamBinder, RpcParams};
//! use serde::{Deserialize, Serialize};
//! use serde_json::value::RawValue;
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Greeting {
//!     message: String,
//!     loud: bool,
//! }
//!
//! impl RpcParams for Greeting {
//!     const FIELDS: &'static [Field] = &[
//!         Field::new("message", FieldKind::String),
//!         Field::new("loud", FieldKind::Bool),
//!     ];
//! }
//!
//! let raw = RawValue::from_string(r#"{"message":"hi"}"#.to_string()).unwrap();
//! let greeting: Greeting = ParamBinder::default().bind(Some(&raw)).unwrap();
//! assert_eq!(greeting.message, "hi");
//! assert!(!greeting.loud);
//! ```

use crate::error::RpcError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Declared kind of a field in an argument shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Bool,
    /// JSON number without a fractional part
    Integer,
    /// Any JSON number
    Float,
    /// Point in time; only reachable through a hook
    Timestamp,
    Sequence,
    Map,
    /// Anything; the final deserialization decides
    Any,
}

impl FieldKind {
    fn accepts(self, source: JsonKind, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::String => source == JsonKind::String,
            FieldKind::Bool => source == JsonKind::Bool,
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => source == JsonKind::Number,
            FieldKind::Sequence => source == JsonKind::Array,
            FieldKind::Map => source == JsonKind::Object,
            FieldKind::Timestamp => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Sequence => "sequence",
            FieldKind::Map => "map",
            FieldKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// Kind of a JSON value as received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "bool",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// One field of an argument shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Member name in the params object
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A structured argument type that params can be bound into
///
/// `FIELDS` must use the same member names the type's serde implementation
/// uses. `#[derive(RpcParams)]` from `mailrpc-macros` generates it from the
/// struct definition, honouring `#[serde(rename = "...")]`.
pub trait RpcParams: Default + Serialize + DeserializeOwned + Send + 'static {
    /// Field table in declaration order
    const FIELDS: &'static [Field];

    /// The zero value as a JSON object, used for every absent member
    ///
    /// The provided version serializes `Self::default()`. Shapes with
    /// `skip_serializing` or `skip_serializing_if` fields must override it so
    /// those members are still present; the derive does this with
    /// [`fill_member`].
    fn zero_members() -> Result<Map<String, Value>, String> {
        serialize_members(&Self::default())
    }
}

/// JSON object members of a params value
pub type Members = Map<String, Value>;

/// Serialize a params value into its object members
pub fn serialize_members<T: Serialize>(value: &T) -> Result<Map<String, Value>, String> {
    match serde_json::to_value(value).map_err(|e| e.to_string())? {
        Value::Object(members) => Ok(members),
        _ => Ok(Map::new()),
    }
}

/// Insert `value` under `name` unless serialization already produced it
pub fn fill_member<V: Serialize>(
    members: &mut Map<String, Value>,
    name: &str,
    value: &V,
) -> Result<(), String> {
    if !members.contains_key(name) {
        let value = serde_json::to_value(value).map_err(|e| e.to_string())?;
        members.insert(name.to_string(), value);
    }
    Ok(())
}

/// Failure while binding params into an argument shape
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("params must be an object, got {0}")]
    NotAnObject(JsonKind),

    #[error("too many positional params: expected at most {expected}, got {actual}")]
    TooManyPositional { expected: usize, actual: usize },

    #[error("'{field}' expected type '{expected}', got '{actual}'")]
    KindMismatch {
        field: &'static str,
        expected: FieldKind,
        actual: JsonKind,
    },

    #[error("'{field}' {reason}")]
    Conversion { field: &'static str, reason: String },

    #[error("{0}")]
    Decode(String),
}

/// Conversion applied to a member before it is stored in the target
///
/// Returns the converted value, or a reason the value was rejected.
pub type Hook = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Table of conversions keyed by (received kind, declared kind)
#[derive(Clone)]
pub struct HookTable {
    hooks: HashMap<(JsonKind, FieldKind), Hook>,
}

impl HookTable {
    /// A table with no conversions at all
    pub fn empty() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Register (or replace) the conversion for a kind pair
    pub fn register<F>(&mut self, from: JsonKind, to: FieldKind, hook: F) -> &mut Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.hooks.insert((from, to), Arc::new(hook));
        self
    }

    /// Number of registered conversions
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn convert(&self, field: &Field, value: Value) -> std::result::Result<Value, BindError> {
        let source = JsonKind::of(&value);

        if let Some(hook) = self.hooks.get(&(source, field.kind)) {
            return hook(&value).map_err(|reason| BindError::Conversion {
                field: field.name,
                reason,
            });
        }

        if field.kind.accepts(source, &value) {
            Ok(value)
        } else {
            Err(BindError::KindMismatch {
                field: field.name,
                expected: field.kind,
                actual: source,
            })
        }
    }
}

impl Default for HookTable {
    /// The standard table: RFC3339 strings into timestamp fields
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(JsonKind::String, FieldKind::Timestamp, rfc3339_timestamp);
        table
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookTable")
            .field("conversions", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Validate an RFC3339 timestamp and normalise its text
fn rfc3339_timestamp(value: &Value) -> std::result::Result<Value, String> {
    let text = value.as_str().unwrap_or_default();
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|ts| Value::String(ts.to_rfc3339()))
        .map_err(|e| format!("parsing time {:?} as RFC3339: {}", text, e))
}

/// Binds raw params into argument shapes
#[derive(Debug, Clone, Default)]
pub struct ParamBinder {
    hooks: HookTable,
    positional: bool,
}

impl ParamBinder {
    pub fn new(hooks: HookTable) -> Self {
        Self {
            hooks,
            positional: false,
        }
    }

    /// Accept array params, bound onto fields in declaration order
    pub fn positional(mut self, enabled: bool) -> Self {
        self.positional = enabled;
        self
    }

    pub fn accepts_positional(&self) -> bool {
        self.positional
    }

    /// Bind raw params into `T`
    ///
    /// Absent params yield `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error carrying the raw params as `data`.
    pub fn bind<T: RpcParams>(&self, params: Option<&RawValue>) -> Result<T, RpcError> {
        match params {
            None => Ok(T::default()),
            Some(raw) => self
                .bind_raw::<T>(raw)
                .map_err(|e| RpcError::invalid_params(e.to_string(), raw)),
        }
    }

    fn bind_raw<T: RpcParams>(&self, raw: &RawValue) -> Result<T, BindError> {
        let tree: Value =
            serde_json::from_str(raw.get()).map_err(|e| BindError::Decode(e.to_string()))?;

        let mut members = match tree {
            Value::Null => return Ok(T::default()),
            Value::Object(members) => members,
            Value::Array(items) if self.positional => zip_positional(T::FIELDS, items)?,
            other => return Err(BindError::NotAnObject(JsonKind::of(&other))),
        };

        let mut target = T::zero_members().map_err(BindError::Decode)?;
        for field in T::FIELDS {
            match members.remove(field.name) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    let converted = self.hooks.convert(field, value)?;
                    target.insert(field.name.to_string(), converted);
                }
            }
        }

        serde_json::from_value(Value::Object(target)).map_err(|e| BindError::Decode(e.to_string()))
    }
}

fn zip_positional(fields: &[Field], items: Vec<Value>) -> Result<Map<String, Value>, BindError> {
    if items.len() > fields.len() {
        return Err(BindError::TooManyPositional {
            expected: fields.len(),
            actual: items.len(),
        });
    }

    Ok(fields
        .iter()
        .zip(items)
        .map(|(field, value)| (field.name.to_string(), value))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::{DateTime, FixedOffset};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Delivery {
        message: String,
        retries: u32,
        urgent: bool,
        #[serde(rename = "sendAt")]
        send_at: Option<DateTime<FixedOffset>>,
    }

    impl RpcParams for Delivery {
        const FIELDS: &'static [Field] = &[
            Field::new("message", FieldKind::String),
            Field::new("retries", FieldKind::Integer),
            Field::new("urgent", FieldKind::Bool),
            Field::new("sendAt", FieldKind::Timestamp),
        ];
    }

    fn raw(text: &str) -> Box<RawValue> {
        RawValue::from_string(text.to_string()).unwrap()
    }

    #[test]
    fn test_absent_params_give_zero_value() {
        let bound: Delivery = ParamBinder::default().bind(None).unwrap();
        assert_eq!(bound, Delivery::default());
    }

    #[test]
    fn test_named_params_bind_matching_fields() {
        let params = raw(r#"{"message":"hi","retries":3,"extra":"ignored"}"#);
        let bound: Delivery = ParamBinder::default().bind(Some(&params)).unwrap();

        assert_eq!(bound.message, "hi");
        assert_eq!(bound.retries, 3);
        assert!(!bound.urgent);
        assert!(bound.send_at.is_none());
    }

    #[test]
    fn test_null_member_keeps_zero_value() {
        let params = raw(r#"{"message":null,"urgent":true}"#);
        let bound: Delivery = ParamBinder::default().bind(Some(&params)).unwrap();

        assert_eq!(bound.message, "");
        assert!(bound.urgent);
    }

    #[test]
    fn test_timestamp_hook_parses_rfc3339() {
        let params = raw(r#"{"sendAt":"2024-05-01T10:30:00+02:00"}"#);
        let bound: Delivery = ParamBinder::default().bind(Some(&params)).unwrap();

        let expected = DateTime::parse_from_rfc3339("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(bound.send_at, Some(expected));
    }

    #[test]
    fn test_bad_timestamp_is_invalid_params() {
        let params = raw(r#"{"sendAt":"yesterday"}"#);
        let err = ParamBinder::default().bind::<Delivery>(Some(&params)).unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("sendAt"));
        assert_eq!(err.data, Some(json!({"sendAt": "yesterday"})));
    }

    #[test]
    fn test_timestamp_without_hook_is_mismatch() {
        let binder = ParamBinder::new(HookTable::empty());
        let params = raw(r#"{"sendAt":"2024-05-01T10:30:00Z"}"#);
        let err = binder.bind::<Delivery>(Some(&params)).unwrap_err();

        assert!(err.message.contains("expected type 'timestamp'"));
    }

    #[test]
    fn test_kind_mismatch_is_hard_failure() {
        let params = raw(r#"{"message":42}"#);
        let err = ParamBinder::default().bind::<Delivery>(Some(&params)).unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "'message' expected type 'string', got 'number'");
    }

    #[test]
    fn test_fractional_number_is_not_integer() {
        let params = raw(r#"{"retries":1.5}"#);
        let err = ParamBinder::default().bind::<Delivery>(Some(&params)).unwrap_err();

        assert!(err.message.contains("'retries'"));
    }

    #[test]
    fn test_out_of_range_integer_fails_decode() {
        let params = raw(r#"{"retries":-1}"#);
        let err = ParamBinder::default().bind::<Delivery>(Some(&params)).unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_scalar_params_rejected() {
        let params = raw(r#""hello""#);
        let err = ParamBinder::default().bind::<Delivery>(Some(&params)).unwrap_err();

        assert_eq!(err.message, "params must be an object, got string");
        assert_eq!(err.data, Some(json!("hello")));
    }

    #[test]
    fn test_positional_params_rejected_by_default() {
        let params = raw(r#"["hi", 2]"#);
        let err = ParamBinder::default().bind::<Delivery>(Some(&params)).unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.data, Some(json!(["hi", 2])));
    }

    #[test]
    fn test_positional_params_when_enabled() {
        let binder = ParamBinder::default().positional(true);
        let params = raw(r#"["hi", 2, true]"#);
        let bound: Delivery = binder.bind(Some(&params)).unwrap();

        assert_eq!(bound.message, "hi");
        assert_eq!(bound.retries, 2);
        assert!(bound.urgent);
    }

    #[test]
    fn test_too_many_positional_params() {
        let binder = ParamBinder::default().positional(true);
        let params = raw(r#"["a", 1, false, null, "extra"]"#);
        let err = binder.bind::<Delivery>(Some(&params)).unwrap_err();

        assert!(err.message.contains("expected at most 4, got 5"));
    }

    #[test]
    fn test_custom_hook_coerces_kind() {
        let mut hooks = HookTable::default();
        hooks.register(JsonKind::Number, FieldKind::String, |v| Ok(Value::String(v.to_string())));
        let binder = ParamBinder::new(hooks);

        let params = raw(r#"{"message":1234}"#);
        let bound: Delivery = binder.bind(Some(&params)).unwrap();

        assert_eq!(bound.message, "1234");
    }

    #[test]
    fn test_default_table_has_timestamp_hook() {
        assert_eq!(HookTable::default().len(), 1);
        assert!(HookTable::empty().is_empty());
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Tagged {
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
    }

    impl RpcParams for Tagged {
        const FIELDS: &'static [Field] = &[
            Field::new("message", FieldKind::String),
            Field::new("tags", FieldKind::Sequence),
        ];

        fn zero_members() -> Result<Map<String, Value>, String> {
            let zero = Self::default();
            let mut members = serialize_members(&zero)?;
            fill_member(&mut members, "tags", &zero.tags)?;
            Ok(members)
        }
    }

    #[test]
    fn test_absent_member_skipped_on_serialize_keeps_zero_value() {
        let params = raw(r#"{"message":"hi"}"#);
        let bound: Tagged = ParamBinder::default().bind(Some(&params)).unwrap();

        assert_eq!(bound.message, "hi");
        assert!(bound.tags.is_empty());
    }

    #[test]
    fn test_fill_member_keeps_serialized_value() {
        let mut members = serialize_members(&json!({"tags": ["a"]})).unwrap();
        fill_member(&mut members, "tags", &Vec::<String>::new()).unwrap();
        fill_member(&mut members, "message", &"").unwrap();

        assert_eq!(Value::Object(members), json!({"tags": ["a"], "message": ""}));
    }
}
