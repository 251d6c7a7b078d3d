//! Bean envelope decoder
//!
//! Parses the management endpoint's `{"beans":[{...}, ...]}` envelope into
//! an ordered sequence of [`Bean`] records. Beans are heterogeneous and
//! schema-free, so field values are kept as a tagged variant with total,
//! non-panicking accessors; extraction rules consume those instead of
//! unchecked casts.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::DecodeError;

/// A single untyped field value inside a bean.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Array
    Array(Vec<FieldValue>),
    /// Nested object (e.g. `HeapMemoryUsage`)
    Object(HashMap<String, FieldValue>),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    ///
    /// # Precision Warning
    /// When converting `Integer(i64)` to `f64`, precision loss may occur
    /// for values > 2^53 (9,007,199,254,740,992).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => {
                if i.unsigned_abs() > (1u64 << 53) {
                    tracing::warn!(
                        value = i,
                        "Large integer may lose precision when converted to f64"
                    );
                }
                Some(*i as f64)
            }
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Member of a nested object, if this value is an object
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Object(map) => map.get(key),
            _ => None,
        }
    }
}

/// One introspection record from the management endpoint.
///
/// `name` and `modeler_type` drive rule matching; everything else is
/// reachable through [`Bean::field`]. A bean without a `name` or
/// `modelerType` decodes with an empty string there and simply never
/// matches a rule.
#[derive(Debug, Clone)]
pub struct Bean {
    /// Component identifier, e.g. `Hadoop:service=NameNode,name=FSNamesystem`
    pub name: String,
    /// Implementation type, e.g. `RpcActivityForPort8020`
    pub modeler_type: String,
    fields: HashMap<String, FieldValue>,
}

impl Bean {
    /// Look up a field; absence is normal, never an error
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Numeric field shortcut
    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(FieldValue::as_f64)
    }

    /// String field shortcut (tags such as `tag.port`, `tag.HAState`)
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_str)
    }
}

/// Decode the raw endpoint body into an ordered bean sequence.
///
/// The output length and order match the input array. `{"beans":[]}` is an
/// empty Ok; any other top-level shape is a [`DecodeError`].
pub fn decode(bytes: &[u8]) -> Result<Vec<Bean>, DecodeError> {
    let root: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Json(e.to_string()))?;

    let Value::Object(mut envelope) = root else {
        return Err(DecodeError::NotAnObject);
    };

    let beans_value = envelope.remove("beans").ok_or(DecodeError::MissingBeans)?;
    let Value::Array(raw_beans) = beans_value else {
        return Err(DecodeError::BeansNotArray);
    };

    let mut beans = Vec::with_capacity(raw_beans.len());
    for (index, raw) in raw_beans.into_iter().enumerate() {
        let Value::Object(obj) = raw else {
            return Err(DecodeError::BeanNotObject(index));
        };

        let mut fields = HashMap::with_capacity(obj.len());
        for (key, value) in obj {
            fields.insert(key, convert_value(value));
        }

        let name = fields
            .get("name")
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_string();
        let modeler_type = fields
            .get("modelerType")
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_string();

        beans.push(Bean {
            name,
            modeler_type,
            fields,
        });
    }

    Ok(beans)
}

fn convert_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else {
                // as_f64 is total for any JSON number that is not an i64
                FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => FieldValue::String(s),
        Value::Array(arr) => FieldValue::Array(arr.into_iter().map(convert_value).collect()),
        Value::Object(map) => FieldValue::Object(
            map.into_iter()
                .map(|(k, v)| (k, convert_value(v)))
                .collect(),
        ),
    }
}
