//! Value tree for aggregated payloads, plus the kind classifier the merge engine dispatches on
//!
//! Numbers keep the subkind they were decoded with: a non-negative integer literal
//! is `UnsignedInt`, a negative one is `SignedInt`, and anything with a fraction,
//! an exponent, or out of 64-bit range is `Float`.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Field name → value. Keys are unique and serialize in ascending order.
pub type Object = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    String(String),
    SignedInt(i64),
    UnsignedInt(u64),
    Float(f64),
    Object(Object),
    Array(Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    String,
    Number,
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    SignedInt,
    UnsignedInt,
    Float,
}

impl Value {
    /// Kind and, for numbers, the numeric subkind
    pub fn classify(&self) -> (ValueKind, Option<NumericKind>) {
        match self {
            Value::Null => (ValueKind::Null, None),
            Value::Bool(_) => (ValueKind::Bool, None),
            Value::String(_) => (ValueKind::String, None),
            Value::SignedInt(_) => (ValueKind::Number, Some(NumericKind::SignedInt)),
            Value::UnsignedInt(_) => (ValueKind::Number, Some(NumericKind::UnsignedInt)),
            Value::Float(_) => (ValueKind::Number, Some(NumericKind::Float)),
            Value::Object(_) => (ValueKind::Object, None),
            Value::Array(_) => (ValueKind::Array, None),
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.classify().0
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        self.classify().1
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_kind().is_some()
    }

    /// Widen any numeric subkind to `f64`. `None` for non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::SignedInt(n) => Some(n as f64),
            Value::UnsignedInt(n) => Some(n as f64),
            Value::Float(n) => Some(n),
            _ => None,
        }
    }

    /// Container nesting depth; scalars are 0, `{}` and `[]` are 1.
    pub fn depth(&self) -> usize {
        match self {
            Value::Object(map) => 1 + map.values().map(Value::depth).max().unwrap_or(0),
            Value::Array(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::SignedInt(_) => "signed integer",
            Value::UnsignedInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Value::UnsignedInt(u)
                } else if let Some(i) = n.as_i64() {
                    Value::SignedInt(i)
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::SignedInt(n) => serializer.serialize_i64(*n),
            Value::UnsignedInt(n) => serializer.serialize_u64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any JSON value")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
                if v >= 0 {
                    Ok(Value::UnsignedInt(v as u64))
                } else {
                    Ok(Value::SignedInt(v))
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
                Ok(Value::UnsignedInt(v))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
                Ok(Value::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::String(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> Result<Value, E> {
                Ok(Value::String(v))
            }

            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Value::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element::<Value>()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                // Duplicate keys: the last occurrence wins
                let mut object = Object::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    object.insert(key, value);
                }
                Ok(Value::Object(object))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
