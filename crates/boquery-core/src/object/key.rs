//! Object identity keys.

use boquery_proto::Value;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// Identity of a business object: its class plus primary-key values.
///
/// Integers are widened before comparison, so `Int32(1)` and `Int64(1)`
/// name the same object. Values of different variants never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    class_name: String,
    parts: Vec<(String, KeyValue)>,
}

/// Hashable form of a key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Bit pattern, with negative zero folded into zero.
    Float(u64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Guid(Uuid),
}

impl From<&Value> for KeyValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyValue::Null,
            Value::Bool(b) => KeyValue::Bool(*b),
            Value::Int32(i) => KeyValue::Int(i64::from(*i)),
            Value::Int64(i) => KeyValue::Int(*i),
            Value::Float64(f) if *f == 0.0 => KeyValue::Float(0.0f64.to_bits()),
            Value::Float64(f) => KeyValue::Float(f.to_bits()),
            Value::String(s) => KeyValue::Text(s.clone()),
            Value::Date(d) => KeyValue::Date(*d),
            Value::DateTime(dt) => KeyValue::DateTime(*dt),
            Value::Guid(g) => KeyValue::Guid(*g),
        }
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Null => write!(f, "NULL"),
            KeyValue::Bool(b) => write!(f, "{}", b),
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyValue::Text(s) => write!(f, "{:?}", s),
            KeyValue::Date(d) => write!(f, "{}", d),
            KeyValue::DateTime(dt) => write!(f, "{}", dt),
            KeyValue::Guid(g) => write!(f, "{}", g),
        }
    }
}

impl ObjectKey {
    /// Build a key from `(property, value)` pairs in key order.
    pub fn new<'v>(
        class_name: impl Into<String>,
        parts: impl IntoIterator<Item = (&'v str, &'v Value)>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            parts: parts
                .into_iter()
                .map(|(name, value)| (name.to_string(), KeyValue::from(value)))
                .collect(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.class_name)?;
        for (i, (name, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_and_equality() {
        let a = ObjectKey::new("Car", [("CarID", &Value::Int32(1))]);
        let b = ObjectKey::new("Car", [("CarID", &Value::Int64(1))]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Car(CarID=1)");

        let other_class = ObjectKey::new("Engine", [("CarID", &Value::Int32(1))]);
        assert_ne!(a, other_class);
    }

    #[test]
    fn test_composite_key() {
        let make = Value::from("Ford");
        let model = Value::from("T");
        let key = ObjectKey::new("Car", [("Make", &make), ("Model", &model)]);
        assert_eq!(key.to_string(), "Car(Make=\"Ford\", Model=\"T\")");
    }

    #[test]
    fn test_composite_keys_with_separators_stay_distinct() {
        let (a1, a2) = (Value::from("a, Model=b"), Value::from("c"));
        let (b1, b2) = (Value::from("a"), Value::from("b, Model=c"));
        let a = ObjectKey::new("Car", [("Make", &a1), ("Model", &a2)]);
        let b = ObjectKey::new("Car", [("Make", &b1), ("Model", &b2)]);
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_null_differs_from_text_null() {
        let text = Value::from("NULL");
        let null = ObjectKey::new("Car", [("CarID", &Value::Null)]);
        let named = ObjectKey::new("Car", [("CarID", &text)]);
        assert_ne!(null, named);
    }

    #[test]
    fn test_variants_do_not_mix() {
        let text = Value::from("1");
        assert_ne!(
            ObjectKey::new("Car", [("CarID", &Value::Int32(1))]),
            ObjectKey::new("Car", [("CarID", &text)])
        );
    }
}
