//! Property definitions for business object classes.

use boquery_proto::{Value, DATE_FORMAT, DATE_TIME_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropType {
    String,
    Int32,
    Int64,
    Float64,
    Bool,
    Date,
    DateTime,
    Guid,
}

impl PropType {
    /// Type name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PropType::String => "String",
            PropType::Int32 => "Int32",
            PropType::Int64 => "Int64",
            PropType::Float64 => "Float64",
            PropType::Bool => "Bool",
            PropType::Date => "Date",
            PropType::DateTime => "DateTime",
            PropType::Guid => "Guid",
        }
    }

    /// Convert a value to this type.
    ///
    /// Accepts the loose forms that arrive from criteria text and store rows:
    /// strings holding numbers, dates or GUIDs, integers holding booleans, and
    /// dates for date-times. Null passes through unchanged.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let converted = match (self, &value) {
            (PropType::String, Value::String(_)) => Some(value.clone()),
            (PropType::String, other) => Some(Value::String(other.to_string())),

            (PropType::Int32, Value::Int32(_)) => Some(value.clone()),
            (PropType::Int32, Value::Int64(i)) => i32::try_from(*i).ok().map(Value::Int32),
            (PropType::Int32, Value::String(s)) => s.trim().parse().ok().map(Value::Int32),

            (PropType::Int64, Value::Int32(i)) => Some(Value::Int64(*i as i64)),
            (PropType::Int64, Value::Int64(_)) => Some(value.clone()),
            (PropType::Int64, Value::String(s)) => s.trim().parse().ok().map(Value::Int64),

            (PropType::Float64, v @ (Value::Int32(_) | Value::Int64(_) | Value::Float64(_))) => {
                v.as_f64().map(Value::Float64)
            }
            (PropType::Float64, Value::String(s)) => s.trim().parse().ok().map(Value::Float64),

            (PropType::Bool, Value::Bool(_)) => Some(value.clone()),
            (PropType::Bool, v @ (Value::Int32(_) | Value::Int64(_))) => match v.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            (PropType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },

            (PropType::Date, Value::Date(_)) => Some(value.clone()),
            (PropType::Date, Value::DateTime(dt)) => Some(Value::Date(dt.date())),
            (PropType::Date, Value::String(s)) => parse_date(s).map(Value::Date),

            (PropType::DateTime, Value::DateTime(_)) => Some(value.clone()),
            (PropType::DateTime, Value::Date(_)) => value.as_date_time().map(Value::DateTime),
            (PropType::DateTime, Value::String(s)) => parse_date_time(s).map(Value::DateTime),

            (PropType::Guid, Value::Guid(_)) => Some(value.clone()),
            (PropType::Guid, Value::String(s)) => Uuid::parse_str(s.trim()).ok().map(Value::Guid),

            _ => None,
        };

        converted.ok_or_else(|| Error::Conversion {
            value: value.to_string(),
            from: value.type_name(),
            to: self.name(),
        })
    }
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .ok()
        .or_else(|| parse_date_time(s).map(|dt| dt.date()))
}

/// Controls when a property may be written through the public setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadWriteRule {
    /// Always writable.
    #[default]
    ReadWrite,
    /// Never writable; only populated from the store or a default.
    ReadOnly,
    /// Writable until a non-null value has been persisted.
    WriteOnce,
    /// Writable only while the object has not yet been saved.
    WriteNew,
}

/// A property definition within a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDef {
    /// Property name, unique within the class hierarchy.
    pub name: String,
    /// Column name in the store. Empty means the property name.
    #[serde(default)]
    pub field_name: String,
    /// Declared type.
    pub prop_type: PropType,
    /// Write rule.
    #[serde(default)]
    pub read_write_rule: ReadWriteRule,
    /// Value given to new objects.
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether the property is stored. Non-persisted properties are neither
    /// projected nor written.
    #[serde(default = "default_true")]
    pub persisted: bool,
    /// Whether a non-null value is required to save.
    #[serde(default)]
    pub compulsory: bool,
}

fn default_true() -> bool {
    true
}

impl PropDef {
    /// Create a persisted read-write property stored under its own name.
    pub fn new(name: impl Into<String>, prop_type: PropType) -> Self {
        let name = name.into();
        Self {
            field_name: name.clone(),
            name,
            prop_type,
            read_write_rule: ReadWriteRule::ReadWrite,
            default: None,
            persisted: true,
            compulsory: false,
        }
    }

    /// Store under a different column name.
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// Set the read-write rule.
    pub fn with_rule(mut self, rule: ReadWriteRule) -> Self {
        self.read_write_rule = rule;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as required for save.
    pub fn compulsory(mut self) -> Self {
        self.compulsory = true;
        self
    }

    /// Mark as not stored.
    pub fn not_persisted(mut self) -> Self {
        self.persisted = false;
        self
    }

    pub(crate) fn normalise(&mut self) {
        if self.field_name.is_empty() {
            self.field_name = self.name.clone();
        }
    }
}
