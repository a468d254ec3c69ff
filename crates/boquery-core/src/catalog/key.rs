//! Primary and alternate key definitions.

use serde::{Deserialize, Serialize};

/// An alternate (unique) key over one or more properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    /// Key name.
    pub name: String,
    /// Property names forming the key.
    pub props: Vec<String>,
}

impl KeyDef {
    pub fn new(name: impl Into<String>, props: &[&str]) -> Self {
        Self {
            name: name.into(),
            props: props.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// The identity-defining key of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyDef {
    /// Property names forming the key, in key order.
    pub props: Vec<String>,
    /// Whether the key is a single GUID generated for new objects.
    #[serde(default)]
    pub is_object_id: bool,
}

impl PrimaryKeyDef {
    /// Key over caller-assigned properties.
    pub fn new(props: &[&str]) -> Self {
        Self {
            props: props.iter().map(|p| p.to_string()).collect(),
            is_object_id: false,
        }
    }

    /// Single generated GUID key.
    pub fn object_id(prop: impl Into<String>) -> Self {
        Self {
            props: vec![prop.into()],
            is_object_id: true,
        }
    }

    /// Whether `prop` is part of the key.
    pub fn contains(&self, prop: &str) -> bool {
        self.props.iter().any(|p| p == prop)
    }
}
