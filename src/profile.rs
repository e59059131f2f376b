//! Profile store — user facts kept in a two-layer session state.
//!
//! Session state is a committed `base` layer (loaded from the store) plus an
//! uncommitted `delta` layer written during the current turn. Reads merge the
//! two with the delta winning. User facts live under the `user:` namespace;
//! anything else in the state is internal and never exposed by
//! [`SessionState::retrieve_profile`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace prefix for user-supplied facts.
pub const USER_PREFIX: &str = "user:";

/// A scalar profile value.
///
/// Values that are not scalars (null, arrays, objects) are kept as their JSON
/// text rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ProfileValue {
    /// Convert an arbitrary JSON value, coercing non-scalars to text.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) => Self::Float(f),
                (None, None) => Self::Text(n.to_string()),
            },
            Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }

    /// JSON form of the value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// String coercion used wherever a profile value is compared as text.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ProfileValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ProfileValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ProfileValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ProfileValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for ProfileValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// Base/delta overlay of one session's key-value state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    base: BTreeMap<String, ProfileValue>,
    delta: BTreeMap<String, ProfileValue>,
}

impl SessionState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose committed layer is `base` (as loaded from the store).
    pub fn with_base(base: BTreeMap<String, ProfileValue>) -> Self {
        Self {
            base,
            delta: BTreeMap::new(),
        }
    }

    /// Read a raw key, delta first.
    pub fn get(&self, key: &str) -> Option<&ProfileValue> {
        self.delta.get(key).or_else(|| self.base.get(key))
    }

    /// Write a raw key into the delta. Last write wins.
    pub fn set(&mut self, key: impl Into<String>, value: ProfileValue) {
        self.delta.insert(key.into(), value);
    }

    /// Merged view of both layers.
    pub fn merged(&self) -> BTreeMap<String, ProfileValue> {
        let mut merged = self.base.clone();
        merged.extend(self.delta.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Whether there are writes not yet committed.
    pub fn is_dirty(&self) -> bool {
        !self.delta.is_empty()
    }

    /// Uncommitted writes.
    pub fn delta(&self) -> &BTreeMap<String, ProfileValue> {
        &self.delta
    }

    /// Fold the delta into the base and return the folded entries, in key
    /// order with the last write per key.
    ///
    /// The caller is responsible for persisting what is returned.
    pub fn commit(&mut self) -> BTreeMap<String, ProfileValue> {
        let delta = std::mem::take(&mut self.delta);
        self.base
            .extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
        delta
    }

    /// Fold entries that are already persisted straight into the base.
    ///
    /// Pending writes to the same keys are superseded and dropped.
    pub fn absorb(&mut self, persisted: BTreeMap<String, ProfileValue>) {
        for (key, value) in persisted {
            self.delta.remove(&key);
            self.base.insert(key, value);
        }
    }

    /// Save user facts under the `user:` namespace. Returns the field names
    /// in the order they were given.
    pub fn save_profile<I, K>(&mut self, fields: I) -> Vec<String>
    where
        I: IntoIterator<Item = (K, ProfileValue)>,
        K: Into<String>,
    {
        let mut saved = Vec::new();
        for (name, value) in fields {
            let name = name.into();
            self.set(format!("{USER_PREFIX}{name}"), value);
            saved.push(name);
        }
        saved
    }

    /// Merged user facts with the namespace stripped.
    pub fn retrieve_profile(&self) -> BTreeMap<String, ProfileValue> {
        self.merged()
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(USER_PREFIX)
                    .map(|name| (name.to_string(), value))
            })
            .collect()
    }
}
