//! Scholarship records, match profiles, and match outcomes.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::ProfileValue;

/// Degree eligibility of a scholarship: free text or a list of degree names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Degrees {
    /// Exact membership.
    List(Vec<String>),
    /// Substring containment.
    Text(String),
}

impl Default for Degrees {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Degrees {
    /// Whether the field carries no degree information at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(items) => items.is_empty(),
            Self::Text(text) => text.is_empty(),
        }
    }

    /// Case-sensitive containment: membership for lists, substring for text.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            Self::List(items) => items.iter().any(|d| d == needle),
            Self::Text(text) => text.contains(needle),
        }
    }
}

impl<'de> Deserialize<'de> for Degrees {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => Self::default(),
            Some(Value::Array(items)) => Self::List(items.into_iter().map(value_to_text).collect()),
            Some(other) => Self::Text(value_to_text(other)),
        })
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(value_to_text).unwrap_or_default())
}

/// A scholarship record as found in the dataset.
///
/// Fields the matcher does not look at are kept in `extra` and echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default)]
    pub degrees: Degrees,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub funds: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub deadline: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A scholarship that passed the hard filters, with its funding score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScholarship {
    #[serde(flatten)]
    pub scholarship: Scholarship,
    pub score: u32,
}

/// Search preferences. `None` means the key was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProfile {
    pub degree: Option<String>,
    pub country: Option<String>,
    pub funding: Option<String>,
}

impl MatchProfile {
    /// Build from a JSON object. Non-string values are coerced to text; `null`
    /// counts as absent.
    pub fn from_json(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .filter(|v| !v.is_null())
                .cloned()
                .map(|v| ProfileValue::from_json(v).as_text())
        };
        Self {
            degree: field("degree"),
            country: field("country"),
            funding: field("funding"),
        }
    }

    /// Build from a retrieved (unprefixed) user profile.
    pub fn from_profile(profile: &BTreeMap<String, ProfileValue>) -> Self {
        let field = |key: &str| profile.get(key).map(ProfileValue::as_text);
        Self {
            degree: field("degree"),
            country: field("country"),
            funding: field("funding"),
        }
    }
}

/// Result of a scholarship lookup, in the wire shape callers expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Success {
        scholarships: Vec<RankedScholarship>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        error_message: String,
    },
}

impl MatchOutcome {
    /// Success outcome; an empty list carries the "no matches" message.
    pub fn success(scholarships: Vec<RankedScholarship>) -> Self {
        let message = scholarships
            .is_empty()
            .then(|| "No matching scholarships found".to_string());
        Self::Success {
            scholarships,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Matched scholarships; empty on error.
    pub fn scholarships(&self) -> &[RankedScholarship] {
        match self {
            Self::Success { scholarships, .. } => scholarships,
            Self::Error { .. } => &[],
        }
    }
}
