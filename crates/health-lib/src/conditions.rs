//! Read-only view over a resource's `status` sub-document

use crate::resource::{lookup_i64, Resource};
use crate::util::parse_time;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Condition type that never matches a lookup.
pub const NO_CONDITION: &str = "none";

/// A controller-reported status condition.
///
/// Parsed leniently: missing fields default to empty strings so that partial
/// conditions written by third-party controllers still participate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: String,
    pub message: String,
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    pub fn is_false(&self) -> bool {
        self.status == "False"
    }

    pub fn is_unknown(&self) -> bool {
        self.status == "Unknown"
    }

    pub fn transition_time(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time.as_deref().and_then(parse_time)
    }
}

/// Parses a list of conditions, skipping entries that are not mappings.
pub fn parse_conditions(value: Option<&Value>) -> Vec<Condition> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| Condition::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Conditions plus the raw status field map.
#[derive(Debug, Clone, Default)]
pub struct GenericStatus {
    pub conditions: Vec<Condition>,
    pub fields: Map<String, Value>,
}

impl GenericStatus {
    pub fn from_resource(resource: &Resource) -> Self {
        let fields = resource.status().cloned().unwrap_or_default();
        let conditions = parse_conditions(fields.get("conditions"));
        Self { conditions, fields }
    }

    /// Integer status field.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(|v| lookup_i64(v, &[]))
    }

    pub fn find_condition(&self, type_: &str) -> Option<&Condition> {
        if type_.is_empty() || type_ == NO_CONDITION {
            return None;
        }
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}
