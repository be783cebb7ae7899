//! Resource document wrapper
//!
//! A [`Resource`] is the caller-supplied snapshot of an object, kept as a raw
//! JSON tree. Built-in kinds project it onto `k8s-openapi` types; everything
//! else is probed by path.

use crate::error::{HealthError, Result};
use crate::util::parse_time;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    object: Value,
}

impl Resource {
    pub fn new(object: Value) -> Self {
        Self { object }
    }

    /// Parses a YAML or JSON document; the top level must be a mapping.
    pub fn from_yaml(document: &str) -> Result<Self> {
        let object: Value = serde_yaml::from_str(document)
            .map_err(|e| HealthError::Document(e.to_string()))?;
        if !object.is_object() {
            return Err(HealthError::Document(
                "top level of the document is not a mapping".to_string(),
            ));
        }
        Ok(Self::new(object))
    }

    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn into_inner(self) -> Value {
        self.object
    }

    pub fn api_version(&self) -> &str {
        self.get_str(&["apiVersion"]).unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.get_str(&["kind"]).unwrap_or_default()
    }

    /// API group; empty for the core group (`apiVersion: v1`).
    pub fn group(&self) -> &str {
        match self.api_version().split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn version(&self) -> &str {
        match self.api_version().split_once('/') {
            Some((_, version)) => version,
            None => self.api_version(),
        }
    }

    pub fn name(&self) -> &str {
        self.get_str(&["metadata", "name"]).unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.get_str(&["metadata", "namespace"]).unwrap_or_default()
    }

    pub fn generation(&self) -> Option<i64> {
        self.get_i64(&["metadata", "generation"])
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.get(&["metadata", "annotations", key])?.as_str()
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.get_time(&["metadata", "creationTimestamp"])
    }

    pub fn deletion_timestamp(&self) -> Option<DateTime<Utc>> {
        self.get_time(&["metadata", "deletionTimestamp"])
    }

    pub fn status(&self) -> Option<&Map<String, Value>> {
        self.get(&["status"])?.as_object()
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        lookup(&self.object, path)
    }

    /// Trimmed string at `path`; empty strings are treated as absent.
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        lookup_str(&self.object, path)
    }

    pub fn get_i64(&self, path: &[&str]) -> Option<i64> {
        lookup_i64(&self.object, path)
    }

    pub fn get_bool(&self, path: &[&str]) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    pub fn get_time(&self, path: &[&str]) -> Option<DateTime<Utc>> {
        self.get_str(path).and_then(parse_time)
    }

    /// Like [`Resource::get_time`] but reports unparsable values.
    pub fn try_time(&self, path: &[&str]) -> Result<Option<DateTime<Utc>>> {
        match self.get_str(path) {
            None => Ok(None),
            Some(raw) => parse_time(raw)
                .map(Some)
                .ok_or_else(|| HealthError::timestamp(path.join("."), raw)),
        }
    }

    /// Projects the document onto a typed API object.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.object.clone())
            .map_err(|e| HealthError::conversion(self.kind(), e))
    }
}

impl From<Value> for Resource {
    fn from(object: Value) -> Self {
        Resource::new(object)
    }
}

pub(crate) fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

pub(crate) fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Integer at `path`, accepting numeric strings as well.
pub(crate) fn lookup_i64(value: &Value, path: &[&str]) -> Option<i64> {
    match lookup(value, path)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_and_version() {
        let deploy = Resource::new(json!({"apiVersion": "apps/v1", "kind": "Deployment"}));
        assert_eq!(deploy.group(), "apps");
        assert_eq!(deploy.version(), "v1");

        let pod = Resource::new(json!({"apiVersion": "v1", "kind": "Pod"}));
        assert_eq!(pod.group(), "");
        assert_eq!(pod.version(), "v1");
    }

    #[test]
    fn test_from_yaml() {
        let res = Resource::from_yaml(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n  creationTimestamp: 2024-01-01T00:00:00Z\n",
        )
        .unwrap();
        assert_eq!(res.name(), "web");
        assert!(res.creation_timestamp().is_some());
        assert!(Resource::from_yaml("- a\n- b\n").is_err());
        assert!(Resource::from_yaml("key: [unclosed").is_err());
    }

    #[test]
    fn test_try_time_reports_bad_values() {
        let res = Resource::new(json!({"status": {"notAfter": "never"}}));
        let err = res.try_time(&["status", "notAfter"]).unwrap_err();
        assert!(!err.is_structural());
        assert_eq!(res.try_time(&["status", "renewalTime"]).unwrap(), None);
    }

    #[test]
    fn test_lookup_i64_accepts_strings() {
        let value = json!({"a": {"b": "12", "c": 3, "d": 2.0}});
        assert_eq!(lookup_i64(&value, &["a", "b"]), Some(12));
        assert_eq!(lookup_i64(&value, &["a", "c"]), Some(3));
        assert_eq!(lookup_i64(&value, &["a", "d"]), Some(2));
        assert_eq!(lookup_i64(&value, &["a", "e"]), None);
    }
}
