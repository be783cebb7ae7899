//! Generic condition evaluator
//!
//! A [`StatusMap`] describes, per condition type, how a `True`, `False` or
//! `Unknown` condition shapes the verdict. Conditions are applied in the order
//! the resource reports them. When two rules write the same field, the one
//! with the higher `order` wins; a health write is always accepted while the
//! health is still `Unknown`.
//!
//! The default table is embedded in the crate and parsed once when the
//! evaluator is built.

use crate::conditions::{Condition, GenericStatus};
use crate::error::Result;
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const EMBEDDED_STATUS_MAP: &str = include_str!("status_map.yaml");

/// Shared entry for every Crossplane and Upbound managed resource.
pub const CROSSPLANE_KEY: &str = "crossplane.io";
/// Shared entry for every Config Connector resource.
pub const CNRM_KEY: &str = "cnrm.cloud.google.com";

/// Field writes for one condition outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnCondition {
    /// Precedence when several conditions write the same field
    pub order: i32,
    pub ready: bool,
    pub not_ready: bool,
    /// Copy the condition message into the verdict
    pub message: bool,
    pub health: Option<Health>,
    pub status: Option<String>,
}

/// Rule for one condition type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionRule {
    #[serde(flatten)]
    pub on_true: OnCondition,
    pub on_false: Option<OnCondition>,
    pub on_unknown: Option<OnCondition>,
    /// Applied after the outcome rule, keyed by the condition reason
    pub reasons: HashMap<String, OnCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusMap {
    pub conditions: HashMap<String, ConditionRule>,
    /// Forces `ready = false` whenever the final health is not `Healthy`
    pub unhealthy_is_not_ready: bool,
}

/// Verdict under construction plus the precedence of its current status.
#[derive(Debug, Default)]
struct Accumulator {
    verdict: HealthStatus,
    order: i32,
}

impl Accumulator {
    fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, rule: &OnCondition, condition: &Condition) {
        if rule.ready {
            self.verdict.ready = true;
        }
        if rule.not_ready {
            self.verdict.ready = false;
        }

        if let Some(health) = rule.health {
            if rule.order >= self.order || self.verdict.health == Health::Unknown {
                self.verdict.health = health;
            }
        }

        let status = rule
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(condition.reason.as_str()).filter(|r| !r.is_empty()));
        if let Some(status) = status {
            if self.verdict.status.is_empty() || rule.order >= self.order {
                self.verdict.status = StatusCode::new(status);
                self.order = rule.order;
            }
        }

        if rule.message && !condition.message.is_empty() {
            self.write_message(rule.order, &condition.message);
        }
    }

    fn write_message(&mut self, order: i32, message: &str) {
        if self.verdict.message.is_empty() || order >= self.order {
            self.verdict.message = message.to_string();
        }
    }

    fn fill_status_from_reason(&mut self, condition: &Condition) {
        if self.verdict.status.is_empty() && !condition.reason.is_empty() {
            self.verdict.status = StatusCode::new(condition.reason.as_str());
        }
    }

    fn apply_rule(&mut self, rule: &ConditionRule, condition: &Condition) {
        if condition.is_true() {
            self.apply(&rule.on_true, condition);
        } else if condition.is_false() {
            match &rule.on_false {
                Some(on_false) => self.apply(on_false, condition),
                None => self.infer_false(&rule.on_true, condition),
            }
        } else if condition.is_unknown() {
            if let Some(on_unknown) = &rule.on_unknown {
                self.apply(on_unknown, condition);
            }
        }

        if let Some(by_reason) = rule.reasons.get(&condition.reason) {
            self.apply(by_reason, condition);
        }
    }

    /// A `False` condition whose rule has no explicit `onFalse`.
    fn infer_false(&mut self, rule: &OnCondition, condition: &Condition) {
        if rule.health == Some(Health::Healthy) {
            self.verdict.health = Health::Unhealthy;
            if rule.message {
                self.verdict.message = condition.message.clone();
            }
            self.fill_status_from_reason(condition);
        }
        if rule.ready {
            self.fill_status_from_reason(condition);
        }
        if rule.message {
            self.write_message(rule.order, &condition.message);
        }
    }

    fn finish(self) -> HealthStatus {
        self.verdict
    }
}

impl StatusMap {
    /// Evaluates the conditions of `status` against this table.
    pub fn evaluate(&self, status: &GenericStatus) -> HealthStatus {
        let mut acc = Accumulator::new();
        if self.conditions.is_empty() {
            return acc.finish();
        }

        for condition in &status.conditions {
            if let Some(rule) = self.conditions.get(&condition.type_) {
                acc.apply_rule(rule, condition);
            }
        }

        let mut verdict = acc.finish();
        if self.unhealthy_is_not_ready && verdict.health != Health::Healthy {
            verdict.ready = false;
        }
        verdict
    }
}

/// Status maps keyed by `"{apiVersion}/{kind}"` or by kind.
#[derive(Debug, Clone, Default)]
pub struct StatusMaps {
    maps: BTreeMap<String, StatusMap>,
}

impl StatusMaps {
    /// The table shipped with the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_STATUS_MAP)
    }

    pub fn from_yaml(document: &str) -> Result<Self> {
        let maps: BTreeMap<String, StatusMap> = serde_yaml::from_str(document)?;
        Ok(Self { maps })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Table for a resource: the exact `apiVersion/kind` entry first, then the
    /// kind (or the shared entry of its API family).
    pub fn lookup(&self, api_version: &str, kind: &str) -> Option<&StatusMap> {
        let group = api_version.split('/').next().unwrap_or_default();
        let fallback = if group.ends_with("crossplane.io") || group.ends_with("upbound.io") {
            CROSSPLANE_KEY
        } else if group.ends_with(CNRM_KEY) {
            CNRM_KEY
        } else {
            kind
        };

        self.maps
            .get(&format!("{api_version}/{kind}"))
            .or_else(|| self.maps.get(fallback))
    }

    /// Evaluates `resource` against its table, `None` when it has none.
    pub fn evaluate(&self, resource: &Resource) -> Option<HealthStatus> {
        let map = self.lookup(resource.api_version(), resource.kind())?;
        Some(map.evaluate(&GenericStatus::from_resource(resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(type_: &str, status: &str, reason: &str, message: &str) -> Condition {
        Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: None,
        }
    }

    fn generic(conditions: Vec<Condition>) -> GenericStatus {
        GenericStatus {
            conditions,
            ..Default::default()
        }
    }

    fn map(yaml: &str) -> StatusMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_embedded_table_parses() {
        let maps = StatusMaps::embedded().unwrap();
        assert!(maps.lookup("kustomize.toolkit.fluxcd.io/v1", "Kustomization").is_some());
        assert!(maps.lookup("external-secrets.io/v1beta1", "ExternalSecret").is_some());
    }

    #[test]
    fn test_empty_table_is_bare_unknown() {
        let hs = StatusMap::default().evaluate(&generic(vec![condition("Ready", "True", "Ok", "")]));
        assert_eq!(hs, HealthStatus::default());
    }

    #[test]
    fn test_true_condition_sets_fields() {
        let m = map("conditions:\n  Ready:\n    ready: true\n    health: healthy\n    message: true\n");
        let hs = m.evaluate(&generic(vec![condition("Ready", "True", "Synced", "all good")]));
        assert!(hs.ready);
        assert_eq!(hs.health, Health::Healthy);
        assert_eq!(hs.status, "Synced");
        assert_eq!(hs.message, "all good");
    }

    #[test]
    fn test_false_healthy_rule_infers_unhealthy() {
        let m = map("conditions:\n  Ready:\n    ready: true\n    health: healthy\n    message: true\n");
        let hs = m.evaluate(&generic(vec![condition(
            "Ready",
            "False",
            "BuildFailed",
            "kustomize build failed",
        )]));
        assert_eq!(hs.health, Health::Unhealthy);
        assert_eq!(hs.status, "BuildFailed");
        assert_eq!(hs.message, "kustomize build failed");
        assert!(!hs.ready);
    }

    #[test]
    fn test_higher_order_wins() {
        let m = map(concat!(
            "conditions:\n",
            "  Synced:\n    order: 1\n    health: unhealthy\n    status: SyncError\n",
            "  Ready:\n    health: healthy\n    status: Available\n",
        ));
        let hs = m.evaluate(&generic(vec![
            condition("Synced", "True", "", ""),
            condition("Ready", "True", "", ""),
        ]));
        assert_eq!(hs.health, Health::Unhealthy);
        assert_eq!(hs.status, "SyncError");
    }

    #[test]
    fn test_equal_order_overwrites() {
        let m = map(concat!(
            "conditions:\n",
            "  A:\n    health: warning\n    status: First\n",
            "  B:\n    health: healthy\n    status: Second\n",
        ));
        let hs = m.evaluate(&generic(vec![
            condition("A", "True", "", ""),
            condition("B", "True", "", ""),
        ]));
        assert_eq!(hs.health, Health::Healthy);
        assert_eq!(hs.status, "Second");
    }

    #[test]
    fn test_unknown_health_is_always_replaced() {
        let m = map(concat!(
            "conditions:\n",
            "  A:\n    order: 5\n    status: First\n",
            "  B:\n    health: warning\n",
        ));
        let hs = m.evaluate(&generic(vec![
            condition("A", "True", "", ""),
            condition("B", "True", "", ""),
        ]));
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.status, "First");
    }

    #[test]
    fn test_on_unknown_and_reasons() {
        let m = map(concat!(
            "conditions:\n",
            "  Ready:\n",
            "    ready: true\n",
            "    health: healthy\n",
            "    onUnknown:\n      status: Progressing\n      notReady: true\n",
            "    reasons:\n",
            "      DependencyNotReady:\n        health: unknown\n        notReady: true\n",
        ));
        let hs = m.evaluate(&generic(vec![condition("Ready", "Unknown", "Reconciling", "")]));
        assert_eq!(hs.status, "Progressing");
        assert!(!hs.ready);

        let hs = m.evaluate(&generic(vec![condition("Ready", "False", "DependencyNotReady", "")]));
        assert_eq!(hs.status, "DependencyNotReady");
        assert_eq!(hs.health, Health::Unknown);
    }

    #[test]
    fn test_unhealthy_is_not_ready() {
        let m = map(concat!(
            "unhealthyIsNotReady: true\n",
            "conditions:\n",
            "  Ready:\n    ready: true\n    health: warning\n",
        ));
        let hs = m.evaluate(&generic(vec![condition("Ready", "True", "", "")]));
        assert_eq!(hs.health, Health::Warning);
        assert!(!hs.ready);
    }

    #[test]
    fn test_lookup_keys() {
        let maps = StatusMaps::from_yaml(concat!(
            "crossplane.io:\n  conditions: {}\n",
            "Widget:\n  unhealthyIsNotReady: true\n",
            "example.com/v2/Widget:\n  conditions: {}\n",
        ))
        .unwrap();
        assert!(maps.lookup("rds.aws.upbound.io/v1beta1", "Instance").is_some());
        assert!(maps.lookup("pkg.crossplane.io/v1", "Provider").is_some());
        assert!(!maps.lookup("example.com/v2", "Widget").unwrap().unhealthy_is_not_ready);
        assert!(maps.lookup("example.com/v1", "Widget").unwrap().unhealthy_is_not_ready);
        assert!(maps.lookup("example.com/v1", "Gadget").is_none());
    }

    #[test]
    fn test_evaluate_resource() {
        let maps = StatusMaps::from_yaml("Widget:\n  conditions:\n    Ready:\n      health: healthy\n").unwrap();
        let widget = Resource::new(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "status": {"conditions": [{"type": "Ready", "status": "True", "reason": "Done"}]}
        }));
        let hs = maps.evaluate(&widget).unwrap();
        assert_eq!(hs.health, Health::Healthy);
        assert_eq!(hs.status, "Done");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(StatusMaps::from_yaml("Widget: [unterminated").is_err());
    }
}
