//! Heuristic classification of free-form status strings
//!
//! Cloud APIs and CRDs report state as loosely formatted strings
//! (`UPDATE_ROLLBACK_COMPLETE`, `shutting-down`, `createInProgress`). The
//! classifier canonicalizes the string into human case and matches the
//! lowercased words against an ordered rule table. The first matching rule
//! wins.

use crate::models::{Health, HealthStatus, StatusCode};
use crate::util::{human_case, words};

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Exact(&'static [&'static str]),
    Prefix(&'static str),
    Contains(&'static str),
}

impl Pattern {
    fn matches(&self, key: &str) -> bool {
        match self {
            Pattern::Exact(values) => values.contains(&key),
            Pattern::Prefix(prefix) => key.starts_with(prefix),
            Pattern::Contains(needle) => key.contains(needle),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    pattern: Pattern,
    health: Health,
    ready: bool,
}

const fn rule(pattern: Pattern, health: Health, ready: bool) -> Rule {
    Rule {
        pattern,
        health,
        ready,
    }
}

/// Exact keyword sets first, then the prefix/substring fallbacks.
const RULES: &[Rule] = &[
    // operations that keep the resource serving
    rule(
        Pattern::Exact(&[
            "update complete cleanup in progress",
            "update in progress",
            "updating",
            "maintenance",
            "rebooting",
            "storage full",
            "storage optimization",
            "upgrading",
            "resetting master credentials",
            "modifying",
            "reconciling",
        ]),
        Health::Healthy,
        false,
    ),
    // quiesced or gone
    rule(
        Pattern::Exact(&["stopped", "terminated", "delete complete", "deleted"]),
        Health::Unknown,
        true,
    ),
    // in flight
    rule(
        Pattern::Exact(&[
            "creating",
            "create in progress",
            "stopping",
            "shutting down",
            "delete in progress",
            "import in progress",
            "deleting",
            "provisioning",
            "staging",
            "suspending",
        ]),
        Health::Unknown,
        false,
    ),
    rule(
        Pattern::Exact(&[
            "create failed",
            "delete failed",
            "import rollback failed",
            "rollback failed",
            "update failed",
            "update rollback failed",
            "failed",
            "error",
            "insufficient capacity",
        ]),
        Health::Unhealthy,
        true,
    ),
    rule(
        Pattern::Exact(&[
            "running",
            "active",
            "create complete",
            "import complete",
            "update complete",
            "available",
            "in use",
            "ready",
        ]),
        Health::Healthy,
        true,
    ),
    rule(
        Pattern::Exact(&[
            "rollback in progress",
            "import rollback in progress",
            "update rollback in progress",
            "degraded",
            "restoring",
        ]),
        Health::Warning,
        false,
    ),
    rule(
        Pattern::Exact(&[
            "suspended",
            "import rollback complete",
            "rollback complete",
            "update rollback complete",
            "active impaired",
        ]),
        Health::Warning,
        true,
    ),
    rule(Pattern::Prefix("inaccessible"), Health::Unhealthy, true),
    rule(Pattern::Prefix("incompatible"), Health::Unhealthy, true),
    rule(Pattern::Contains("error"), Health::Unhealthy, true),
    rule(Pattern::Prefix("configuring"), Health::Healthy, false),
];

/// Canonical display form of a raw status: `"shutting-down"` -> `"Shutting Down"`.
pub fn canonical_status(raw: &str) -> String {
    human_case(raw)
}

fn match_key(raw: &str) -> String {
    words(raw)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `(health, ready)` for a raw status, or `None` when no rule matches.
pub fn classify(raw: &str) -> Option<(Health, bool)> {
    let key = match_key(raw);
    RULES
        .iter()
        .find(|r| r.pattern.matches(&key))
        .map(|r| (r.health, r.ready))
}

/// Builds a verdict from a free-form status string.
///
/// The canonical form of `raw` becomes the status; the first non-empty
/// reason becomes the message. Unmatched strings keep their canonical status
/// with `Unknown` health.
pub fn health_from_status_name(raw: &str, reasons: &[&str]) -> HealthStatus {
    if raw.trim().is_empty() {
        return HealthStatus::default();
    }

    let (health, ready) = classify(raw).unwrap_or((Health::Unknown, false));
    HealthStatus {
        ready,
        health,
        status: StatusCode::new(canonical_status(raw)),
        message: reasons
            .iter()
            .map(|r| r.trim())
            .find(|r| !r.is_empty())
            .unwrap_or_default()
            .to_string(),
        last_updated: None,
    }
}
