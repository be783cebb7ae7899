//! Output formatting utilities

use colored::{ColoredString, Colorize};
use health_lib::{Health, HealthStatus};
use serde_json::json;

/// Health label colored by severity
pub fn color_health(health: Health) -> ColoredString {
    let label = health.as_str();
    match health {
        Health::Healthy => label.green(),
        Health::Warning => label.yellow(),
        Health::Unhealthy => label.red().bold(),
        Health::Unknown => label.dimmed(),
    }
}

/// Print a verdict as text or pretty JSON
pub fn print_verdict(verdict: &HealthStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(verdict)?);
        return Ok(());
    }

    let ready = if verdict.ready { "ready".green() } else { "not ready".yellow() };
    println!(
        "{} ({}): {} [{}]",
        verdict.status.as_str().bold(),
        color_health(verdict.health),
        verdict.message,
        ready
    );
    if let Some(at) = verdict.last_updated {
        println!("{} {}", "last updated".dimmed(), at.to_rfc3339());
    }
    Ok(())
}

pub fn print_supported_types(types: &[String], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(types)?);
    } else {
        for t in types {
            println!("{t}");
        }
    }
    Ok(())
}

/// Print an error message; as `{"error": ...}` on stdout in JSON mode
pub fn print_error(message: &str, json: bool) {
    if json {
        println!("{}", json!({ "error": message }));
    } else {
        eprintln!("{} {}", "✗".red().bold(), message);
    }
}
