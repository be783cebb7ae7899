//! Small formatting and parsing helpers shared by the classifiers

use chrono::{DateTime, Duration, Utc};

/// Splits a status string into words on delimiters and case/digit boundaries.
///
/// `"ShuttingDown"`, `"shutting-down"` and `"SHUTTING_DOWN"` all yield
/// `["shutting", "down"]` after lowercasing.
pub fn words(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && (c.is_uppercase() || c.is_ascii_digit()))
                || (prev.is_alphabetic() && c.is_ascii_digit())
                || (prev.is_ascii_digit() && c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.map(|n| n.is_lowercase()).unwrap_or(false));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `"update_rollback_complete"` -> `"Update Rollback Complete"`
pub fn human_case(value: &str) -> String {
    words(value)
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short human duration such as `45s`, `40m`, `2h5m` or `3d4h`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().abs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3600,
        (total % 3600) / 60,
        total % 60,
    );

    let (major, major_unit, minor, minor_unit) = if days > 0 {
        (days, "d", hours, "h")
    } else if hours > 0 {
        (hours, "h", minutes, "m")
    } else if minutes > 0 {
        (minutes, "m", seconds, "s")
    } else {
        return format!("{seconds}s");
    };

    if minor > 0 {
        format!("{major}{major_unit}{minor}{minor_unit}")
    } else {
        format!("{major}{major_unit}")
    }
}

/// Parses an RFC3339 timestamp into UTC.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Timestamp layout used in human-facing messages.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S %z").to_string()
}

/// Cuts `value` to at most `max` characters, marking the cut with `...`.
pub fn elide(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let kept: String = value.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_case() {
        assert_eq!(human_case("update_rollback_complete"), "Update Rollback Complete");
        assert_eq!(human_case("shutting-down"), "Shutting Down");
        assert_eq!(human_case("MemoryPressure"), "Memory Pressure");
        assert_eq!(human_case("IN_USE"), "In Use");
        assert_eq!(human_case("wakingup"), "Wakingup");
        assert_eq!(human_case(""), "");
    }

    #[test]
    fn test_human_case_is_idempotent() {
        for raw in ["ACTIVE_IMPAIRED", "createInProgress", "HTTPServerError", "gp3-v2"] {
            let once = human_case(raw);
            assert_eq!(human_case(&once), once, "{raw}");
        }
    }

    #[test]
    fn test_words_split_acronyms() {
        assert_eq!(words("HTTPServerError"), vec!["HTTP", "Server", "Error"]);
        assert_eq!(words("gp3"), vec!["gp", "3"]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::minutes(40)), "40m");
        assert_eq!(format_duration(Duration::minutes(125)), "2h5m");
        assert_eq!(format_duration(Duration::hours(76)), "3d4h");
        assert_eq!(format_duration(Duration::days(14)), "14d");
        assert_eq!(format_duration(Duration::minutes(-90)), "1h30m");
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("2024-01-02T03:04:05+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-02T01:04:05+00:00");
        assert!(parse_time("yesterday").is_none());
        assert_eq!(format_time(&t), "2024-01-02 01:04:05 +0000");
    }

    #[test]
    fn test_elide() {
        assert_eq!(elide("short", 10), "short");
        assert_eq!(elide("abcdefghijkl", 8), "abcde...");
        assert_eq!(elide(&"x".repeat(600), 500).chars().count(), 500);
    }
}
