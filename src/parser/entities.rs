// ── Entity extraction regexes ────────────────────────────────────────────────
// Authoritative patterns recovered from the original source's coercion blocks
// (SPEC_FULL.md §4.2). Compiled once via `once_cell`-free lazy statics using
// `std::sync::OnceLock`, matching the teacher's preference for avoiding extra
// lazy-static crates where the stdlib now suffices.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::EntityMap;

fn priority_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)update\s+task\s+(\S+)\s+priority\s+(high|medium|low|urgent|critical)").unwrap()
    })
}

fn due_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)update\s+task\s+(\S+)\s+due(?:\s+date)?\s+(.+)").unwrap())
}

fn title_quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)update\s+task\s+(\S+)\s+title\s+"([^"]+)""#).unwrap())
}

fn rename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rename\s+task\s+(\S+)\s+to\s+(.+)").unwrap())
}

fn schedule_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)edit\s+schedule\s+period\s+(\S+)\s+(tasks|check-ins|messages)").unwrap()
    })
}

/// Extract `update_task` entities (identifier + whichever patch fields match)
/// from free text. Returns an empty map if nothing matched.
pub fn extract_update_task_entities(message: &str) -> EntityMap {
    let mut out = EntityMap::new();

    if let Some(caps) = priority_re().captures(message) {
        out.insert("task_identifier".into(), caps[1].to_string().into());
        out.insert("priority".into(), caps[2].to_lowercase().into());
    }
    if let Some(caps) = due_date_re().captures(message) {
        out.entry("task_identifier".into()).or_insert_with(|| caps[1].to_string().into());
        out.insert("due_date".into(), caps[2].trim().to_string().into());
    }
    if let Some(caps) = title_quoted_re().captures(message) {
        out.entry("task_identifier".into()).or_insert_with(|| caps[1].to_string().into());
        out.insert("title".into(), caps[2].to_string().into());
    } else if let Some(caps) = rename_re().captures(message) {
        out.entry("task_identifier".into()).or_insert_with(|| caps[1].to_string().into());
        out.insert("title".into(), caps[2].trim().to_string().into());
    }

    out
}

/// Extract `{period_name, category}` for `edit_schedule_period`.
pub fn extract_schedule_period_entities(message: &str) -> Option<EntityMap> {
    let caps = schedule_period_re().captures(message)?;
    let mut out = EntityMap::new();
    out.insert("period_name".into(), caps[1].to_string().into());
    out.insert("category".into(), caps[2].to_lowercase().into());
    Some(out)
}
