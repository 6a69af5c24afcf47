// ── Rule-based intent table ──────────────────────────────────────────────────
// A fixed ordered table of keyword/regex rules. First match within a rule's
// keyword set wins; entity presence bumps confidence from "keyword only"
// (~0.6) to "exact keyword + entities" (≥0.9).

use regex::Regex;
use std::sync::OnceLock;

use crate::parser::entities::{extract_schedule_period_entities, extract_update_task_entities};
use crate::types::{EntityMap, ParsedCommand};

struct Rule {
    intent: &'static str,
    keywords: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule { intent: "create_task", keywords: &["add task", "create task", "new task"] },
    Rule { intent: "list_tasks", keywords: &["show my tasks", "show tasks", "list tasks"] },
    Rule { intent: "task_stats", keywords: &["task stats", "task statistics"] },
    Rule { intent: "complete_task", keywords: &["complete task", "finish task", "done with"] },
    Rule { intent: "delete_task", keywords: &["delete task", "remove task"] },
    Rule { intent: "update_task", keywords: &["update task"] },
    Rule { intent: "start_checkin", keywords: &["start checkin", "start check-in", "begin checkin"] },
    Rule { intent: "checkin_history", keywords: &["checkin history", "check-in history"] },
    Rule { intent: "checkin_status", keywords: &["checkin status", "check-in status"] },
    Rule { intent: "show_profile", keywords: &["show profile", "my profile"] },
    Rule { intent: "update_profile", keywords: &["update profile", "edit profile"] },
    Rule { intent: "profile_stats", keywords: &["profile stats"] },
    Rule { intent: "show_schedule", keywords: &["show schedule", "my schedule"] },
    Rule { intent: "schedule_status", keywords: &["schedule status"] },
    Rule { intent: "edit_schedule_period", keywords: &["edit schedule period"] },
    Rule { intent: "show_analytics", keywords: &["show analytics", "my analytics"] },
    Rule { intent: "analytics_weekly", keywords: &["weekly analytics", "analytics this week"] },
    Rule { intent: "help", keywords: &["help"] },
    Rule { intent: "commands", keywords: &["commands", "what can you do"] },
    Rule { intent: "examples", keywords: &["examples", "show examples"] },
    Rule { intent: "status", keywords: &["status"] },
];

fn word_boundary_contains(haystack: &str, needle: &str) -> bool {
    haystack.contains(needle)
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Rule-based classification. Returns `None` if nothing matched (caller
/// should fall back to an `unknown` ParsedCommand at confidence 0).
pub fn classify(message: &str) -> Option<(ParsedCommand, f64)> {
    let lower = message.to_lowercase();

    for rule in RULES {
        for kw in rule.keywords {
            if word_boundary_contains(&lower, kw) {
                let (entities, has_entities) = extract_entities_for(rule.intent, message);
                let confidence = if has_entities { 0.9 } else { 0.6 };
                return Some((
                    ParsedCommand {
                        intent: rule.intent.to_string(),
                        entities,
                        confidence,
                        original_message: message.to_string(),
                    },
                    confidence,
                ));
            }
        }
    }

    fuzzy_complete_fallback(message)
}

/// Catches phrasings like "complete per davey" that name no literal task id
/// and miss every `complete_task` keyword. The remainder after "complete "
/// is handed to the store as a fuzzy `task_identifier`
/// (SPEC_FULL.md §8.3 scenario 2).
fn fuzzy_complete_fallback(message: &str) -> Option<(ParsedCommand, f64)> {
    let trimmed = message.trim();
    let trimmed_lower = trimmed.to_lowercase();
    if trimmed_lower.len() != trimmed.len() {
        // Non-ASCII input: the byte-offset shortcut below doesn't hold.
        return None;
    }
    let rest = trimmed_lower.strip_prefix("complete ")?;
    let identifier = trimmed[trimmed.len() - rest.len()..].trim();
    if identifier.is_empty() {
        return None;
    }

    let mut entities = EntityMap::new();
    entities.insert("task_identifier".into(), identifier.to_string().into());
    let confidence = 0.9;
    Some((
        ParsedCommand {
            intent: "complete_task".to_string(),
            entities,
            confidence,
            original_message: message.to_string(),
        },
        confidence,
    ))
}

fn extract_entities_for(intent: &str, message: &str) -> (EntityMap, bool) {
    match intent {
        "update_task" => {
            let entities = extract_update_task_entities(message);
            let has = entities.contains_key("priority")
                || entities.contains_key("due_date")
                || entities.contains_key("title");
            (entities, has)
        }
        "edit_schedule_period" => match extract_schedule_period_entities(message) {
            Some(entities) => (entities, true),
            None => (EntityMap::new(), false),
        },
        "complete_task" | "delete_task" => {
            let mut entities = EntityMap::new();
            if let Some(m) = digits_re().find(message) {
                entities.insert("task_identifier".into(), m.as_str().to_string().into());
                (entities, true)
            } else {
                (entities, false)
            }
        }
        _ => (EntityMap::new(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityMapExt;

    #[test]
    fn fuzzy_complete_phrase_without_keyword_or_digit_classifies_as_complete_task() {
        let (parsed, confidence) = classify("complete per davey").expect("should fall back to fuzzy completion");
        assert_eq!(parsed.intent, "complete_task");
        assert_eq!(parsed.entities.get_str("task_identifier"), Some("per davey"));
        assert!(confidence >= 0.9);
    }

    #[test]
    fn literal_complete_task_keyword_still_wins_over_the_fallback() {
        let (parsed, _) = classify("complete task 1").expect("keyword rule should match");
        assert_eq!(parsed.entities.get_str("task_identifier"), Some("1"));
    }

    #[test]
    fn bare_complete_with_no_remainder_does_not_classify() {
        assert!(classify("complete").is_none());
        assert!(classify("complete ").is_none());
    }

    #[test]
    fn unrelated_message_does_not_trigger_fuzzy_completion() {
        assert!(classify("this task is now complete").is_none());
    }
}
