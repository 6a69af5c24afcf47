// ── Core Data Types ──────────────────────────────────────────────────────────
// Pure struct/enum definitions with no logic, mirroring the atoms-layer
// convention of keeping data shapes free of I/O and side effects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel value stored for a skipped check-in answer.
pub const SKIPPED: &str = "SKIPPED";

/// A structured value extracted from an utterance (task id, priority, date, …).
/// Entity keys are enumerated per-intent in SPEC_FULL.md §3.
pub type EntityMap = HashMap<String, serde_json::Value>;

pub trait EntityMapExt {
    fn get_str(&self, key: &str) -> Option<&str>;
}

impl EntityMapExt for EntityMap {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

/// Opaque attachment for provider-specific UI state (e.g. a Discord View)
/// that the core does not interpret.
pub type OpaqueView = serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub fields: Vec<RichField>,
    pub footer: Option<String>,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// The uniform result of any turn through the interaction manager.
///
/// Invariant: `completed = false` implies the user is either in a flow or the
/// response is a targeted prompt expecting the user's next message;
/// `completed = true` means a full turn ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResponse {
    pub message: String,
    pub completed: bool,
    pub rich_data: Option<RichPayload>,
    pub suggestions: Option<Vec<String>>,
    pub view: Option<OpaqueView>,
}

impl InteractionResponse {
    pub fn text(message: impl Into<String>, completed: bool) -> Self {
        Self {
            message: message.into(),
            completed,
            rich_data: None,
            suggestions: None,
            view: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        debug_assert!(suggestions.is_empty() || (2..=5).contains(&suggestions.len()));
        if !suggestions.is_empty() {
            self.suggestions = Some(suggestions);
        }
        self
    }

    pub fn with_rich_data(mut self, rich: RichPayload) -> Self {
        self.rich_data = Some(rich);
        self
    }
}

/// The outcome of parsing an inbound utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub intent: String,
    pub entities: EntityMap,
    pub confidence: f64,
    pub original_message: String,
}

impl ParsedCommand {
    pub fn unknown(original_message: impl Into<String>) -> Self {
        Self {
            intent: "unknown".to_string(),
            entities: EntityMap::new(),
            confidence: 0.0,
            original_message: original_message.into(),
        }
    }
}

/// How a `ParsedCommand` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMethod {
    RuleBased,
    AiCommand,
    AiCommandClarified,
}

#[derive(Debug, Clone)]
pub struct ParsingResult {
    pub parsed_command: ParsedCommand,
    pub confidence: f64,
    pub method: ParseMethod,
}

/// A single entry in the authoritative slash/bang command table.
/// The slash map and bang map both derive from this list (§8.1 invariant:
/// they are bijections over the same set of command names).
#[derive(Debug, Clone)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub mapped_message: &'static str,
    pub description: &'static str,
    pub is_flow: bool,
}

/// The canonical command table (SPEC_FULL.md §6).
pub const COMMAND_TABLE: &[CommandDefinition] = &[
    CommandDefinition { name: "start", mapped_message: "start", description: "Get started", is_flow: false },
    CommandDefinition { name: "tasks", mapped_message: "show my tasks", description: "Show your tasks", is_flow: false },
    CommandDefinition { name: "profile", mapped_message: "show profile", description: "Show your profile", is_flow: false },
    CommandDefinition { name: "schedule", mapped_message: "show schedule", description: "Show your schedule", is_flow: false },
    CommandDefinition { name: "messages", mapped_message: "show messages", description: "Show recent messages", is_flow: false },
    CommandDefinition { name: "analytics", mapped_message: "show analytics", description: "Show your analytics", is_flow: false },
    CommandDefinition { name: "status", mapped_message: "status", description: "Show bot status", is_flow: false },
    CommandDefinition { name: "help", mapped_message: "help", description: "Show help", is_flow: false },
    CommandDefinition { name: "checkin", mapped_message: "start checkin", description: "Start a check-in", is_flow: true },
    CommandDefinition { name: "restart", mapped_message: "restart checkin", description: "Restart a stuck check-in", is_flow: true },
    CommandDefinition { name: "clear", mapped_message: "clear flows", description: "Clear any stuck flow", is_flow: true },
    CommandDefinition { name: "cancel", mapped_message: "/cancel", description: "Cancel the active flow", is_flow: false },
];

pub fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_TABLE.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Slash map and bang map, both derived from `COMMAND_TABLE` (§8.1 invariant).
pub fn slash_command_names() -> Vec<&'static str> {
    COMMAND_TABLE.iter().map(|c| c.name).collect()
}

pub fn bang_command_names() -> Vec<&'static str> {
    COMMAND_TABLE.iter().map(|c| c.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_table_names_are_bijective_across_slash_and_bang() {
        let mut slash = slash_command_names();
        let mut bang = bang_command_names();
        slash.sort();
        bang.sort();
        assert_eq!(slash, bang);
    }

    #[test]
    fn find_command_is_case_insensitive() {
        assert!(find_command("CHECKIN").is_some());
        assert!(find_command("checkin").is_some());
        assert!(find_command("nonexistent").is_none());
    }

    #[test]
    fn interaction_response_suggestions_within_bounds() {
        let resp = InteractionResponse::text("hi", false).with_suggestions(vec!["a".into(), "b".into()]);
        let len = resp.suggestions.as_ref().map(|s| s.len()).unwrap_or(0);
        assert!(len == 0 || (2..=5).contains(&len));
    }
}
