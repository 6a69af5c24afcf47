// ── Command Parser (C2) ──────────────────────────────────────────────────────
// Classifies an inbound utterance into (intent, entities, confidence, method)
// and supplies suggestion lists. See SPEC_FULL.md §4.2.

pub mod entities;
pub mod rules;

use crate::types::{ParseMethod, ParsedCommand, ParsingResult};

pub struct UserParseContext {
    pub has_active_tasks: bool,
    pub checkins_enabled: bool,
    pub has_categories: bool,
}

impl Default for UserParseContext {
    fn default() -> Self {
        Self { has_active_tasks: false, checkins_enabled: false, has_categories: false }
    }
}

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an inbound message into a `ParsingResult`.
    pub fn parse(&self, message: &str, _user_id: &str) -> ParsingResult {
        match rules::classify(message) {
            Some((parsed, confidence)) => ParsingResult {
                parsed_command: parsed,
                confidence,
                method: ParseMethod::RuleBased,
            },
            None => ParsingResult {
                parsed_command: ParsedCommand::unknown(message),
                confidence: 0.0,
                method: ParseMethod::RuleBased,
            },
        }
    }

    /// Up to 5 follow-up utterances scored by current user state.
    pub fn suggestions(&self, _message: &str, ctx: &UserParseContext) -> Vec<String> {
        let mut out = Vec::new();
        if ctx.has_active_tasks {
            out.push("show my tasks".to_string());
        }
        if ctx.checkins_enabled {
            out.push("start checkin".to_string());
        }
        if ctx.has_categories {
            out.push("show analytics".to_string());
        }
        out.push("help".to_string());
        out.truncate(5);
        out
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keyword_with_low_confidence() {
        let parser = Parser::new();
        let result = parser.parse("show my tasks", "u1");
        assert_eq!(result.parsed_command.intent, "list_tasks");
        assert!(result.confidence >= 0.6);
    }

    #[test]
    fn parses_unknown_with_zero_confidence() {
        let parser = Parser::new();
        let result = parser.parse("xyzzy plugh", "u1");
        assert_eq!(result.parsed_command.intent, "unknown");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn parses_update_task_with_entities_at_high_confidence() {
        let parser = Parser::new();
        let result = parser.parse("update task 1 priority high", "u1");
        assert_eq!(result.parsed_command.intent, "update_task");
        assert!(result.confidence >= 0.9);
        assert_eq!(result.parsed_command.entities.get("priority").unwrap().as_str(), Some("high"));
    }

    #[test]
    fn suggestions_capped_at_five() {
        let parser = Parser::new();
        let ctx = UserParseContext { has_active_tasks: true, checkins_enabled: true, has_categories: true };
        let suggestions = parser.suggestions("anything", &ctx);
        assert!(suggestions.len() <= 5);
    }
}
