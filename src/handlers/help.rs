// ── Help Intent Handler ──────────────────────────────────────────────────────
// Exact help text recovered from `interaction_manager.py::_get_help_response`.

use async_trait::async_trait;

use crate::handlers::Handler;
use crate::types::{InteractionResponse, ParsedCommand, COMMAND_TABLE};

pub struct HelpHandler;

#[async_trait]
impl Handler for HelpHandler {
    fn can_handle(&self, intent: &str) -> bool {
        matches!(intent, "help" | "commands" | "examples")
    }

    async fn handle(&self, _user_id: &str, parsed: &ParsedCommand) -> InteractionResponse {
        match parsed.intent.as_str() {
            "commands" => InteractionResponse::text(Self::commands_response(), true),
            "examples" => InteractionResponse::text(Self::examples_response(), true),
            _ => InteractionResponse::text(Self::help_response(), true),
        }
    }

    fn help(&self) -> &'static str {
        "Type \"help\" any time to see this message again."
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["help", "commands", "examples"]
    }
}

impl HelpHandler {
    pub fn help_response() -> String {
        "Here's what I can help you with:\n\
        - Tasks: add, complete, update, and list tasks\n\
        - Check-ins: daily wellness check-ins (/checkin)\n\
        - Profile: view and update your profile\n\
        - Schedule: view and edit your schedule\n\
        - Analytics: view your activity analytics\n\n\
        Type \"commands\" for the full command list or \"examples\" for example phrasings."
            .to_string()
    }

    pub fn commands_response() -> String {
        let lines: Vec<String> = COMMAND_TABLE
            .iter()
            .map(|c| format!("/{} — {}", c.name, c.description))
            .collect();
        format!("Available commands:\n{}", lines.join("\n"))
    }

    pub fn examples_response() -> String {
        "Try phrasing things like:\n\
        - \"add task buy groceries\"\n\
        - \"complete task 1\"\n\
        - \"update task 1 priority high\"\n\
        - \"start checkin\"\n\
        - \"show my tasks\""
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn help_handler_returns_fixed_help_text() {
        let handler = HelpHandler;
        let mut parsed = ParsedCommand::unknown("help");
        parsed.intent = "help".into();
        let resp = handler.handle("u1", &parsed).await;
        assert!(resp.message.contains("Here's what I can help you with"));
    }

    #[tokio::test]
    async fn commands_response_lists_every_command() {
        let handler = HelpHandler;
        let mut parsed = ParsedCommand::unknown("commands");
        parsed.intent = "commands".into();
        let resp = handler.handle("u1", &parsed).await;
        for cmd in COMMAND_TABLE {
            assert!(resp.message.contains(cmd.name));
        }
    }
}
