// ── Schedule Intent Handler ──────────────────────────────────────────────────

use async_trait::async_trait;
use std::sync::Arc;

use crate::handlers::traits::{ScheduleStore, TimeRange};
use crate::handlers::Handler;
use crate::types::{EntityMapExt, InteractionResponse, ParsedCommand};

pub struct ScheduleHandler {
    pub store: Arc<dyn ScheduleStore>,
}

impl ScheduleHandler {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ScheduleHandler {
    fn can_handle(&self, intent: &str) -> bool {
        matches!(intent, "show_schedule" | "schedule_status" | "edit_schedule_period")
    }

    async fn handle(&self, user_id: &str, parsed: &ParsedCommand) -> InteractionResponse {
        match parsed.intent.as_str() {
            "show_schedule" | "schedule_status" => {
                let schedule = self.store.get(user_id).await;
                if schedule.periods.is_empty() {
                    InteractionResponse::text("Your schedule has no periods configured.", true)
                } else {
                    let lines: Vec<String> = schedule
                        .periods
                        .iter()
                        .map(|p| format!("- {} ({}): {}–{}", p.name, p.category, p.start, p.end))
                        .collect();
                    InteractionResponse::text(format!("Your schedule:\n{}", lines.join("\n")), true)
                }
            }
            "edit_schedule_period" => {
                let Some(period_name) = parsed.entities.get_str("period_name") else {
                    return InteractionResponse::text("Which schedule period would you like to edit?", false);
                };
                let category = parsed.entities.get_str("category").unwrap_or("tasks");
                let ok = self
                    .store
                    .edit_period(user_id, period_name, category, TimeRange { start: String::new(), end: String::new() })
                    .await;
                if ok {
                    InteractionResponse::text(format!("Updated schedule period \"{period_name}\"."), true)
                } else {
                    InteractionResponse::text(format!("I couldn't find a schedule period named \"{period_name}\"."), true)
                }
            }
            _ => InteractionResponse::text("I'm not sure how to help with that schedule request.", true),
        }
    }

    fn help(&self) -> &'static str {
        "Schedule commands: \"show schedule\", \"edit schedule period <name> <tasks|check-ins|messages>\"."
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["show schedule", "edit schedule period morning tasks"]
    }
}
