// ── Analytics Intent Handler ─────────────────────────────────────────────────

use async_trait::async_trait;
use std::sync::Arc;

use crate::handlers::traits::AnalyticsStore;
use crate::handlers::Handler;
use crate::types::{InteractionResponse, ParsedCommand};

pub struct AnalyticsHandler {
    pub store: Arc<dyn AnalyticsStore>,
}

impl AnalyticsHandler {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for AnalyticsHandler {
    fn can_handle(&self, intent: &str) -> bool {
        matches!(intent, "show_analytics" | "analytics_weekly")
    }

    async fn handle(&self, user_id: &str, parsed: &ParsedCommand) -> InteractionResponse {
        let period = if parsed.intent == "analytics_weekly" { "week" } else { "recent" };
        let summary = self.store.summary(user_id, period).await;
        let mut lines = vec![summary.headline];
        lines.extend(summary.details);
        InteractionResponse::text(lines.join("\n"), true)
    }

    fn help(&self) -> &'static str {
        "Analytics commands: \"show analytics\", \"weekly analytics\"."
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["show analytics"]
    }
}
