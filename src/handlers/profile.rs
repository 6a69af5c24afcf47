// ── Profile Intent Handler ───────────────────────────────────────────────────

use async_trait::async_trait;
use std::sync::Arc;

use crate::handlers::traits::{ProfilePatch, ProfileStore};
use crate::handlers::Handler;
use crate::types::{EntityMapExt, InteractionResponse, ParsedCommand};

pub struct ProfileHandler {
    pub store: Arc<dyn ProfileStore>,
}

impl ProfileHandler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ProfileHandler {
    fn can_handle(&self, intent: &str) -> bool {
        matches!(intent, "show_profile" | "update_profile" | "profile_stats")
    }

    async fn handle(&self, user_id: &str, parsed: &ParsedCommand) -> InteractionResponse {
        match parsed.intent.as_str() {
            "show_profile" | "profile_stats" => {
                let profile = self.store.get(user_id).await;
                let name = profile.display_name.unwrap_or_else(|| "friend".to_string());
                InteractionResponse::text(
                    format!(
                        "Profile for {name}: check-ins are {}.",
                        if profile.checkins_enabled { "enabled" } else { "disabled" }
                    ),
                    true,
                )
            }
            "update_profile" => {
                let patch = ProfilePatch {
                    display_name: parsed.entities.get_str("title").map(|s| s.to_string()),
                    checkins_enabled: None,
                    enabled_checkin_keys: None,
                };
                let profile = self.store.update(user_id, patch).await;
                InteractionResponse::text(
                    format!("Updated your profile, {}.", profile.display_name.unwrap_or_else(|| "friend".into())),
                    true,
                )
            }
            _ => InteractionResponse::text("I'm not sure how to help with that profile request.", true),
        }
    }

    fn help(&self) -> &'static str {
        "Profile commands: \"show profile\", \"update profile\"."
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["show profile"]
    }
}
