// ── Runtime Configuration ───────────────────────────────────────────────────
// Environment-variable driven. No config file, no required CLI flags — the
// process runs until signaled (see SPEC_FULL.md §6).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub discord_token: Option<String>,
    pub application_id: Option<String>,
    pub webhook_port: u16,
    pub auto_tunnel: bool,
    pub checkin_inactivity_minutes: i64,
    pub ai_max_response_len: usize,
    pub data_root: PathBuf,
    pub min_command_confidence: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            discord_token: None,
            application_id: None,
            webhook_port: 8585,
            auto_tunnel: false,
            checkin_inactivity_minutes: 30,
            ai_max_response_len: 400,
            data_root: PathBuf::from("./data"),
            min_command_confidence: 0.3,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            discord_token: std::env::var("PAWBOT_DISCORD_TOKEN").ok(),
            application_id: std::env::var("PAWBOT_APPLICATION_ID").ok(),
            webhook_port: std::env::var("PAWBOT_WEBHOOK_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.webhook_port),
            auto_tunnel: std::env::var("PAWBOT_AUTO_TUNNEL")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.auto_tunnel),
            checkin_inactivity_minutes: std::env::var("PAWBOT_CHECKIN_INACTIVITY_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.checkin_inactivity_minutes),
            ai_max_response_len: std::env::var("PAWBOT_AI_MAX_RESPONSE_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ai_max_response_len),
            data_root: std::env::var("PAWBOT_DATA_ROOT")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.data_root),
            min_command_confidence: std::env::var("PAWBOT_MIN_COMMAND_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_command_confidence),
        }
    }

    pub fn conversation_states_path(&self) -> PathBuf {
        self.data_root.join("conversation_states.json")
    }
}
