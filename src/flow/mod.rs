// ── Conversation Flow Manager (C5) ───────────────────────────────────────────
// Per-user persisted flow state, check-in flow progression, idle expiry, and
// in-flow command handling. See SPEC_FULL.md §4.5.

pub mod state;
pub mod weighting;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::checkin::{AnswerValue, Catalog};
use crate::handlers::traits::{CheckinLog, CheckinPayload, ProfileStore};
use crate::rng::{CoreRng, EntropyRng};
use crate::types::InteractionResponse;

use state::{checkin_state, task_reminder_state, Flow, FlowState, FlowStore};

/// Flow names that have a trivial single-turn handoff into the interaction
/// manager (SPEC_FULL.md §4.5.4). Injected as a trait object to avoid a
/// C4<->C5 type cycle (SPEC_FULL.md §9 design note: "starter registry").
#[async_trait]
pub trait FlowStarter: Send + Sync {
    async fn start(&self, user_id: &str, canonical_message: &str) -> InteractionResponse;
}

const IN_FLOW_COMMAND_WHITELIST: &[&str] = &["help", "clear", "tasks", "profile", "status", "analytics", "schedule", "messages"];

pub struct ConversationManager {
    store: Mutex<FlowStore>,
    catalog: Catalog,
    checkin_log: Arc<dyn CheckinLog>,
    profile_store: Arc<dyn ProfileStore>,
    starter: Arc<dyn FlowStarter>,
    rng: Mutex<Box<dyn CoreRng>>,
    inactivity_minutes: i64,
}

impl ConversationManager {
    pub fn new(
        state_path: impl Into<std::path::PathBuf>,
        catalog: Catalog,
        checkin_log: Arc<dyn CheckinLog>,
        profile_store: Arc<dyn ProfileStore>,
        starter: Arc<dyn FlowStarter>,
        inactivity_minutes: i64,
    ) -> Self {
        Self {
            store: Mutex::new(FlowStore::load(state_path)),
            catalog,
            checkin_log,
            profile_store,
            starter,
            rng: Mutex::new(Box::new(EntropyRng::new())),
            inactivity_minutes,
        }
    }

    #[cfg(test)]
    pub fn with_rng(mut self, rng: Box<dyn CoreRng>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn has_active_flow(&self, user_id: &str) -> bool {
        self.store.lock().has_flow(user_id)
    }

    /// Silently drops an active CHECKIN flow; no-op if none exists
    /// (SPEC_FULL.md §4.5.2). Called by C6 before sending an unrelated
    /// outbound message.
    pub fn expire_checkin_flow_due_to_unrelated_outbound(&self, user_id: &str) {
        let mut store = self.store.lock();
        if matches!(store.get(user_id), Some(s) if s.flow == Flow::Checkin) {
            store.remove(user_id);
        }
    }

    /// Silently drops whatever flow is active, regardless of its kind. Used
    /// by C4's in-flow escape-command path (§4.4 step 3), which must clear a
    /// `TaskReminder` flow just as readily as a `Checkin` one.
    pub fn clear_any_active_flow(&self, user_id: &str) {
        self.store.lock().remove(user_id);
    }

    pub async fn clear_stuck_flows(&self, user_id: &str) -> InteractionResponse {
        let had = self.store.lock().remove(user_id).is_some();
        if had {
            InteractionResponse::text("Cleared your stuck flow. You're all set.", true)
        } else {
            InteractionResponse::text("You don't have any stuck flows.", true)
        }
    }

    pub async fn cancel(&self, user_id: &str) -> InteractionResponse {
        let had = self.store.lock().remove(user_id).is_some();
        if had {
            InteractionResponse::text("Cancelled. Let me know if you need anything else.", true)
        } else {
            InteractionResponse::text("Nothing to cancel right now.", true)
        }
    }

    pub async fn restart_checkin(&self, user_id: &str) -> InteractionResponse {
        self.store.lock().remove(user_id);
        self.start_checkin(user_id).await
    }

    /// `start_<name>_flow` for tasks|profile|schedule|messages|analytics — a
    /// trivial handoff via the injected starter (SPEC_FULL.md §4.5.4).
    pub async fn start_other_flow(&self, user_id: &str, canonical_message: &str) -> InteractionResponse {
        self.starter.start(user_id, canonical_message).await
    }

    pub async fn start_checkin(&self, user_id: &str) -> InteractionResponse {
        let profile = self.profile_store.get(user_id).await;
        if !profile.checkins_enabled {
            self.store.lock().remove(user_id);
            return InteractionResponse::text(
                "Check-ins are not enabled for your account. Ask to enable them in your profile first.",
                true,
            );
        }

        if matches!(self.store.lock().get(user_id), Some(s) if s.flow == Flow::Checkin) {
            return InteractionResponse::text(
                "You already have a check-in in progress. Answer the current question, or say \"/cancel\" to stop.",
                false,
            );
        }

        let enabled: Vec<String> = if profile.enabled_checkin_keys.is_empty() {
            self.catalog.enabled_keys()
        } else {
            profile
                .enabled_checkin_keys
                .iter()
                .filter(|key| self.catalog.get(key.as_str()).is_some())
                .cloned()
                .collect()
        };
        let recent = self.checkin_log.recent(user_id, 5).await;
        let order = {
            let mut rng = self.rng.lock();
            let order = weighting::select_questions(&enabled, &recent, rng.as_mut());
            if order.is_empty() && !enabled.is_empty() {
                weighting::fallback_sample(&enabled, rng.as_mut())
            } else {
                order
            }
        };

        let Some(first_key) = order.first().cloned() else {
            return InteractionResponse::text("There are no check-in questions configured right now.", true);
        };

        let flow_state = FlowState {
            flow: Flow::Checkin,
            state: checkin_state::START,
            data: Default::default(),
            question_order: Some(order),
            current_question_index: Some(0),
            last_activity: Utc::now(),
        };
        self.store.lock().set(user_id, flow_state);

        let first_text = self.catalog.get(&first_key).map(|q| q.text.as_str()).unwrap_or("");
        InteractionResponse::text(
            format!("Let's do a quick check-in! {first_text}"),
            false,
        )
    }

    /// Entry point for messages while a flow is active. Returns `None` if
    /// the user has no active flow (caller should fall through to parsing).
    pub async fn handle_inbound_message(&self, user_id: &str, message: &str) -> Option<InteractionResponse> {
        let snapshot = self.store.lock().get(user_id).cloned();
        let state = snapshot?;

        if Utc::now().signed_duration_since(state.last_activity).num_minutes() > self.inactivity_minutes {
            self.store.lock().remove(user_id);
            return Some(InteractionResponse::text(
                "Your check-in expired due to inactivity. Say \"/checkin\" any time to start a new one.",
                true,
            ));
        }

        match state.flow {
            Flow::Checkin => Some(self.handle_checkin_message(user_id, message, state).await),
            Flow::TaskReminder => Some(self.handle_task_reminder_message(user_id, message, state).await),
        }
    }

    async fn handle_checkin_message(&self, user_id: &str, message: &str, state: FlowState) -> InteractionResponse {
        let trimmed = message.trim();

        if trimmed.eq_ignore_ascii_case("/cancel") {
            self.store.lock().remove(user_id);
            return InteractionResponse::text("Check-in cancelled.", true);
        }

        if trimmed.starts_with('/') || trimmed.starts_with('!') {
            let cmd = trimmed[1..].split_whitespace().next().unwrap_or("").to_lowercase();
            if IN_FLOW_COMMAND_WHITELIST.contains(&cmd.as_str()) {
                let reply = self.start_other_flow(user_id, &format!("show {cmd}")).await;
                return InteractionResponse::text(reply.message, false);
            }
            return InteractionResponse::text(
                format!("Unknown command: {trimmed}. Answer the current question or say \"/cancel\" to stop."),
                false,
            );
        }

        let order = state.question_order.clone().unwrap_or_default();
        let index = state.current_question_index.unwrap_or(0);
        let Some(current_key) = order.get(index).cloned() else {
            self.store.lock().remove(user_id);
            return InteractionResponse::text("Something went wrong with your check-in. Please start a new one.", true);
        };

        let engine = crate::checkin::Engine::new(&self.catalog);
        let outcome = engine.validate(&current_key, trimmed);

        if !outcome.ok {
            return InteractionResponse::text(
                outcome.error_message.unwrap_or_else(|| "I didn't understand that answer.".to_string()),
                false,
            );
        }
        let value = outcome.value.expect("ok implies value");

        let mut new_state = state.clone();
        new_state.data.insert(current_key.clone(), answer_to_json(&value));
        new_state.current_question_index = Some(index + 1);
        new_state.last_activity = Utc::now();

        if index + 1 >= order.len() {
            self.finalize_checkin(user_id, new_state).await
        } else {
            let next_key = order[index + 1].clone();
            let reply_text = {
                let mut rng = self.rng.lock();
                engine.build_next(&next_key, &current_key, &value, rng.as_mut())
            };
            self.store.lock().set(user_id, new_state);
            InteractionResponse::text(reply_text, false)
        }
    }

    async fn finalize_checkin(&self, user_id: &str, state: FlowState) -> InteractionResponse {
        let order = state.question_order.clone().unwrap_or_default();
        let payload = CheckinPayload {
            questions_asked: order,
            answers: state.data.clone(),
            completed_at: Utc::now(),
        };
        self.checkin_log.store(user_id, payload.clone()).await;
        self.store.lock().remove(user_id);

        let message = build_completion_message(&payload.answers);
        InteractionResponse::text(message, true)
    }

    async fn handle_task_reminder_message(&self, user_id: &str, message: &str, _state: FlowState) -> InteractionResponse {
        let trimmed = message.trim();
        if trimmed.eq_ignore_ascii_case("/cancel") {
            self.store.lock().remove(user_id);
            return InteractionResponse::text("Okay, no reminders set.", true);
        }

        let lower = trimmed.to_lowercase();
        let yes = ["yes", "y", "yeah", "yep", "sure"].contains(&lower.as_str());
        let no = ["no", "n", "nope"].contains(&lower.as_str());

        self.store.lock().remove(user_id);
        if yes {
            InteractionResponse::text("Got it — I'll remind you about this task.", true)
        } else if no {
            InteractionResponse::text("No reminders — got it.", true)
        } else {
            // Free text is treated as a reminder period and stored verbatim;
            // interpreting it is the task store's responsibility.
            InteractionResponse::text(format!("Okay, I'll remind you: {trimmed}."), true)
        }
    }

    /// Start the task-reminder follow-up after a task is created
    /// (SPEC_FULL.md §4.5, Open Question resolution).
    pub fn start_task_reminder_followup(&self, user_id: &str) -> InteractionResponse {
        let flow_state = FlowState {
            flow: Flow::TaskReminder,
            state: task_reminder_state::ASKED,
            data: Default::default(),
            question_order: None,
            current_question_index: None,
            last_activity: Utc::now(),
        };
        self.store.lock().set(user_id, flow_state);
        InteractionResponse::text(
            "Want me to remind you about this? (yes/no, or give a time like \"every day at 9am\")",
            false,
        )
    }
}

fn answer_to_json(value: &AnswerValue) -> serde_json::Value {
    match value {
        AnswerValue::Skipped => serde_json::Value::String(crate::types::SKIPPED.to_string()),
        AnswerValue::Int(v) => serde_json::Value::from(*v),
        AnswerValue::Float(v) => serde_json::Value::from(*v),
        AnswerValue::Bool(v) => serde_json::Value::from(*v),
        AnswerValue::Text(v) => serde_json::Value::String(v.clone()),
    }
}

/// Personalized completion message based on mood/energy/sleep thresholds
/// (SPEC_FULL.md §4.5, recovered from `_generate_completion_message`).
fn build_completion_message(answers: &std::collections::HashMap<String, serde_json::Value>) -> String {
    let mut lines = vec!["✅ Check-in complete! Thanks for sharing.".to_string()];

    if let Some(mood) = answers.get("mood").and_then(as_i64) {
        if mood <= 2 {
            lines.push("Sorry to hear today was rough — be gentle with yourself.".to_string());
        } else if mood >= 4 {
            lines.push("Glad today was a good one!".to_string());
        }
    }
    if let Some(energy) = answers.get("energy").and_then(as_i64) {
        if energy <= 2 {
            lines.push("Low energy noted — consider an early night.".to_string());
        }
    }
    let sleep = answers.get("sleep_hours").or_else(|| answers.get("sleep")).and_then(as_f64);
    if let Some(sleep) = sleep {
        if sleep < 6.0 {
            lines.push("Less than 6 hours of sleep — try to catch up tonight.".to_string());
        }
    }

    lines.join("\n")
}

fn as_i64(v: &serde_json::Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn as_f64(v: &serde_json::Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::{Question, QuestionCatalog, QuestionType, ResponseBank, Validation};
    use crate::handlers::traits::Profile;
    use crate::rng::SeededRng;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FakeCheckinLog;
    #[async_trait]
    impl CheckinLog for FakeCheckinLog {
        async fn recent(&self, _user_id: &str, _n: usize) -> Vec<CheckinPayload> {
            vec![]
        }
        async fn store(&self, _user_id: &str, _payload: CheckinPayload) {}
    }

    struct FakeProfileStore {
        checkins_enabled: bool,
        enabled_checkin_keys: Vec<String>,
    }
    #[async_trait]
    impl ProfileStore for FakeProfileStore {
        async fn get(&self, _user_id: &str) -> Profile {
            Profile {
                checkins_enabled: self.checkins_enabled,
                enabled_checkin_keys: self.enabled_checkin_keys.clone(),
                ..Default::default()
            }
        }
        async fn update(&self, _user_id: &str, _patch: crate::handlers::traits::ProfilePatch) -> Profile {
            Profile::default()
        }
    }

    struct NoopStarter;
    #[async_trait]
    impl FlowStarter for NoopStarter {
        async fn start(&self, _user_id: &str, canonical_message: &str) -> InteractionResponse {
            InteractionResponse::text(format!("handled: {canonical_message}"), true)
        }
    }

    fn make_catalog() -> Catalog {
        let questions = vec![
            Question { key: "mood".into(), kind: QuestionType::Scale1To5, text: "Mood 1-5?".into(), enabled_by_default: true, category: "mood".into(), validation: Validation::default(), ui_display_name: "Mood".into() },
            Question { key: "energy".into(), kind: QuestionType::Scale1To5, text: "Energy 1-5?".into(), enabled_by_default: true, category: "mood".into(), validation: Validation::default(), ui_display_name: "Energy".into() },
            Question { key: "daily_reflection".into(), kind: QuestionType::OptionalText, text: "Reflection?".into(), enabled_by_default: true, category: "reflection".into(), validation: Validation::default(), ui_display_name: "Reflection".into() },
        ];
        Catalog::from_parts(QuestionCatalog { questions }, ResponseBank { responses: HashMap::new(), transition_phrases: vec!["Next:".into()] }).unwrap()
    }

    /// A wider catalog than `make_catalog`, so tests can exercise a per-user
    /// subset that's strictly smaller than "everything enabled".
    fn make_wide_catalog() -> Catalog {
        let questions = vec![
            Question { key: "mood".into(), kind: QuestionType::Scale1To5, text: "Mood 1-5?".into(), enabled_by_default: true, category: "mood".into(), validation: Validation::default(), ui_display_name: "Mood".into() },
            Question { key: "energy".into(), kind: QuestionType::Scale1To5, text: "Energy 1-5?".into(), enabled_by_default: true, category: "mood".into(), validation: Validation::default(), ui_display_name: "Energy".into() },
            Question { key: "sleep_hours".into(), kind: QuestionType::Number, text: "Hours of sleep?".into(), enabled_by_default: true, category: "sleep".into(), validation: Validation::default(), ui_display_name: "Sleep".into() },
            Question { key: "gratitude".into(), kind: QuestionType::OptionalText, text: "Grateful for?".into(), enabled_by_default: true, category: "social".into(), validation: Validation::default(), ui_display_name: "Gratitude".into() },
            Question { key: "daily_reflection".into(), kind: QuestionType::OptionalText, text: "Reflection?".into(), enabled_by_default: true, category: "reflection".into(), validation: Validation::default(), ui_display_name: "Reflection".into() },
        ];
        Catalog::from_parts(QuestionCatalog { questions }, ResponseBank { responses: HashMap::new(), transition_phrases: vec!["Next:".into()] }).unwrap()
    }

    fn make_manager(checkins_enabled: bool) -> ConversationManager {
        make_manager_with_keys(checkins_enabled, vec![])
    }

    fn make_manager_with_keys(checkins_enabled: bool, enabled_checkin_keys: Vec<String>) -> ConversationManager {
        let dir = tempdir().unwrap();
        let catalog = if enabled_checkin_keys.is_empty() { make_catalog() } else { make_wide_catalog() };
        ConversationManager::new(
            dir.path().join("conversation_states.json"),
            catalog,
            Arc::new(FakeCheckinLog),
            Arc::new(FakeProfileStore { checkins_enabled, enabled_checkin_keys }),
            Arc::new(NoopStarter),
            30,
        )
        .with_rng(Box::new(SeededRng::new(1)))
    }

    #[tokio::test]
    async fn start_checkin_disabled_replies_with_fixed_message() {
        let manager = make_manager(false);
        let resp = manager.start_checkin("u1").await;
        assert!(resp.completed);
        assert!(resp.message.contains("not enabled"));
    }

    #[tokio::test]
    async fn start_checkin_twice_does_not_reset() {
        let manager = make_manager(true);
        let first = manager.start_checkin("u1").await;
        assert!(!first.completed);
        let second = manager.start_checkin("u1").await;
        assert!(second.message.contains("already have a check-in"));
    }

    #[tokio::test]
    async fn cancel_is_idempotent_with_no_active_flow() {
        let manager = make_manager(true);
        let first = manager.cancel("u1").await;
        let second = manager.cancel("u1").await;
        assert_eq!(first.message, "Nothing to cancel right now.");
        assert_eq!(second.message, "Nothing to cancel right now.");
    }

    #[tokio::test]
    async fn full_checkin_cycle_with_skip_completes() {
        let manager = make_manager(true);
        let start = manager.start_checkin("u1").await;
        assert!(!start.completed);

        // Answer three questions, one with "skip".
        let r1 = manager.handle_inbound_message("u1", "4").await.unwrap();
        assert!(!r1.completed);
        let r2 = manager.handle_inbound_message("u1", "skip").await.unwrap();
        let r3 = manager.handle_inbound_message("u1", "Feeling okay today").await.unwrap();
        assert!(r3.completed);
        assert!(r3.message.contains("Check-in complete"));
        assert!(!manager.has_active_flow("u1"));
    }

    #[tokio::test]
    async fn unrelated_outbound_expires_checkin_silently() {
        let manager = make_manager(true);
        manager.start_checkin("u1").await;
        assert!(manager.has_active_flow("u1"));
        manager.expire_checkin_flow_due_to_unrelated_outbound("u1");
        assert!(!manager.has_active_flow("u1"));
    }

    #[tokio::test]
    async fn start_checkin_honors_per_user_enabled_subset() {
        let manager = make_manager_with_keys(true, vec!["mood".into(), "energy".into(), "daily_reflection".into()]);
        manager.start_checkin("u1").await;
        let order = manager.store.lock().get("u1").unwrap().question_order.clone().unwrap();
        assert_eq!(order.len(), 3);
        for key in &order {
            assert!(["mood", "energy", "daily_reflection"].contains(&key.as_str()));
        }
    }

    #[tokio::test]
    async fn start_checkin_ignores_unknown_keys_in_per_user_override() {
        let manager = make_manager_with_keys(true, vec!["mood".into(), "not_a_real_question".into()]);
        manager.start_checkin("u1").await;
        let order = manager.store.lock().get("u1").unwrap().question_order.clone().unwrap();
        assert_eq!(order, vec!["mood".to_string()]);
    }

    #[tokio::test]
    async fn clear_any_active_flow_removes_task_reminder_flow_too() {
        let manager = make_manager(true);
        manager.start_task_reminder_followup("u1");
        assert!(manager.has_active_flow("u1"));
        manager.clear_any_active_flow("u1");
        assert!(!manager.has_active_flow("u1"));
    }

    #[tokio::test]
    async fn expire_is_noop_without_active_checkin() {
        let manager = make_manager(true);
        manager.expire_checkin_flow_due_to_unrelated_outbound("u1");
        assert!(!manager.has_active_flow("u1"));
    }
}
