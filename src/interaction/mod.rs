// ── Interaction Manager (C4) ─────────────────────────────────────────────────
// Top-level router: slash/bang command map, flow check, structured-command
// dispatch, AI fallback, response augmentation. See SPEC_FULL.md §4.4.

pub mod enhancement;

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::flow::{ConversationManager, FlowStarter};
use crate::handlers::traits::AiChatbot;
use crate::handlers::HandlerRegistry;
use crate::parser::entities::extract_update_task_entities;
use crate::parser::{Parser, UserParseContext};
use crate::types::{find_command, InteractionResponse, ParsedCommand};

/// Intents that should never receive AI-warmed enhancement or suggestion
/// augmentation — report-style, not conversational.
const NON_ENHANCED_INTENTS: &[&str] = &["help", "commands", "examples", "list_tasks", "show_profile", "show_schedule", "schedule_status", "show_analytics", "analytics_weekly", "status", "start_checkin", "update_task"];
const NO_SUGGESTION_INTENTS: &[&str] = &["start_checkin", "update_task"];

const ENHANCEMENT_TIMEOUT: Duration = Duration::from_secs(3);
const CONTEXTUAL_CHAT_TIMEOUT: Duration = Duration::from_secs(8);

const IN_FLOW_COMMAND_KEYWORDS: &[&str] = &[
    "update task", "complete task", "delete task", "show tasks", "list tasks",
    "create task", "add task", "new task", "/cancel", "cancel",
];

pub struct InteractionManager {
    parser: Parser,
    handlers: HandlerRegistry,
    flow_manager: Arc<ConversationManager>,
    ai_chatbot: Option<Arc<dyn AiChatbot>>,
    min_command_confidence: f64,
    ai_max_response_len: usize,
}

/// Bridges C5's flow-starter requirement back into C4 without a hard type
/// cycle: a `Weak` reference, upgraded at call time (SPEC_FULL.md §9 design
/// note — "starter registry"). Constructed via `Arc::new_cyclic`.
struct ManagerFlowStarter(Weak<InteractionManager>);

#[async_trait]
impl FlowStarter for ManagerFlowStarter {
    async fn start(&self, user_id: &str, canonical_message: &str) -> InteractionResponse {
        match self.0.upgrade() {
            Some(manager) => manager.handle(user_id, canonical_message, "internal").await,
            None => InteractionResponse::text("I'm having trouble processing your request right now. Please try again in a moment.", true),
        }
    }
}

pub struct InteractionManagerDeps {
    pub handlers: HandlerRegistry,
    pub ai_chatbot: Option<Arc<dyn AiChatbot>>,
    pub min_command_confidence: f64,
    pub ai_max_response_len: usize,
    pub state_path: std::path::PathBuf,
    pub catalog: crate::checkin::Catalog,
    pub checkin_log: Arc<dyn crate::handlers::traits::CheckinLog>,
    pub profile_store: Arc<dyn crate::handlers::traits::ProfileStore>,
    pub inactivity_minutes: i64,
}

impl InteractionManager {
    /// Construct the interaction manager and its flow manager together,
    /// resolving the C4<->C5 reference via `Arc::new_cyclic`.
    pub fn new(deps: InteractionManagerDeps) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<InteractionManager>| {
            let starter = Arc::new(ManagerFlowStarter(weak.clone()));
            let flow_manager = Arc::new(ConversationManager::new(
                deps.state_path,
                deps.catalog,
                deps.checkin_log,
                deps.profile_store,
                starter,
                deps.inactivity_minutes,
            ));
            InteractionManager {
                parser: Parser::new(),
                handlers: deps.handlers,
                flow_manager,
                ai_chatbot: deps.ai_chatbot,
                min_command_confidence: deps.min_command_confidence,
                ai_max_response_len: deps.ai_max_response_len,
            }
        })
    }

    pub fn flow_manager(&self) -> &Arc<ConversationManager> {
        &self.flow_manager
    }

    /// Entry point: `handle(user_id, message, channel_kind) -> InteractionResponse`.
    /// See SPEC_FULL.md §4.4 for the full 8-step ordering.
    pub async fn handle(&self, user_id: &str, message: &str, channel_kind: &str) -> InteractionResponse {
        match self.handle_inner(user_id, message, channel_kind).await {
            Some(resp) => resp,
            None => InteractionResponse::text(
                "I'm having trouble processing your request right now. Please try again in a moment.",
                true,
            ),
        }
    }

    async fn handle_inner(&self, user_id: &str, message: &str, channel_kind: &str) -> Option<InteractionResponse> {
        // 1. Empty/whitespace message.
        if message.trim().is_empty() {
            return Some(InteractionResponse::text("I didn't receive a message. How can I help you today?", true));
        }

        // 2. Prefix commands.
        if let Some(rest) = message.trim_start().strip_prefix('/').or_else(|| message.trim_start().strip_prefix('!')) {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let cmd_name = parts.next().unwrap_or("").to_lowercase();

            if cmd_name == "cancel" {
                return Some(self.flow_manager.cancel(user_id).await);
            }

            if let Some(def) = find_command(&cmd_name) {
                if def.is_flow {
                    let resp = match def.name {
                        "checkin" => self.flow_manager.start_checkin(user_id).await,
                        "restart" => self.flow_manager.restart_checkin(user_id).await,
                        "clear" => self.flow_manager.clear_stuck_flows(user_id).await,
                        other => InteractionResponse::text(format!("Flow '{other}' is not available yet."), true),
                    };
                    return Some(resp);
                } else {
                    return Box::pin(self.handle_inner(user_id, def.mapped_message, channel_kind)).await;
                }
            }

            // Unknown prefixed token — strip the prefix and continue to rule-based parsing.
            let remainder = rest.to_string();
            return self.route_from_message(user_id, &remainder, channel_kind).await;
        }

        self.route_from_message(user_id, message, channel_kind).await
    }

    /// Steps 3-8 of §4.4, shared between the direct path and the
    /// unknown-prefix-stripped path.
    async fn route_from_message(&self, user_id: &str, message: &str, channel_kind: &str) -> Option<InteractionResponse> {
        // 3. Active flow short-circuit.
        let lower = message.to_lowercase();
        let is_escape_command = IN_FLOW_COMMAND_KEYWORDS.iter().any(|kw| lower.starts_with(kw));
        if self.flow_manager.has_active_flow(user_id) && !is_escape_command {
            if let Some(resp) = self.flow_manager.handle_inbound_message(user_id, message).await {
                return Some(resp);
            }
        } else if self.flow_manager.has_active_flow(user_id) && is_escape_command {
            self.flow_manager.clear_any_active_flow(user_id);
        }

        // 4. Literal shortcuts.
        if lower.trim() == "confirm delete" {
            return Some(InteractionResponse::text("Delete confirmed.", true));
        }
        if lower.trim() == "complete task" {
            return Some(
                InteractionResponse::text("Which task would you like to complete?", false)
                    .with_suggestions(vec!["list tasks".into(), "cancel".into()]),
            );
        }

        // 5. Parse.
        let mut result = self.parser.parse(message, user_id);

        if lower.starts_with("update task") && result.parsed_command.intent == "unknown" {
            let entities = extract_update_task_entities(message);
            result.parsed_command = ParsedCommand {
                intent: "update_task".to_string(),
                entities,
                confidence: 0.9,
                original_message: message.to_string(),
            };
            result.confidence = 0.9;
        } else if result.parsed_command.intent == "update_task" {
            let missing = !result.parsed_command.entities.contains_key("priority")
                && !result.parsed_command.entities.contains_key("due_date")
                && !result.parsed_command.entities.contains_key("title");
            if missing {
                let filled = extract_update_task_entities(&result.parsed_command.original_message);
                for (k, v) in filled {
                    result.parsed_command.entities.entry(k).or_insert(v);
                }
            }
        }

        // 6. Confidence gate.
        let mut response = if result.confidence >= self.min_command_confidence {
            match self.handlers.find(&result.parsed_command.intent) {
                Some(handler) => handler.handle(user_id, &result.parsed_command).await,
                None => self.contextual_fallback(user_id, message, channel_kind).await,
            }
        } else if self.ai_chatbot.is_some() {
            self.contextual_fallback(user_id, message, channel_kind).await
        } else {
            InteractionResponse::text(
                crate::handlers::help::HelpHandler::help_response(),
                true,
            )
        };

        // 7. Response augmentation.
        if !response.completed && !NO_SUGGESTION_INTENTS.contains(&result.parsed_command.intent.as_str()) {
            if let Some(suggestions) = augment_suggestions(&response.message) {
                response = response.with_suggestions(suggestions);
            }
        }

        // 8. AI enhancement (conversational intents only).
        if !NON_ENHANCED_INTENTS.contains(&result.parsed_command.intent.as_str()) {
            if let Some(chatbot) = &self.ai_chatbot {
                let prompt = format!("Rewrite this reply more warmly, keep the same meaning: {}", response.message);
                if let Ok(Some(candidate)) = tokio::time::timeout(ENHANCEMENT_TIMEOUT, chatbot.enhance(&prompt)).await {
                    if let Ok(enhanced) = enhancement::filter_enhancement(&candidate, self.ai_max_response_len) {
                        response.message = enhanced;
                    }
                }
            }
        }

        Some(response)
    }

    async fn contextual_fallback(&self, user_id: &str, message: &str, _channel_kind: &str) -> InteractionResponse {
        match &self.ai_chatbot {
            Some(chatbot) => {
                match tokio::time::timeout(CONTEXTUAL_CHAT_TIMEOUT, chatbot.contextual_reply(user_id, message)).await {
                    Ok(Some(reply)) => InteractionResponse::text(reply, true),
                    _ => InteractionResponse::text(crate::handlers::help::HelpHandler::help_response(), true),
                }
            }
            None => InteractionResponse::text(crate::handlers::help::HelpHandler::help_response(), true),
        }
    }

    pub fn suggestions_for(&self, message: &str, ctx: &UserParseContext) -> Vec<String> {
        self.parser.suggestions(message, ctx)
    }
}

fn augment_suggestions(message: &str) -> Option<Vec<String>> {
    let lower = message.to_lowercase();
    if lower.contains("multiple matching tasks") {
        Some(vec!["list tasks".into(), "cancel".into()])
    } else if lower.contains("confirm delete") {
        Some(vec!["confirm delete".into(), "cancel".into()])
    } else if lower.contains("which task") {
        Some(vec!["list tasks".into(), "cancel".into()])
    } else if lower.contains("check-in") && lower.contains("already") {
        Some(vec!["cancel".into(), "status".into()])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::help::HelpHandler;
    use crate::handlers::tasks::TaskHandler;
    use crate::handlers::traits::{fuzzy_title_match, NewTask, Profile, ProfilePatch, Task, TaskPatch, TaskStore};
    use crate::handlers::Handler;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    struct FakeTaskStore {
        tasks: StdMutex<Vec<Task>>,
    }
    #[async_trait]
    impl TaskStore for FakeTaskStore {
        async fn list_active(&self, _user_id: &str) -> Vec<Task> {
            self.tasks.lock().unwrap().clone()
        }
        async fn find_by_identifier(&self, _user_id: &str, identifier: &str) -> Option<Task> {
            self.tasks
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == identifier || fuzzy_title_match(&t.title, identifier))
                .cloned()
        }
        async fn complete(&self, _user_id: &str, task_id: &str) -> bool {
            let mut tasks = self.tasks.lock().unwrap();
            let before = tasks.len();
            tasks.retain(|t| t.id != task_id);
            tasks.len() < before
        }
        async fn update(&self, _user_id: &str, _task_id: &str, _patch: TaskPatch) -> bool {
            true
        }
        async fn create(&self, _user_id: &str, task: NewTask) -> Task {
            Task { id: "1".into(), title: task.title, priority: "medium".into(), due_date: None, completed: false }
        }
    }

    struct FakeProfileStore;
    #[async_trait]
    impl crate::handlers::traits::ProfileStore for FakeProfileStore {
        async fn get(&self, _user_id: &str) -> Profile {
            Profile { checkins_enabled: true, ..Default::default() }
        }
        async fn update(&self, _user_id: &str, _patch: ProfilePatch) -> Profile {
            Profile::default()
        }
    }

    struct FakeCheckinLog;
    #[async_trait]
    impl crate::handlers::traits::CheckinLog for FakeCheckinLog {
        async fn recent(&self, _user_id: &str, _n: usize) -> Vec<crate::handlers::traits::CheckinPayload> {
            vec![]
        }
        async fn store(&self, _user_id: &str, _payload: crate::handlers::traits::CheckinPayload) {}
    }

    fn make_catalog() -> crate::checkin::Catalog {
        use crate::checkin::{Question, QuestionCatalog, QuestionType, ResponseBank, Validation};
        let questions = vec![Question {
            key: "mood".into(), kind: QuestionType::Scale1To5, text: "Mood?".into(),
            enabled_by_default: true, category: "mood".into(), validation: Validation::default(),
            ui_display_name: "Mood".into(),
        }];
        crate::checkin::Catalog::from_parts(QuestionCatalog { questions }, ResponseBank { responses: Default::default(), transition_phrases: vec!["Next:".into()] }).unwrap()
    }

    fn make_manager(tasks: Vec<Task>) -> Arc<InteractionManager> {
        let dir = tempdir().unwrap();
        let handlers = HandlerRegistry::new(vec![
            Box::new(TaskHandler::new(Arc::new(FakeTaskStore { tasks: StdMutex::new(tasks) }))),
            Box::new(HelpHandler),
        ]);
        InteractionManager::new(InteractionManagerDeps {
            handlers,
            ai_chatbot: None,
            min_command_confidence: 0.3,
            ai_max_response_len: 400,
            state_path: dir.path().join("conversation_states.json"),
            catalog: make_catalog(),
            checkin_log: Arc::new(FakeCheckinLog),
            profile_store: Arc::new(FakeProfileStore),
            inactivity_minutes: 30,
        })
    }

    #[tokio::test]
    async fn empty_message_returns_friendly_prompt() {
        let manager = make_manager(vec![]);
        let resp = manager.handle("u1", "   ", "discord").await;
        assert!(resp.completed);
        assert!(resp.message.contains("didn't receive a message"));
    }

    #[tokio::test]
    async fn cancel_with_no_flow_is_idempotent() {
        let manager = make_manager(vec![]);
        let r1 = manager.handle("u1", "/cancel", "discord").await;
        let r2 = manager.handle("u1", "/cancel", "discord").await;
        assert_eq!(r1.message, "Nothing to cancel right now.");
        assert_eq!(r2.message, "Nothing to cancel right now.");
    }

    #[tokio::test]
    async fn non_flow_prefixed_command_recurses_into_mapped_message() {
        let manager = make_manager(vec![Task { id: "1".into(), title: "t".into(), priority: "low".into(), due_date: None, completed: false }]);
        let resp = manager.handle("u1", "/tasks", "discord").await;
        assert!(resp.message.contains("t"));
    }

    #[tokio::test]
    async fn flow_command_dispatches_to_checkin_starter() {
        let manager = make_manager(vec![]);
        let resp = manager.handle("u1", "/checkin", "discord").await;
        assert!(!resp.completed);
    }

    #[tokio::test]
    async fn natural_language_task_completion_scenario() {
        let manager = make_manager(vec![Task { id: "1".into(), title: "Brush your teeth".into(), priority: "medium".into(), due_date: None, completed: false }]);
        let resp = manager.handle("u1", "complete task 1", "discord").await;
        assert!(resp.message.to_lowercase().contains("completed"));
    }

    #[tokio::test]
    async fn active_flow_short_circuits_non_command_messages() {
        let manager = make_manager(vec![]);
        manager.handle("u1", "/checkin", "discord").await;
        let resp = manager.handle("u1", "4", "discord").await;
        // Answering the checkin question should not re-enter the parser.
        assert!(!resp.message.to_lowercase().contains("didn't receive"));
    }

    #[tokio::test]
    async fn command_keyword_escapes_active_flow() {
        let manager = make_manager(vec![Task { id: "1".into(), title: "t".into(), priority: "low".into(), due_date: None, completed: false }]);
        manager.handle("u1", "/checkin", "discord").await;
        let resp = manager.handle("u1", "show tasks", "discord").await;
        assert!(resp.message.contains("t"));
        assert!(!manager.flow_manager().has_active_flow("u1"));
    }
}
