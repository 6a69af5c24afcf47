// ── End-to-End Scenarios ──────────────────────────────────────────────────────
// Drives the real parser + interaction manager + flow manager together,
// matching the concrete scenarios in spec.md §8.3. Scenario 6 (DNS fallback)
// is covered at the unit level in src/channel/health.rs, since it needs no
// live bot to exercise.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pawbot_core::handlers::analytics::AnalyticsHandler;
use pawbot_core::handlers::help::HelpHandler;
use pawbot_core::handlers::profile::ProfileHandler;
use pawbot_core::handlers::schedule::ScheduleHandler;
use pawbot_core::handlers::tasks::TaskHandler;
use pawbot_core::handlers::traits::{
    fuzzy_title_match, CheckinLog, CheckinPayload, NewTask, Profile, ProfilePatch, ProfileStore, Task, TaskPatch,
    TaskStore,
};
use pawbot_core::handlers::HandlerRegistry;
use pawbot_core::{checkin::Catalog, InteractionManager, InteractionManagerDeps};
use tokio::sync::Mutex;

struct InMemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_active(&self, _user_id: &str) -> Vec<Task> {
        self.tasks.lock().await.iter().filter(|t| !t.completed).cloned().collect()
    }

    async fn find_by_identifier(&self, _user_id: &str, identifier: &str) -> Option<Task> {
        self.tasks
            .lock()
            .await
            .iter()
            .find(|t| !t.completed && (t.id == identifier || fuzzy_title_match(&t.title, identifier)))
            .cloned()
    }

    async fn complete(&self, _user_id: &str, task_id: &str) -> bool {
        let mut tasks = self.tasks.lock().await;
        match tasks.iter_mut().find(|t| t.id == task_id) {
            Some(t) => {
                t.completed = true;
                true
            }
            None => false,
        }
    }

    async fn update(&self, _user_id: &str, task_id: &str, patch: TaskPatch) -> bool {
        let mut tasks = self.tasks.lock().await;
        let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else { return false };
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        true
    }

    async fn create(&self, _user_id: &str, new_task: NewTask) -> Task {
        let mut tasks = self.tasks.lock().await;
        let task = Task {
            id: (tasks.len() + 1).to_string(),
            title: new_task.title,
            priority: new_task.priority.unwrap_or_else(|| "medium".to_string()),
            due_date: new_task.due_date,
            completed: false,
        };
        tasks.push(task.clone());
        task
    }
}

struct InMemoryProfileStore {
    checkins_enabled: bool,
    enabled_checkin_keys: Vec<String>,
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, _user_id: &str) -> Profile {
        Profile {
            checkins_enabled: self.checkins_enabled,
            enabled_checkin_keys: self.enabled_checkin_keys.clone(),
            ..Default::default()
        }
    }

    async fn update(&self, _user_id: &str, _patch: ProfilePatch) -> Profile {
        Profile {
            checkins_enabled: self.checkins_enabled,
            enabled_checkin_keys: self.enabled_checkin_keys.clone(),
            ..Default::default()
        }
    }
}

struct NullCheckinLog;

#[async_trait]
impl CheckinLog for NullCheckinLog {
    async fn recent(&self, _user_id: &str, _n: usize) -> Vec<CheckinPayload> {
        vec![]
    }

    async fn store(&self, _user_id: &str, _payload: CheckinPayload) {}
}

fn full_checkin_catalog() -> Catalog {
    Catalog::load_from_dir(Path::new("resources/default_checkin")).expect("bundled check-in catalog must load")
}

fn build_manager(tasks: Vec<Task>, checkins_enabled: bool) -> (Arc<InteractionManager>, Arc<InMemoryTaskStore>) {
    build_manager_with_checkin_keys(tasks, checkins_enabled, vec![])
}

fn build_manager_with_checkin_keys(
    tasks: Vec<Task>,
    checkins_enabled: bool,
    enabled_checkin_keys: Vec<String>,
) -> (Arc<InteractionManager>, Arc<InMemoryTaskStore>) {
    let tmp = tempfile::tempdir().unwrap();
    let task_store = Arc::new(InMemoryTaskStore { tasks: Mutex::new(tasks) });
    let profile_store = Arc::new(InMemoryProfileStore { checkins_enabled, enabled_checkin_keys });

    let handlers = HandlerRegistry::new(vec![
        Box::new(TaskHandler::new(task_store.clone())),
        Box::new(ProfileHandler::new(profile_store.clone())),
        Box::new(ScheduleHandler::new(Arc::new(NullScheduleStore))),
        Box::new(AnalyticsHandler::new(Arc::new(NullAnalyticsStore))),
        Box::new(HelpHandler),
    ]);

    let manager = InteractionManager::new(InteractionManagerDeps {
        handlers,
        ai_chatbot: None,
        min_command_confidence: 0.3,
        ai_max_response_len: 400,
        state_path: tmp.path().join("conversation_states.json"),
        catalog: full_checkin_catalog(),
        checkin_log: Arc::new(NullCheckinLog),
        profile_store: profile_store.clone(),
        inactivity_minutes: 30,
    });

    // Keep the tempdir alive for the duration of the manager's lifetime by
    // leaking it; these are short-lived test processes.
    std::mem::forget(tmp);

    (manager, task_store)
}

struct NullScheduleStore;

#[async_trait]
impl pawbot_core::handlers::traits::ScheduleStore for NullScheduleStore {
    async fn get(&self, _user_id: &str) -> pawbot_core::handlers::traits::Schedule {
        Default::default()
    }
    async fn edit_period(&self, _user_id: &str, _period_name: &str, _category: &str, _range: pawbot_core::handlers::traits::TimeRange) -> bool {
        true
    }
}

struct NullAnalyticsStore;

#[async_trait]
impl pawbot_core::handlers::traits::AnalyticsStore for NullAnalyticsStore {
    async fn summary(&self, _user_id: &str, period: &str) -> pawbot_core::handlers::traits::AnalyticsSummary {
        pawbot_core::handlers::traits::AnalyticsSummary { period: period.to_string(), headline: "No data.".into(), details: vec![] }
    }
}

#[tokio::test]
async fn natural_language_task_completion() {
    let (manager, tasks) = build_manager(
        vec![Task { id: "1".into(), title: "Brush your teeth".into(), priority: "medium".into(), due_date: None, completed: false }],
        false,
    );

    let response = manager.handle("u1", "complete task 1", "test").await;
    assert!(response.message.to_lowercase().contains("completed"));
    assert!(tasks.list_active("u1").await.is_empty());
}

#[tokio::test]
async fn fuzzy_task_completion() {
    let (manager, tasks) = build_manager(
        vec![Task { id: "2".into(), title: "Pet Davey".into(), priority: "low".into(), due_date: None, completed: false }],
        false,
    );

    let response = manager.handle("u1", "complete per davey", "test").await;
    assert!(response.message.to_lowercase().contains("completed: pet davey"));
    assert!(tasks.list_active("u1").await.is_empty());
}

#[tokio::test]
async fn update_task_priority_coercion() {
    let (manager, tasks) = build_manager(
        vec![Task { id: "1".into(), title: "Task one".into(), priority: "medium".into(), due_date: None, completed: false }],
        false,
    );

    let response = manager.handle("u1", "update task 1 priority high", "test").await;
    assert!(response.message.to_lowercase().contains("updated"));
    let active = tasks.list_active("u1").await;
    assert_eq!(active[0].priority, "high");
}

#[tokio::test]
async fn checkin_full_cycle_with_skip() {
    let (manager, _tasks) = build_manager_with_checkin_keys(
        vec![],
        true,
        vec!["mood".into(), "energy".into(), "daily_reflection".into()],
    );

    let start = manager.handle("u1", "/checkin", "test").await;
    assert!(!start.completed);

    let r1 = manager.handle("u1", "4", "test").await;
    assert!(!r1.completed);

    let r2 = manager.handle("u1", "skip", "test").await;
    assert!(!r2.completed);

    let r3 = manager.handle("u1", "Feeling okay today", "test").await;
    assert!(r3.completed);
    assert!(r3.message.contains("Check-in complete"));
    assert!(!manager.flow_manager().has_active_flow("u1"));
}

#[tokio::test]
async fn unrelated_outbound_expires_active_checkin() {
    let (manager, _tasks) = build_manager(vec![], true);

    manager.handle("u1", "/checkin", "test").await;
    assert!(manager.flow_manager().has_active_flow("u1"));

    manager.flow_manager().expire_checkin_flow_due_to_unrelated_outbound("u1");
    assert!(!manager.flow_manager().has_active_flow("u1"));
}
