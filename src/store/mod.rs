// ── Default File-Backed Collaborator Stores ──────────────────────────────────
// The task/profile/schedule/analytics stores and check-in log are explicitly
// external collaborators (SPEC_FULL.md §1) — the core only consumes their
// trait interfaces. This module provides a minimal JSON-file-backed default
// implementation under `<data_root>/users/<user_id>/…` (SPEC_FULL.md §6) so
// the binary is runnable standalone; a real deployment swaps these for a
// proper database-backed service without touching the core.
//
// Persistence follows the same atomic-rewrite convention as `flow::state`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::handlers::traits::{
    fuzzy_title_match, AnalyticsStore, AnalyticsSummary, CheckinLog, CheckinPayload, NewTask, Profile,
    ProfilePatch, ProfileStore, Schedule, SchedulePeriod, ScheduleStore, Task, TaskPatch, TaskStore, TimeRange,
};

fn user_dir(data_root: &Path, user_id: &str) -> PathBuf {
    data_root.join("users").join(user_id)
}

fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

fn load_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    std::fs::read_to_string(path).ok().and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or_default()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TaskFile {
    tasks: Vec<Task>,
    next_id: u64,
}

pub struct JsonTaskStore {
    data_root: PathBuf,
    cache: Mutex<HashMap<String, TaskFile>>,
}

impl JsonTaskStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into(), cache: Mutex::new(HashMap::new()) }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        user_dir(&self.data_root, user_id).join("tasks.json")
    }

    fn load(&self, user_id: &str) -> TaskFile {
        let mut cache = self.cache.lock();
        if let Some(file) = cache.get(user_id) {
            return file.clone();
        }
        let file: TaskFile = load_json(&self.path(user_id));
        cache.insert(user_id.to_string(), file.clone());
        file
    }

    fn save(&self, user_id: &str, file: TaskFile) {
        if let Ok(raw) = serde_json::to_string_pretty(&file) {
            let _ = atomic_write(&self.path(user_id), &raw);
        }
        self.cache.lock().insert(user_id.to_string(), file);
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn list_active(&self, user_id: &str) -> Vec<Task> {
        self.load(user_id).tasks.into_iter().filter(|t| !t.completed).collect()
    }

    async fn find_by_identifier(&self, user_id: &str, identifier: &str) -> Option<Task> {
        self.load(user_id)
            .tasks
            .into_iter()
            .find(|t| !t.completed && (t.id == identifier || fuzzy_title_match(&t.title, identifier)))
    }

    async fn complete(&self, user_id: &str, task_id: &str) -> bool {
        let mut file = self.load(user_id);
        let found = file.tasks.iter_mut().find(|t| t.id == task_id);
        let ok = found.map(|t| t.completed = true).is_some();
        if ok {
            self.save(user_id, file);
        }
        ok
    }

    async fn update(&self, user_id: &str, task_id: &str, patch: TaskPatch) -> bool {
        let mut file = self.load(user_id);
        let Some(task) = file.tasks.iter_mut().find(|t| t.id == task_id) else { return false };
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        self.save(user_id, file);
        true
    }

    async fn create(&self, user_id: &str, new_task: NewTask) -> Task {
        let mut file = self.load(user_id);
        file.next_id += 1;
        let task = Task {
            id: file.next_id.to_string(),
            title: new_task.title,
            priority: new_task.priority.unwrap_or_else(|| "medium".to_string()),
            due_date: new_task.due_date,
            completed: false,
        };
        file.tasks.push(task.clone());
        self.save(user_id, file);
        task
    }
}

pub struct JsonProfileStore {
    data_root: PathBuf,
}

impl JsonProfileStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into() }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        user_dir(&self.data_root, user_id).join("profile.json")
    }
}

#[async_trait]
impl ProfileStore for JsonProfileStore {
    async fn get(&self, user_id: &str) -> Profile {
        load_json(&self.path(user_id))
    }

    async fn update(&self, user_id: &str, patch: ProfilePatch) -> Profile {
        let mut profile: Profile = load_json(&self.path(user_id));
        if let Some(name) = patch.display_name {
            profile.display_name = Some(name);
        }
        if let Some(enabled) = patch.checkins_enabled {
            profile.checkins_enabled = enabled;
        }
        if let Some(keys) = patch.enabled_checkin_keys {
            profile.enabled_checkin_keys = keys;
        }
        if let Ok(raw) = serde_json::to_string_pretty(&profile) {
            let _ = atomic_write(&self.path(user_id), &raw);
        }
        profile
    }
}

pub struct JsonScheduleStore {
    data_root: PathBuf,
}

impl JsonScheduleStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into() }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        user_dir(&self.data_root, user_id).join("schedule.json")
    }
}

#[async_trait]
impl ScheduleStore for JsonScheduleStore {
    async fn get(&self, user_id: &str) -> Schedule {
        load_json(&self.path(user_id))
    }

    async fn edit_period(&self, user_id: &str, period_name: &str, category: &str, range: TimeRange) -> bool {
        let mut schedule: Schedule = load_json(&self.path(user_id));
        match schedule.periods.iter_mut().find(|p| p.name == period_name) {
            Some(period) => {
                period.category = category.to_string();
                period.start = range.start;
                period.end = range.end;
            }
            None => schedule.periods.push(SchedulePeriod {
                name: period_name.to_string(),
                category: category.to_string(),
                start: range.start,
                end: range.end,
            }),
        }
        let Ok(raw) = serde_json::to_string_pretty(&schedule) else { return false };
        atomic_write(&self.path(user_id), &raw).is_ok()
    }
}

pub struct NullAnalyticsStore;

#[async_trait]
impl AnalyticsStore for NullAnalyticsStore {
    async fn summary(&self, _user_id: &str, period: &str) -> AnalyticsSummary {
        AnalyticsSummary { period: period.to_string(), headline: "No analytics data yet.".to_string(), details: vec![] }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CheckinLogFile {
    payloads: Vec<CheckinPayload>,
}

pub struct JsonCheckinLog {
    data_root: PathBuf,
}

impl JsonCheckinLog {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into() }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        user_dir(&self.data_root, user_id).join("checkins.json")
    }
}

#[async_trait]
impl CheckinLog for JsonCheckinLog {
    async fn recent(&self, user_id: &str, n: usize) -> Vec<CheckinPayload> {
        let mut file: CheckinLogFile = load_json(&self.path(user_id));
        file.payloads.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        file.payloads.truncate(n);
        file.payloads
    }

    async fn store(&self, user_id: &str, payload: CheckinPayload) {
        let mut file: CheckinLogFile = load_json(&self.path(user_id));
        file.payloads.push(payload);
        if let Ok(raw) = serde_json::to_string_pretty(&file) {
            let _ = atomic_write(&self.path(user_id), &raw);
        }
    }
}

pub struct DefaultStores {
    pub tasks: Arc<JsonTaskStore>,
    pub profile: Arc<JsonProfileStore>,
    pub schedule: Arc<JsonScheduleStore>,
    pub analytics: Arc<NullAnalyticsStore>,
    pub checkin_log: Arc<JsonCheckinLog>,
}

impl DefaultStores {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            tasks: Arc::new(JsonTaskStore::new(data_root.clone())),
            profile: Arc::new(JsonProfileStore::new(data_root.clone())),
            schedule: Arc::new(JsonScheduleStore::new(data_root.clone())),
            analytics: Arc::new(NullAnalyticsStore),
            checkin_log: Arc::new(JsonCheckinLog::new(data_root)),
        }
    }
}
