// ── Persisted Flow State ─────────────────────────────────────────────────────
// JSON map user_id -> flow_state, loaded at startup, rewritten atomically
// after every mutation. Load failure leaves the map empty (non-fatal).
// Writes create the parent directory if missing. See SPEC_FULL.md §4.5.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Checkin,
    TaskReminder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    pub flow: Flow,
    pub state: i32,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub question_order: Option<Vec<String>>,
    #[serde(default)]
    pub current_question_index: Option<usize>,
    pub last_activity: DateTime<Utc>,
}

/// Check-in sub-states, mirroring the original source's integer state machine.
pub mod checkin_state {
    pub const START: i32 = 0;
    pub const IN_PROGRESS: i32 = 1;
}

pub mod task_reminder_state {
    pub const ASKED: i32 = 0;
}

/// In-memory map, persisted to a JSON file. A corrupt or missing file is
/// treated as empty (non-fatal) per the spec's lifecycle rule.
pub struct FlowStore {
    path: PathBuf,
    states: HashMap<String, FlowState>,
}

impl FlowStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let states = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, states }
    }

    pub fn get(&self, user_id: &str) -> Option<&FlowState> {
        self.states.get(user_id)
    }

    pub fn set(&mut self, user_id: &str, state: FlowState) {
        self.states.insert(user_id.to_string(), state);
        self.persist();
    }

    pub fn remove(&mut self, user_id: &str) -> Option<FlowState> {
        let removed = self.states.remove(user_id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    pub fn has_flow(&self, user_id: &str) -> bool {
        self.states.contains_key(user_id)
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.states) {
            let _ = atomic_write(&self.path, &json);
        }
    }

    #[cfg(test)]
    pub fn states_snapshot(&self) -> &HashMap<String, FlowState> {
        &self.states
    }
}

fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_state() -> FlowState {
        FlowState {
            flow: Flow::Checkin,
            state: checkin_state::START,
            data: HashMap::new(),
            question_order: Some(vec!["mood".into()]),
            current_question_index: Some(0),
            last_activity: Utc::now(),
        }
    }

    #[test]
    fn missing_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let store = FlowStore::load(dir.path().join("conversation_states.json"));
        assert!(!store.has_flow("u1"));
    }

    #[test]
    fn corrupt_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conversation_states.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FlowStore::load(&path);
        assert!(!store.has_flow("u1"));
    }

    #[test]
    fn round_trip_persists_and_reloads_identical_map() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conversation_states.json");
        let mut store = FlowStore::load(&path);
        store.set("u1", make_state());
        let reloaded = FlowStore::load(&path);
        assert!(reloaded.has_flow("u1"));
        assert_eq!(reloaded.get("u1").unwrap().flow, Flow::Checkin);
    }

    #[test]
    fn remove_clears_entry_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conversation_states.json");
        let mut store = FlowStore::load(&path);
        store.set("u1", make_state());
        store.remove("u1");
        let reloaded = FlowStore::load(&path);
        assert!(!reloaded.has_flow("u1"));
    }

    #[test]
    fn writes_create_parent_directory_if_missing() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("conversation_states.json");
        let mut store = FlowStore::load(&nested);
        store.set("u1", make_state());
        assert!(nested.exists());
    }
}
