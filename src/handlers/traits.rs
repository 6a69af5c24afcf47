// ── External Collaborator Traits ─────────────────────────────────────────────
// The task store, user profile/preferences store, scheduler, check-in log,
// and AI chatbot are explicitly out of scope per SPEC_FULL.md §1 — the core
// only consumes their interfaces. These traits are that boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub reminders_enabled: Option<bool>,
    pub reminder_period: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_active(&self, user_id: &str) -> Vec<Task>;
    /// Fuzzy match on identifier or title (SPEC_FULL.md §8.3 scenario 2).
    async fn find_by_identifier(&self, user_id: &str, identifier: &str) -> Option<Task>;
    async fn complete(&self, user_id: &str, task_id: &str) -> bool;
    async fn update(&self, user_id: &str, task_id: &str, patch: TaskPatch) -> bool;
    async fn create(&self, user_id: &str, task: NewTask) -> Task;
}

/// Shared fuzzy-match predicate for `TaskStore::find_by_identifier`
/// implementations: a full-phrase substring match first, falling back to
/// word overlap so "per davey" resolves against "Pet Davey"
/// (SPEC_FULL.md §8.3 scenario 2).
pub fn fuzzy_title_match(title: &str, identifier: &str) -> bool {
    let title_lower = title.to_lowercase();
    let identifier_lower = identifier.to_lowercase();
    if title_lower.contains(&identifier_lower) {
        return true;
    }
    let words: Vec<&str> = identifier_lower.split_whitespace().filter(|w| w.len() > 2).collect();
    if words.is_empty() {
        return false;
    }
    let matches = words.iter().filter(|w| title_lower.contains(*w)).count();
    matches * 2 >= words.len()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: Option<String>,
    pub checkins_enabled: bool,
    pub preferences: HashMap<String, String>,
    /// Per-user override of which check-in questions are eligible for
    /// selection; empty means "use the catalog's enabled-by-default set"
    /// (SPEC_FULL.md §8.3 scenario 4).
    #[serde(default)]
    pub enabled_checkin_keys: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub checkins_enabled: Option<bool>,
    pub enabled_checkin_keys: Option<Vec<String>>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Profile;
    async fn update(&self, user_id: &str, patch: ProfilePatch) -> Profile;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub periods: Vec<SchedulePeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePeriod {
    pub name: String,
    pub category: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Schedule;
    async fn edit_period(&self, user_id: &str, period_name: &str, category: &str, range: TimeRange) -> bool;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub period: String,
    pub headline: String,
    pub details: Vec<String>,
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn summary(&self, user_id: &str, period: &str) -> AnalyticsSummary;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinPayload {
    pub questions_asked: Vec<String>,
    pub answers: HashMap<String, serde_json::Value>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait CheckinLog: Send + Sync {
    async fn recent(&self, user_id: &str, n: usize) -> Vec<CheckinPayload>;
    async fn store(&self, user_id: &str, payload: CheckinPayload);
}

#[async_trait]
pub trait AiChatbot: Send + Sync {
    /// Warm-rewrite a response. Bounded by a 3s budget at the call site.
    async fn enhance(&self, prompt: &str) -> Option<String>;
    /// Open-ended contextual chat reply. Bounded by an 8-10s budget at the call site.
    async fn contextual_reply(&self, user_id: &str, message: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_title_match_prefers_full_phrase_substring() {
        assert!(fuzzy_title_match("Pet Davey", "davey"));
        assert!(fuzzy_title_match("Pet Davey", "pet davey"));
    }

    #[test]
    fn fuzzy_title_match_falls_back_to_word_overlap() {
        assert!(fuzzy_title_match("Pet Davey", "per davey"));
        assert!(!fuzzy_title_match("Pet Davey", "per fido"));
    }

    #[test]
    fn fuzzy_title_match_ignores_short_words_when_counting_overlap() {
        // "to" and "do" are both length 2, so they don't count toward the
        // overlap threshold; only "laundry" does.
        assert!(fuzzy_title_match("Do the laundry", "to do laundry"));
    }
}
