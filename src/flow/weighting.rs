// ── Weighted Check-in Question Selection ─────────────────────────────────────
// Ported from `conversation_flow_manager.py::_select_checkin_questions_with_weighting`.
// See SPEC_FULL.md §4.5.3 for the full algorithm and category groupings.

use std::collections::{HashMap, HashSet};

use crate::handlers::traits::CheckinPayload;
use crate::rng::CoreRng;

/// Fixed category groupings — a question absent from every group falls back
/// to its own singleton category.
fn category_groups() -> HashMap<&'static str, &'static [&'static str]> {
    let mut m = HashMap::new();
    m.insert("mood", &["mood", "energy"][..]);
    m.insert("health", &["energy", "sleep_hours"][..]);
    m.insert("sleep", &["sleep_hours"][..]);
    m.insert("social", &["social_interaction", "gratitude"][..]);
    m.insert("reflection", &["daily_reflection", "biggest_challenge", "tomorrow_goal"][..]);
    m
}

fn category_of(qkey: &str, groups: &HashMap<&str, &[&str]>) -> String {
    for (category, members) in groups.iter() {
        if members.contains(&qkey) {
            return category.to_string();
        }
    }
    qkey.to_string()
}

/// Compute `question_order` for a new check-in, given the enabled-question
/// set `E` and up to the last 5 stored payloads.
pub fn select_questions(enabled: &[String], recent_payloads: &[CheckinPayload], rng: &mut dyn CoreRng) -> Vec<String> {
    if enabled.is_empty() {
        return Vec::new();
    }

    let recent: HashSet<String> = recent_payloads
        .iter()
        .take(3)
        .flat_map(|p| p.questions_asked.iter().cloned())
        .collect();

    let groups = category_groups();
    let mut weighted: Vec<(String, f64)> = enabled
        .iter()
        .map(|q| {
            let mut weight = 1.0;
            if recent.contains(q) {
                weight *= 0.3;
            }
            let category = category_of(q, &groups);
            let members = groups.get(category.as_str()).copied().unwrap_or(&[]);
            let recent_in_category = members.iter().filter(|m| recent.contains(&m.to_string())).count();
            if recent_in_category == 0 {
                weight *= 1.5;
            } else if recent_in_category >= 2 {
                weight *= 0.7;
            }
            weight *= rng.gen_range_f64(0.8, 1.2);
            (q.clone(), weight)
        })
        .collect();

    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let take_n = enabled.len().min(8);
    let mut ordered: Vec<String> = weighted.into_iter().take(take_n).map(|(q, _)| q).collect();
    rng.shuffle_strings(&mut ordered);
    ordered
}

/// Fallback when the weighted path fails for any reason: a uniform random
/// sample of `min(|E|, 6)`.
pub fn fallback_sample(enabled: &[String], rng: &mut dyn CoreRng) -> Vec<String> {
    let mut pool = enabled.to_vec();
    rng.shuffle_strings(&mut pool);
    let take_n = enabled.len().min(6);
    pool.truncate(take_n);
    pool
}
