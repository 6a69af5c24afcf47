// ── AI Enhancement Leakage-Filter Pipeline ───────────────────────────────────
// Modeled as a small ordered filter pipeline per SPEC_FULL.md §9 design note:
// predicate (contains marker -> reject), predicate (too short -> reject),
// transform (smart-truncate). Pipelines are easier to unit-test than inline
// conditions.

const LEAKAGE_MARKERS: &[&str] = &[
    "System response:",
    "system response:",
    "You are a",
    "you are a chatbot",
    "```",
    "{\"",
    "AI:",
    "Assistant:",
    "As an AI",
];

const MIN_ENHANCED_LEN: usize = 11;

#[derive(Debug)]
pub enum Rejected {
    ContainsLeakageMarker,
    TooShort,
}

/// Run the candidate AI-enhanced text through the filter pipeline. Returns
/// the (possibly truncated) text to use, or the reason it was rejected.
pub fn filter_enhancement(candidate: &str, max_len: usize) -> Result<String, Rejected> {
    if LEAKAGE_MARKERS.iter().any(|marker| candidate.contains(marker)) {
        return Err(Rejected::ContainsLeakageMarker);
    }
    if candidate.chars().count() < MIN_ENHANCED_LEN {
        return Err(Rejected::TooShort);
    }
    Ok(smart_truncate(candidate, max_len))
}

/// Truncate at the latest sentence boundary (`.`, `!`, `?` followed by
/// whitespace or end-of-string) at or after 60% of the budget. If no
/// boundary qualifies, hard-truncate and append "...".
fn smart_truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let min_boundary = (max_len as f64 * 0.6) as usize;
    let chars: Vec<char> = text.chars().collect();
    let window_end = max_len.min(chars.len());

    let mut best_boundary: Option<usize> = None;
    for (i, ch) in chars.iter().enumerate().take(window_end) {
        if matches!(ch, '.' | '!' | '?') {
            let next_is_boundary = i + 1 >= chars.len() || chars[i + 1].is_whitespace();
            if next_is_boundary && i + 1 >= min_boundary {
                best_boundary = Some(i + 1);
            }
        }
    }

    match best_boundary {
        Some(end) => chars[..end].iter().collect::<String>().trim_end().to_string(),
        None => {
            let truncated: String = chars[..max_len.min(chars.len())].iter().collect();
            format!("{}...", truncated.trim_end())
        }
    }
}
