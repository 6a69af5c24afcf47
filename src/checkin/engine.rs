// ── Check-in Question Engine (C1) ────────────────────────────────────────────
// Contract per SPEC_FULL.md §4.1: text/validate/response_statement/
// transition_phrase/build_next, all driven by the loaded Catalog.

use crate::checkin::catalog::{Catalog, QuestionType};
use crate::checkin::numeric::parse_numerical_response;
use crate::rng::CoreRng;
use crate::types::SKIPPED;

const YES_WORDS: &[&str] = &[
    "yes", "y", "yeah", "yep", "true", "1", "absolutely", "definitely", "sure",
    "of course", "i did", "i have", "100", "100%", "correct", "affirmative",
    "indeed", "certainly", "positively",
];

const NO_WORDS: &[&str] = &[
    "no", "n", "nope", "false", "0", "not really", "not at all", "negative",
    "i didn't", "i haven't", "i have not", "incorrect", "nah",
];

/// The outcome of validating a raw answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    Skipped,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl AnswerValue {
    pub fn storage_key(&self) -> String {
        match self {
            AnswerValue::Skipped => SKIPPED.to_string(),
            AnswerValue::Int(v) => v.to_string(),
            AnswerValue::Float(v) => v.to_string(),
            AnswerValue::Bool(v) => v.to_string(),
            AnswerValue::Text(v) => v.clone(),
        }
    }
}

pub struct ValidationOutcome {
    pub ok: bool,
    pub value: Option<AnswerValue>,
    pub error_message: Option<String>,
}

pub struct Engine<'a> {
    pub catalog: &'a Catalog,
}

impl<'a> Engine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn text(&self, qkey: &str) -> Option<&str> {
        self.catalog.get(qkey).map(|q| q.text.as_str())
    }

    pub fn validate(&self, qkey: &str, raw: &str) -> ValidationOutcome {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("skip") {
            return ValidationOutcome { ok: true, value: Some(AnswerValue::Skipped), error_message: None };
        }

        let Some(question) = self.catalog.get(qkey) else {
            return ValidationOutcome {
                ok: false,
                value: None,
                error_message: Some(format!("Unknown question: {qkey}")),
            };
        };

        match question.kind {
            QuestionType::Scale1To5 => {
                let Some(n) = parse_numerical_response(trimmed) else {
                    return reject(question.validation.error_message.as_deref()
                        .unwrap_or("Please answer with a number from 1 to 5."));
                };
                let rounded = n.round() as i64;
                let min = question.validation.min.unwrap_or(1.0) as i64;
                let max = question.validation.max.unwrap_or(5.0) as i64;
                if rounded < min || rounded > max {
                    return reject(question.validation.error_message.as_deref()
                        .unwrap_or("Please answer with a number from 1 to 5."));
                }
                ValidationOutcome { ok: true, value: Some(AnswerValue::Int(rounded)), error_message: None }
            }
            QuestionType::Number => {
                let Some(n) = parse_numerical_response(trimmed) else {
                    return reject(question.validation.error_message.as_deref()
                        .unwrap_or("Please answer with a number."));
                };
                let min = question.validation.min.unwrap_or(0.0);
                let max = question.validation.max.unwrap_or(24.0);
                if n < min || n > max {
                    return reject(question.validation.error_message.as_deref()
                        .unwrap_or("That number is out of range."));
                }
                ValidationOutcome { ok: true, value: Some(AnswerValue::Float(n)), error_message: None }
            }
            QuestionType::YesNo => {
                let lower = trimmed.to_lowercase();
                if YES_WORDS.contains(&lower.as_str()) {
                    ValidationOutcome { ok: true, value: Some(AnswerValue::Bool(true)), error_message: None }
                } else if NO_WORDS.contains(&lower.as_str()) {
                    ValidationOutcome { ok: true, value: Some(AnswerValue::Bool(false)), error_message: None }
                } else {
                    reject(question.validation.error_message.as_deref()
                        .unwrap_or("Please answer yes or no."))
                }
            }
            QuestionType::OptionalText => {
                let text = if trimmed.is_empty() {
                    "No reflection provided".to_string()
                } else {
                    trimmed.to_string()
                };
                ValidationOutcome { ok: true, value: Some(AnswerValue::Text(text)), error_message: None }
            }
        }
    }

    pub fn response_statement(&self, qkey: &str, value: &AnswerValue, rng: &mut dyn CoreRng) -> Option<String> {
        let key = match value {
            AnswerValue::Bool(b) => b.to_string(),
            other => other.storage_key(),
        };
        let phrases = self.catalog.bank.responses.get(qkey)?.get(&key)?;
        if phrases.is_empty() {
            return None;
        }
        let idx = rng.gen_range_usize(0, phrases.len());
        Some(phrases[idx].clone())
    }

    pub fn transition_phrase(&self, rng: &mut dyn CoreRng) -> Option<String> {
        let phrases = &self.catalog.bank.transition_phrases;
        if phrases.is_empty() {
            return None;
        }
        let idx = rng.gen_range_usize(0, phrases.len());
        Some(phrases[idx].clone())
    }

    pub fn build_next(&self, qnext: &str, qprev: &str, vprev: &AnswerValue, rng: &mut dyn CoreRng) -> String {
        let next_text = self.text(qnext).unwrap_or("").to_string();
        match self.response_statement(qprev, vprev, rng) {
            Some(statement) => {
                let transition = self.transition_phrase(rng).unwrap_or_default();
                format!("{statement}\n\n{transition} {next_text}")
            }
            None => next_text,
        }
    }
}

fn reject(message: &str) -> ValidationOutcome {
    ValidationOutcome { ok: false, value: None, error_message: Some(message.to_string()) }
}
