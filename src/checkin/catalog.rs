// ── Check-in Catalog ─────────────────────────────────────────────────────────
// Question/response catalogs are loaded once at process start and are
// read-only thereafter (SPEC_FULL.md §3 lifecycle rule).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[serde(rename = "scale_1_5")]
    Scale1To5,
    YesNo,
    Number,
    OptionalText,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub text: String,
    pub enabled_by_default: bool,
    pub category: String,
    #[serde(default)]
    pub validation: Validation,
    pub ui_display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionCatalog {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBank {
    pub responses: HashMap<String, HashMap<String, Vec<String>>>,
    pub transition_phrases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub questions: HashMap<String, Question>,
    pub order: Vec<String>,
    pub bank: ResponseBank,
}

impl Catalog {
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let q_path = dir.join("questions.json");
        let r_path = dir.join("responses.json");
        let q_raw = std::fs::read_to_string(&q_path)?;
        let r_raw = std::fs::read_to_string(&r_path)?;
        let q_catalog: QuestionCatalog = serde_json::from_str(&q_raw)?;
        let bank: ResponseBank = serde_json::from_str(&r_raw)?;
        Self::from_parts(q_catalog, bank)
    }

    pub fn from_parts(q_catalog: QuestionCatalog, bank: ResponseBank) -> CoreResult<Self> {
        let order: Vec<String> = q_catalog.questions.iter().map(|q| q.key.clone()).collect();
        let mut questions = HashMap::new();
        for q in q_catalog.questions {
            questions.insert(q.key.clone(), q);
        }
        if questions.is_empty() {
            return Err(CoreError::Config("check-in catalog has no questions".into()));
        }
        Ok(Self { questions, order, bank })
    }

    pub fn get(&self, key: &str) -> Option<&Question> {
        self.questions.get(key)
    }

    pub fn enabled_keys(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|k| self.questions.get(*k).map(|q| q.enabled_by_default).unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for key in &self.order {
            if let Some(q) = self.questions.get(key) {
                if !seen.contains(&q.category) {
                    seen.push(q.category.clone());
                }
            }
        }
        seen
    }
}
