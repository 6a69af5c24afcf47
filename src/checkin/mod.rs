// ── Check-in Question Engine (C1) ────────────────────────────────────────────
// Loads question/response catalogs, parses answers, and chooses response
// phrases. See SPEC_FULL.md §4.1.

pub mod catalog;
pub mod engine;
pub mod numeric;

pub use catalog::{Catalog, Question, QuestionCatalog, QuestionType, ResponseBank, Validation};
pub use engine::{AnswerValue, Engine, ValidationOutcome};
