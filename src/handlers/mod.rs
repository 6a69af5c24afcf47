// ── Intent Handlers (C3) ─────────────────────────────────────────────────────
// Per-intent single-turn logic. Handlers are pure w.r.t. channel; they may
// read/write external stores but must not touch C6 state. Domain errors
// surface as user-visible InteractionResponse text, never as raised errors.
// See SPEC_FULL.md §4.3.

pub mod analytics;
pub mod help;
pub mod profile;
pub mod schedule;
pub mod tasks;
pub mod traits;

use async_trait::async_trait;

use crate::types::{InteractionResponse, ParsedCommand};

#[async_trait]
pub trait Handler: Send + Sync {
    fn can_handle(&self, intent: &str) -> bool;
    async fn handle(&self, user_id: &str, parsed: &ParsedCommand) -> InteractionResponse;
    fn help(&self) -> &'static str;
    fn examples(&self) -> Vec<&'static str>;
}

/// Registry of all intent handlers, consulted in order by the interaction
/// manager (C4). The first handler whose `can_handle` returns true wins.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { handlers }
    }

    pub fn find(&self, intent: &str) -> Option<&dyn Handler> {
        self.handlers.iter().find(|h| h.can_handle(intent)).map(|h| h.as_ref())
    }
}
