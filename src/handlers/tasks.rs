// ── Task Intent Handler ──────────────────────────────────────────────────────

use async_trait::async_trait;
use std::sync::Arc;

use crate::handlers::traits::{NewTask, TaskPatch, TaskStore};
use crate::handlers::Handler;
use crate::types::{EntityMapExt, InteractionResponse, ParsedCommand};

pub struct TaskHandler {
    pub store: Arc<dyn TaskStore>,
}

impl TaskHandler {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for TaskHandler {
    fn can_handle(&self, intent: &str) -> bool {
        matches!(
            intent,
            "create_task" | "list_tasks" | "complete_task" | "delete_task" | "update_task" | "task_stats"
        )
    }

    async fn handle(&self, user_id: &str, parsed: &ParsedCommand) -> InteractionResponse {
        match parsed.intent.as_str() {
            "list_tasks" => {
                let tasks = self.store.list_active(user_id).await;
                if tasks.is_empty() {
                    InteractionResponse::text("You have no active tasks.", true)
                } else {
                    let lines: Vec<String> = tasks.iter().map(|t| format!("- {} ({})", t.title, t.priority)).collect();
                    InteractionResponse::text(format!("Your tasks:\n{}", lines.join("\n")), true)
                }
            }
            "task_stats" => {
                let tasks = self.store.list_active(user_id).await;
                InteractionResponse::text(format!("You have {} active task(s).", tasks.len()), true)
            }
            "create_task" => {
                let title = parsed
                    .entities
                    .get_str("title")
                    .unwrap_or(&parsed.original_message)
                    .to_string();
                let priority = parsed.entities.get_str("priority").map(|s| s.to_string());
                let due_date = parsed.entities.get_str("due_date").map(|s| s.to_string());
                let task = self.store.create(user_id, NewTask { title: title.clone(), priority, due_date }).await;
                InteractionResponse::text(format!("Created task: {}", task.title), true)
            }
            "complete_task" => {
                let Some(identifier) = parsed.entities.get_str("task_identifier") else {
                    return InteractionResponse::text("Which task would you like to complete?", false)
                        .with_suggestions(vec!["list tasks".into(), "cancel".into()]);
                };
                match self.store.find_by_identifier(user_id, identifier).await {
                    Some(task) => {
                        self.store.complete(user_id, &task.id).await;
                        InteractionResponse::text(format!("Completed: {}", task.title), true)
                    }
                    None => InteractionResponse::text(
                        format!("I couldn't find a task matching \"{identifier}\"."),
                        true,
                    ),
                }
            }
            "delete_task" => {
                let Some(identifier) = parsed.entities.get_str("task_identifier") else {
                    return InteractionResponse::text("Which task would you like to delete?", false)
                        .with_suggestions(vec!["list tasks".into(), "cancel".into()]);
                };
                match self.store.find_by_identifier(user_id, identifier).await {
                    Some(task) => InteractionResponse::text(
                        format!("Are you sure you want to delete \"{}\"? Reply \"confirm delete\" to proceed.", task.title),
                        false,
                    )
                    .with_suggestions(vec!["confirm delete".into(), "cancel".into()]),
                    None => InteractionResponse::text(
                        format!("I couldn't find a task matching \"{identifier}\"."),
                        true,
                    ),
                }
            }
            "update_task" => {
                let Some(identifier) = parsed.entities.get_str("task_identifier") else {
                    return InteractionResponse::text("Which task would you like to update?", false)
                        .with_suggestions(vec!["list tasks".into(), "cancel".into()]);
                };
                let Some(task) = self.store.find_by_identifier(user_id, identifier).await else {
                    return InteractionResponse::text(
                        format!("I couldn't find a task matching \"{identifier}\"."),
                        true,
                    );
                };
                let patch = TaskPatch {
                    title: parsed.entities.get_str("title").map(|s| s.to_string()),
                    priority: parsed.entities.get_str("priority").map(|s| s.to_string()),
                    due_date: parsed.entities.get_str("due_date").map(|s| s.to_string()),
                    ..Default::default()
                };
                self.store.update(user_id, &task.id, patch).await;
                InteractionResponse::text(format!("Updated \"{}\".", task.title), true)
            }
            _ => InteractionResponse::text("I'm not sure how to help with that task request.", true),
        }
    }

    fn help(&self) -> &'static str {
        "Task commands: \"add task <title>\", \"show my tasks\", \"complete task <id>\", \"delete task <id>\", \"update task <id> priority <level>\"."
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["add task Buy groceries", "complete task 1", "update task 1 priority high"]
    }
}
