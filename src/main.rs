// ── PawBot Process Entry Point ───────────────────────────────────────────────
// Minimal CLI surface: environment variables control behavior, no flags are
// required, the process runs until signaled (SPEC_FULL.md §6).

use std::sync::Arc;

use pawbot_core::channel::ChannelAdapter;
use pawbot_core::checkin::Catalog;
use pawbot_core::handlers::analytics::AnalyticsHandler;
use pawbot_core::handlers::help::HelpHandler;
use pawbot_core::handlers::profile::ProfileHandler;
use pawbot_core::handlers::schedule::ScheduleHandler;
use pawbot_core::handlers::tasks::TaskHandler;
use pawbot_core::handlers::HandlerRegistry;
use pawbot_core::identity::IdentityMap;
use pawbot_core::store::DefaultStores;
use pawbot_core::{InteractionManager, InteractionManagerDeps, RuntimeConfig};

const DEFAULT_CATALOG_DIR: &str = "resources/default_checkin";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = RuntimeConfig::from_env();
    log::info!("starting pawbot-core with data_root={}", config.data_root.display());

    let catalog = match Catalog::load_from_dir(std::path::Path::new(DEFAULT_CATALOG_DIR)) {
        Ok(c) => c,
        Err(e) => {
            log::error!("failed to load check-in catalog from {DEFAULT_CATALOG_DIR}: {e}");
            std::process::exit(1);
        }
    };

    let stores = DefaultStores::new(config.data_root.clone());

    let handlers = HandlerRegistry::new(vec![
        Box::new(TaskHandler::new(stores.tasks.clone())),
        Box::new(ProfileHandler::new(stores.profile.clone())),
        Box::new(ScheduleHandler::new(stores.schedule.clone())),
        Box::new(AnalyticsHandler::new(stores.analytics.clone())),
        Box::new(HelpHandler),
    ]);

    let interaction = InteractionManager::new(InteractionManagerDeps {
        handlers,
        ai_chatbot: None,
        min_command_confidence: config.min_command_confidence,
        ai_max_response_len: config.ai_max_response_len,
        state_path: config.conversation_states_path(),
        catalog,
        checkin_log: stores.checkin_log.clone(),
        profile_store: stores.profile.clone(),
        inactivity_minutes: config.checkin_inactivity_minutes,
    });

    let identity = Arc::new(IdentityMap::new());

    let adapter = match ChannelAdapter::new(config, interaction, identity) {
        Ok(adapter) => Arc::new(adapter),
        Err(e) => {
            log::error!("failed to construct channel adapter: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = adapter.initialize().await {
        log::error!("failed to initialize channel adapter: {e}");
        std::process::exit(1);
    }

    log::info!("pawbot-core running, state={:?}", adapter.state());

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for shutdown signal: {e}");
    }

    log::info!("shutdown signal received, stopping");
    if let Err(e) = adapter.shutdown().await {
        log::error!("error during shutdown: {e}");
    }
}
