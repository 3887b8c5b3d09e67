use dashcache::{
    arguments::{get_config_path, is_help_requested, print_debug_info, print_help},
    cache::{BackgroundRefresher, CacheStore},
    config,
    logger::{self, LogTag},
    services::{implementations::CacheRefresherService, ServiceManager},
};
use std::sync::Arc;

/// Main entry point for dashcache
///
/// Loads the config, builds the shared store and refresher, runs the services
/// until Ctrl-C, then stops them in reverse order.
#[tokio::main]
async fn main() {
    logger::init();

    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(
        LogTag::System,
        &format!("dashcache v{} starting up...", env!("CARGO_PKG_VERSION")),
    );
    print_debug_info();

    let config_path = get_config_path();
    let config = match config::load_config_from_path(&config_path) {
        Ok(config) => config,
        Err(e) => {
            logger::error(
                LogTag::Config,
                &format!("Failed to load configuration from {}: {}", config_path, e),
            );
            std::process::exit(1);
        }
    };

    let store = Arc::new(CacheStore::new(&config.cache));
    let refresher = Arc::new(BackgroundRefresher::new(
        Arc::clone(&store),
        config.refresher.clone(),
    ));

    let mut manager = ServiceManager::new(config.clone());
    manager.register(Box::new(CacheRefresherService::new(Arc::clone(&refresher))));

    #[cfg(feature = "web")]
    {
        use dashcache::services::implementations::WebserverService;
        use dashcache::webserver::AppState;

        let state = AppState::new(Arc::clone(&store), Arc::clone(&refresher));
        manager.register(Box::new(WebserverService::new(state, config.webserver.clone())));
    }

    if let Err(e) = manager.start_all().await {
        logger::error(LogTag::System, &format!("Startup failed: {}", e));
        let _ = manager.stop_all().await;
        std::process::exit(1);
    }

    logger::info(LogTag::System, "Running, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::error(LogTag::System, &format!("Failed to listen for Ctrl-C: {}", e));
    }

    logger::info(LogTag::System, "Shutdown requested");
    if let Err(e) = manager.stop_all().await {
        logger::error(LogTag::System, &format!("Shutdown error: {}", e));
        std::process::exit(1);
    }
    logger::info(LogTag::System, "Stopped cleanly");
}
