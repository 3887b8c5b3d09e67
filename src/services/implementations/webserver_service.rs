use crate::arguments;
use crate::config::{Config, WebserverConfig};
use crate::logger::{self, LogTag};
use crate::services::{Service, ServiceHealth};
use crate::webserver::{self, AppState};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Serves the admin API until shutdown
pub struct WebserverService {
    state: AppState,
    config: WebserverConfig,
    running: bool,
}

impl WebserverService {
    pub fn new(state: AppState, mut config: WebserverConfig) -> Self {
        if let Some(port) = arguments::get_port_override() {
            config.port = port;
        }
        Self {
            state,
            config,
            running: false,
        }
    }
}

#[async_trait]
impl Service for WebserverService {
    fn name(&self) -> &'static str {
        "webserver"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.webserver.enabled && !arguments::is_web_disabled()
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        // Bind errors surface here instead of inside the background task
        webserver::test_port_binding(&self.config).await?;

        let state = self.state.clone();
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = webserver::start_server(state, &config, shutdown).await {
                logger::error(LogTag::Webserver, &format!("Webserver failed: {}", e));
            }
        });
        self.running = true;

        logger::info(
            LogTag::Services,
            &format!("Webserver ready at http://{}/api", self.config.bind_address()),
        );
        Ok(vec![handle])
    }

    async fn stop(&mut self) -> Result<(), String> {
        // The server task exits on the shared shutdown notifier
        self.running = false;
        Ok(())
    }

    async fn health(&self) -> ServiceHealth {
        if self.running {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Stopped
        }
    }
}
