use crate::cache::BackgroundRefresher;
use crate::config::Config;
use crate::logger::{self, LogTag};
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Runs the background refresher for the lifetime of the process
pub struct CacheRefresherService {
    refresher: Arc<BackgroundRefresher>,
}

impl CacheRefresherService {
    pub fn new(refresher: Arc<BackgroundRefresher>) -> Self {
        Self { refresher }
    }
}

#[async_trait]
impl Service for CacheRefresherService {
    fn name(&self) -> &'static str {
        "cache_refresher"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.refresher.enabled
    }

    async fn start(&mut self, _shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        if !self.refresher.start() {
            logger::debug(LogTag::Services, "Refresher was already running");
        }
        // The refresher owns its loop task and stops it in `stop`
        Ok(Vec::new())
    }

    async fn stop(&mut self) -> Result<(), String> {
        self.refresher.stop().await;
        Ok(())
    }

    async fn health(&self) -> ServiceHealth {
        if self.refresher.is_running() {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Stopped
        }
    }
}
