mod health;
pub mod implementations;

pub use health::ServiceHealth;

use crate::config::Config;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// How long `stop_all` waits on each task handle before aborting it
const HANDLE_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Core service trait that all services must implement
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service identifier
    fn name(&self) -> &'static str;

    /// Service priority (lower = starts earlier, stops later)
    fn priority(&self) -> i32 {
        100
    }

    /// Services this service depends on
    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }

    fn is_enabled(&self, _config: &Config) -> bool {
        true
    }

    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Start the service, returning the tasks it spawned
    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}

pub struct ServiceManager {
    services: HashMap<&'static str, Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    config: Config,
}

impl ServiceManager {
    pub fn new(config: Config) -> Self {
        Self {
            services: HashMap::new(),
            handles: HashMap::new(),
            shutdown: Arc::new(Notify::new()),
            config,
        }
    }

    /// Register a service
    pub fn register(&mut self, service: Box<dyn Service>) {
        let name = service.name();
        if self.services.insert(name, service).is_some() {
            logger::warning(LogTag::Services, &format!("Service '{}' registered twice, replacing", name));
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Start all enabled services in dependency and priority order
    pub async fn start_all(&mut self) -> Result<(), String> {
        let enabled: Vec<&'static str> = self
            .services
            .iter()
            .filter(|(_, service)| service.is_enabled(&self.config))
            .map(|(name, _)| *name)
            .collect();

        let ordered = self.resolve_startup_order(&enabled)?;
        logger::info(LogTag::Services, &format!("Service startup order: {:?}", ordered));

        for name in ordered {
            let Some(service) = self.services.get_mut(name) else {
                continue;
            };

            service.initialize().await?;
            let handles = service
                .start(Arc::clone(&self.shutdown))
                .await
                .map_err(|e| format!("Service '{}' failed to start: {}", name, e))?;
            self.handles.insert(name, handles);

            logger::info(LogTag::Services, &format!("Service started: {}", name));
        }

        Ok(())
    }

    /// Stop running services in reverse startup order
    pub async fn stop_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::Services, "Stopping all services...");
        self.shutdown.notify_waiters();

        let running: Vec<&'static str> = self.handles.keys().copied().collect();
        let mut ordered = self.resolve_startup_order(&running)?;
        ordered.reverse();

        for name in ordered {
            let Some(handles) = self.handles.remove(name) else {
                continue;
            };

            if let Some(service) = self.services.get_mut(name) {
                if let Err(e) = service.stop().await {
                    logger::warning(
                        LogTag::Services,
                        &format!("Service stop error for {}: {}", name, e),
                    );
                }
            }

            for mut handle in handles {
                if tokio::time::timeout(HANDLE_STOP_TIMEOUT, &mut handle).await.is_err() {
                    logger::warning(
                        LogTag::Services,
                        &format!("Task of service '{}' did not stop in time, aborting", name),
                    );
                    handle.abort();
                }
            }

            logger::info(LogTag::Services, &format!("Service stopped: {}", name));
        }

        Ok(())
    }

    fn resolve_startup_order(&self, names: &[&'static str]) -> Result<Vec<&'static str>, String> {
        fn visit(
            name: &'static str,
            services: &HashMap<&'static str, Box<dyn Service>>,
            ordered: &mut Vec<&'static str>,
            visited: &mut HashSet<&'static str>,
            visiting: &mut HashSet<&'static str>,
        ) -> Result<(), String> {
            if visited.contains(name) {
                return Ok(());
            }
            if !visiting.insert(name) {
                return Err(format!("Circular dependency detected for service: {}", name));
            }

            if let Some(service) = services.get(name) {
                for dep in service.dependencies() {
                    visit(dep, services, ordered, visited, visiting)?;
                }
            }

            visiting.remove(name);
            visited.insert(name);
            ordered.push(name);
            Ok(())
        }

        let mut sorted = names.to_vec();
        sorted.sort_by_key(|name| (self.priority_of(name), *name));

        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();
        for name in sorted {
            visit(name, &self.services, &mut ordered, &mut visited, &mut visiting)?;
        }

        // Only registered services can be started
        ordered.retain(|name| self.services.contains_key(name));
        Ok(ordered)
    }

    fn priority_of(&self, name: &str) -> i32 {
        self.services.get(name).map(|s| s.priority()).unwrap_or(100)
    }

    pub async fn get_health(&self) -> BTreeMap<&'static str, ServiceHealth> {
        let mut health = BTreeMap::new();
        for (name, service) in &self.services {
            health.insert(*name, service.health().await);
        }
        health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Probe {
        name: &'static str,
        priority: i32,
        deps: Vec<&'static str>,
        enabled: bool,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Probe {
        fn boxed(
            name: &'static str,
            priority: i32,
            deps: Vec<&'static str>,
            events: &Arc<Mutex<Vec<String>>>,
        ) -> Box<dyn Service> {
            Box::new(Self {
                name,
                priority,
                deps,
                enabled: true,
                events: Arc::clone(events),
            })
        }
    }

    #[async_trait]
    impl Service for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.deps.clone()
        }

        fn is_enabled(&self, _config: &Config) -> bool {
            self.enabled
        }

        async fn start(&mut self, _shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
            self.events.lock().push(format!("start:{}", self.name));
            Ok(vec![tokio::spawn(async {})])
        }

        async fn stop(&mut self) -> Result<(), String> {
            self.events.lock().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_priority_and_reverse_stop() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(Probe::boxed("webserver", 30, vec![], &events));
        manager.register(Probe::boxed("cache_refresher", 10, vec![], &events));

        manager.start_all().await.unwrap();
        assert!(manager.is_running("webserver"));
        manager.stop_all().await.unwrap();
        assert!(!manager.is_running("webserver"));

        assert_eq!(
            *events.lock(),
            vec![
                "start:cache_refresher",
                "start:webserver",
                "stop:webserver",
                "stop:cache_refresher"
            ]
        );
    }

    #[tokio::test]
    async fn test_dependencies_start_first() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(Probe::boxed("a", 1, vec!["b"], &events));
        manager.register(Probe::boxed("b", 50, vec![], &events));

        manager.start_all().await.unwrap();
        manager.stop_all().await.unwrap();
        assert_eq!(events.lock()[..2], ["start:b".to_string(), "start:a".to_string()]);
    }

    #[tokio::test]
    async fn test_cycle_is_rejected() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(Probe::boxed("a", 1, vec!["b"], &events));
        manager.register(Probe::boxed("b", 1, vec!["a"], &events));

        let err = manager.start_all().await.unwrap_err();
        assert!(err.contains("Circular dependency"));
    }

    #[tokio::test]
    async fn test_disabled_services_skipped() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(Box::new(Probe {
            name: "webserver",
            priority: 30,
            deps: vec![],
            enabled: false,
            events: Arc::clone(&events),
        }));

        manager.start_all().await.unwrap();
        assert!(events.lock().is_empty());
        assert_eq!(manager.get_health().await.get("webserver"), Some(&ServiceHealth::Healthy));
    }
}
