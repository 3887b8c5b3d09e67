pub mod cache_refresher_service;
#[cfg(feature = "web")]
pub mod webserver_service;

pub use cache_refresher_service::CacheRefresherService;
#[cfg(feature = "web")]
pub use webserver_service::WebserverService;
