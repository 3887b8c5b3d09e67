mod server;

pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Public API for starting the admin webserver
pub use server::{build_app, start_server, test_port_binding};
pub use state::AppState;
