//! Configuration system
//!
//! Sections are declared in `config/schemas.rs` with the `config_struct!`
//! macro and loaded from TOML by `config/utils.rs`.

#[macro_use]
mod macros;
mod schemas;
mod utils;

pub use schemas::{section_field_names, CacheConfig, Config, RefresherConfig, WebserverConfig};
pub use utils::{
    get_config, load_config_from_path, parse_config, reload_config_from_path, unknown_keys,
    validate_config, with_config,
};
