//! Port profiles loaded from `config.toml`.

pub mod loader;
pub mod types;

pub use loader::ConfigError;
pub use types::{Config, Defaults, PortProfile};
