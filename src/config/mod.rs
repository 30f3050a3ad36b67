pub mod app_config;
pub mod model;

pub use app_config::{ConfigError, ConfigSource, load_config};
pub use model::{KeepAliveConfig, OverlapPolicy};
