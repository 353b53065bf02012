pub mod global;
pub mod loader;

pub use global::{AppConfig, ServiceConfig};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
