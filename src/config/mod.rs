mod loader;
mod types;

pub use loader::{default_config_path, load_config};
pub use types::{AuthConfig, Config, HostConfig, LimitsConfig};
