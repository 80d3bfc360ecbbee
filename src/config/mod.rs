#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Job};
pub use toml_config::{JobsConfig, OerConfig, SmithsonianConfig, WikimediaConfig};
