pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Job};

pub use adapters::{http::HttpSession, http::RetryPolicy, storage::LocalStorage};
pub use config::JobsConfig;
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
