//! Configuration loading for the loan due-date engine.
//!
//! This module loads tenant settings from YAML. The tenant zone is the zone
//! handed to [`ClosedLibraryStrategyService`](crate::calculation::ClosedLibraryStrategyService).
//!
//! # Example
//!
//! ```no_run
//! use loan_due_date_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config").unwrap();
//! println!("Tenant {} in {}", config.settings().tenant.id, config.timezone());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineSettings, TenantSettings};
