//! cfddns-core – configuration, public-IP detection and the update run

pub mod cfg;
pub mod detector;
pub mod error;
pub mod guard;
pub mod outcome;
pub mod updater;

pub use cfg::{AppConfig, load_config};
pub use error::{ConfigError, CoreError};
pub use outcome::Outcome;
pub use updater::{OUTCOME_TARGET, reconcile, run_once};
