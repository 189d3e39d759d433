//! Configuration for the buchi share service.
//!
//! A config file (`buchi.toml` / `.yaml` / `.json`) is loaded once at
//! startup and never mutated afterwards. Every field has a default, so a
//! missing config file is fine; an explicitly requested one that fails to
//! load is not.

mod env_subst;
mod loader;
mod schema;

pub use {
    env_subst::substitute_env,
    loader::{discover_and_load, find_config_file, load_config},
    schema::{BuchiConfig, DeviceConfig, DeviceMode, SerialTimingConfig},
};
