// src/config/mod.rs

//! Network description files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a network file from disk (`loader.rs`).
//! - Validate references, numbers and master/slave relations (`validate.rs`).
//!
//! Turning a validated [`NetworkFile`] into a task graph is
//! [`Network::from_config`](crate::network::Network::from_config).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigSection, ConnectionConfig, DeviceConfig, HintConfig, InputConfig, NetworkFile,
    OutputConfig, RawNetworkFile, TaskConfig,
};
