// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{NetworkFile, RawNetworkFile};
use crate::errors::Result;

/// Load a network file from a given path and return the raw `RawNetworkFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawNetworkFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let network: RawNetworkFile = toml::from_str(&contents)?;
    Ok(network)
}

/// Parse and validate a network description held in memory.
pub fn load_from_str(contents: &str) -> Result<NetworkFile> {
    let raw: RawNetworkFile = toml::from_str(contents)?;
    NetworkFile::try_from(raw)
}

/// Load a network file from path and validate it.
///
/// This is the recommended entry point:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - an invalid `buffer_size_margin`,
///   - unknown tasks, ports and masters,
///   - out-of-range periods and sample sizes,
///   - master/slave cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<NetworkFile> {
    let raw = load_from_path(&path)?;
    let network = NetworkFile::try_from(raw)?;
    Ok(network)
}

/// `Network.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Network.toml")
}
