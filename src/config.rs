//! Daemon configuration
//!
//! A single TOML file with one section per subsystem. Loading follows the
//! chain: built-in defaults, then the config file, with the config
//! directory overridable through `SYNCSPIRIT_CONFIG_DIR`. Every numeric
//! option is validated strictly positive at startup; a bad value aborts
//! the process before anything touches the store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Default request timeout, milliseconds
	pub timeout: u32,
	pub device_name: String,
	pub hasher_threads: u32,
	/// Where new folders land unless a path is given
	pub default_location: PathBuf,
	pub cert_file: PathBuf,
	pub key_file: PathBuf,
	pub bep: BepConfig,
	pub db: DbConfig,
	pub dialer: DialerConfig,
	pub fs: FsConfig,
	pub global_discovery: GlobalDiscoveryConfig,
	pub local_discovery: LocalDiscoveryConfig,
	pub relay: RelayConfig,
	pub upnp: UpnpConfig,
	pub log: LogConfig,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			timeout: 5000,
			device_name: default_device_name(),
			hasher_threads: 3,
			default_location: PathBuf::from("."),
			cert_file: PathBuf::from("cert.der"),
			key_file: PathBuf::from("key.der"),
			bep: BepConfig::default(),
			db: DbConfig::default(),
			dialer: DialerConfig::default(),
			fs: FsConfig::default(),
			global_discovery: GlobalDiscoveryConfig::default(),
			local_discovery: LocalDiscoveryConfig::default(),
			relay: RelayConfig::default(),
			upnp: UpnpConfig::default(),
			log: LogConfig::default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BepConfig {
	pub rx_buff_size: u32,
	pub connect_timeout: u32,
	pub request_timeout: u32,
	pub tx_timeout: u32,
	pub rx_timeout: u32,
	pub blocks_max_requested: u32,
}

impl Default for BepConfig {
	fn default() -> Self {
		BepConfig {
			rx_buff_size: 16 * 1024 * 1024,
			connect_timeout: 5000,
			request_timeout: 60_000,
			tx_timeout: 90_000,
			rx_timeout: 300_000,
			blocks_max_requested: 16,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
	/// Transaction flush threshold, bytes
	pub upper_limit: u64,
	/// Diffs per store transaction before flushing
	pub uncommitted_threshold: u32,
}

impl Default for DbConfig {
	fn default() -> Self {
		DbConfig { upper_limit: 64 * 1024 * 1024, uncommitted_threshold: 150 }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialerConfig {
	pub enabled: bool,
	/// Milliseconds before a disconnected peer is redialed
	pub redial_timeout: u32,
}

impl Default for DialerConfig {
	fn default() -> Self {
		DialerConfig { enabled: true, redial_timeout: 5 * 60_000 }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
	/// Bound of the open block-descriptor pool
	pub mru_size: u32,
	pub files_scan_iteration_limit: u32,
	pub bytes_scan_iteration_limit: u64,
	/// Global bound on outstanding block hashes
	pub concurrent_hashes_limit: u32,
}

impl Default for FsConfig {
	fn default() -> Self {
		FsConfig {
			mru_size: 128,
			files_scan_iteration_limit: 64,
			bytes_scan_iteration_limit: 16 * 1024 * 1024,
			concurrent_hashes_limit: 256,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalDiscoveryConfig {
	pub enabled: bool,
	pub debug: bool,
	pub announce_url: String,
	pub lookup_url: String,
	pub cert_file: PathBuf,
	pub key_file: PathBuf,
	pub rx_buff_size: u32,
	pub timeout: u32,
	pub reannounce_after: u32,
}

impl Default for GlobalDiscoveryConfig {
	fn default() -> Self {
		GlobalDiscoveryConfig {
			enabled: true,
			debug: false,
			announce_url: "https://discovery.syncthing.net/v2/".to_string(),
			lookup_url: "https://discovery.syncthing.net/v2/".to_string(),
			cert_file: PathBuf::from("cert.der"),
			key_file: PathBuf::from("key.der"),
			rx_buff_size: 32 * 1024,
			timeout: 4000,
			reannounce_after: 600,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalDiscoveryConfig {
	pub enabled: bool,
	pub port: u16,
	/// Broadcast interval, seconds
	pub frequency: u32,
}

impl Default for LocalDiscoveryConfig {
	fn default() -> Self {
		LocalDiscoveryConfig { enabled: true, port: 21027, frequency: 10 }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
	pub enabled: bool,
	pub discovery_url: String,
	pub rx_buff_size: u32,
}

impl Default for RelayConfig {
	fn default() -> Self {
		RelayConfig {
			enabled: true,
			discovery_url: "https://relays.syncthing.net/endpoint".to_string(),
			rx_buff_size: 1024 * 1024,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpnpConfig {
	pub enabled: bool,
	pub debug: bool,
	pub max_wait: u32,
	pub external_port: u16,
	pub rx_buff_size: u32,
}

impl Default for UpnpConfig {
	fn default() -> Self {
		UpnpConfig {
			enabled: true,
			debug: false,
			max_wait: 1,
			external_port: 22001,
			rx_buff_size: 64 * 1024,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
	pub level: String,
	pub sinks: Vec<String>,
}

impl Default for LogConfig {
	fn default() -> Self {
		LogConfig { level: "info".to_string(), sinks: vec!["stderr".to_string()] }
	}
}

impl Config {
	/// Load from `path`, falling back to defaults when the file is absent
	pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
		let config = if path.exists() {
			let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
				path: path.display().to_string(),
				source: e,
			})?;
			toml::from_str(&contents)
				.map_err(|e| ConfigError::Parse { message: e.to_string() })?
		} else {
			Config::default()
		};
		config.validate()?;
		Ok(config)
	}

	/// Every numeric option must be strictly positive
	pub fn validate(&self) -> Result<(), ConfigError> {
		let positive = |key: &'static str, value: u64| {
			if value == 0 {
				Err(ConfigError::InvalidValue { key, message: "must be positive".to_string() })
			} else {
				Ok(())
			}
		};
		positive("timeout", self.timeout as u64)?;
		positive("hasher_threads", self.hasher_threads as u64)?;
		positive("bep.rx_buff_size", self.bep.rx_buff_size as u64)?;
		positive("bep.connect_timeout", self.bep.connect_timeout as u64)?;
		positive("bep.request_timeout", self.bep.request_timeout as u64)?;
		positive("bep.tx_timeout", self.bep.tx_timeout as u64)?;
		positive("bep.rx_timeout", self.bep.rx_timeout as u64)?;
		positive("bep.blocks_max_requested", self.bep.blocks_max_requested as u64)?;
		positive("db.upper_limit", self.db.upper_limit)?;
		positive("db.uncommitted_threshold", self.db.uncommitted_threshold as u64)?;
		positive("dialer.redial_timeout", self.dialer.redial_timeout as u64)?;
		positive("fs.mru_size", self.fs.mru_size as u64)?;
		positive("fs.files_scan_iteration_limit", self.fs.files_scan_iteration_limit as u64)?;
		positive("fs.bytes_scan_iteration_limit", self.fs.bytes_scan_iteration_limit)?;
		positive("fs.concurrent_hashes_limit", self.fs.concurrent_hashes_limit as u64)?;
		positive("global_discovery.rx_buff_size", self.global_discovery.rx_buff_size as u64)?;
		positive("global_discovery.timeout", self.global_discovery.timeout as u64)?;
		positive(
			"global_discovery.reannounce_after",
			self.global_discovery.reannounce_after as u64,
		)?;
		positive("local_discovery.port", self.local_discovery.port as u64)?;
		positive("local_discovery.frequency", self.local_discovery.frequency as u64)?;
		positive("relay.rx_buff_size", self.relay.rx_buff_size as u64)?;
		positive("upnp.max_wait", self.upnp.max_wait as u64)?;
		positive("upnp.external_port", self.upnp.external_port as u64)?;
		positive("upnp.rx_buff_size", self.upnp.rx_buff_size as u64)?;
		Ok(())
	}
}

/// Resolve the config directory: `SYNCSPIRIT_CONFIG_DIR` wins, then
/// `$HOME/.config/bepsync`, then the working directory.
pub fn config_dir() -> PathBuf {
	if let Ok(dir) = env::var("SYNCSPIRIT_CONFIG_DIR") {
		return PathBuf::from(dir);
	}
	match env::var("HOME") {
		Ok(home) => PathBuf::from(home).join(".config").join("bepsync"),
		Err(_) => PathBuf::from("."),
	}
}

fn default_device_name() -> String {
	env::var("HOSTNAME").unwrap_or_else(|_| "bepsync".to_string())
}


// vim: ts=4
