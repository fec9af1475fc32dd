//! Devices and the peer records around them
//!
//! Exactly one self device exists per cluster; every other device is a peer.
//! Peers that connect without being pre-approved become pending or unknown
//! records; explicitly rejected peers become ignored records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Augmentation;
use crate::identity::DeviceId;

/// Connection lifecycle of a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
	Offline,
	Discovering,
	Connecting,
	Online,
}

impl Default for ConnectionState {
	fn default() -> Self {
		ConnectionState::Offline
	}
}

/// Compression preference advertised by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
	Metadata,
	Never,
	Always,
}

impl Default for Compression {
	fn default() -> Self {
		Compression::Metadata
	}
}

/// A device participating in the cluster
#[derive(Debug, Clone)]
pub struct Device {
	pub key: Uuid,
	pub id: DeviceId,
	pub name: String,
	pub client_name: String,
	pub client_version: String,
	pub compression: Compression,
	pub addresses: Vec<String>,
	pub introducer: bool,
	pub auto_accept: bool,
	pub paused: bool,
	pub state: ConnectionState,
	/// Unix seconds of the last contact
	pub last_seen: i64,
	/// Active endpoint while online, `host:port`
	pub endpoint: Option<String>,
	pub augmentation: Augmentation,
}

impl Device {
	pub fn new(key: Uuid, id: DeviceId, name: &str) -> Self {
		Device {
			key,
			id,
			name: name.to_string(),
			client_name: String::new(),
			client_version: String::new(),
			compression: Compression::default(),
			addresses: Vec::new(),
			introducer: false,
			auto_accept: false,
			paused: false,
			state: ConnectionState::default(),
			last_seen: 0,
			endpoint: None,
			augmentation: Augmentation::default(),
		}
	}

	pub fn is_online(&self) -> bool {
		self.state == ConnectionState::Online
	}
}

/// A peer that connected without being pre-approved, awaiting a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDevice {
	pub id: DeviceId,
	pub name: String,
	pub address: String,
	pub last_seen: i64,
}

/// A peer the operator explicitly rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredDevice {
	pub id: DeviceId,
	pub name: String,
	pub last_seen: i64,
}

/// A peer that connected, is not pre-approved and is not ignored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownDevice {
	pub id: DeviceId,
	pub name: String,
	pub client_name: String,
	pub client_version: String,
	pub last_seen: i64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_device_starts_offline() {
		let d = Device::new(Uuid::nil(), DeviceId::from_bytes([1; 32]), "laptop");
		assert_eq!(d.state, ConnectionState::Offline);
		assert!(!d.is_online());
		assert_eq!(d.name, "laptop");
	}

	#[test]
	fn test_online_state() {
		let mut d = Device::new(Uuid::nil(), DeviceId::from_bytes([1; 32]), "laptop");
		d.state = ConnectionState::Online;
		assert!(d.is_online());
	}
}

// vim: ts=4
