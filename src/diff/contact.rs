//! Contact diffs: transport-level events for the networking layer
//!
//! These do not touch the persisted model; they adjust transient connection
//! state and are observed by [`super::ContactVisitor`] implementations that
//! drive dialing and connection acceptance.

use crate::error::ModelError;
use crate::identity::DeviceId;
use crate::model::device::ConnectionState;
use crate::model::{Cluster, EntityEvent, UnknownDevice};

/// An inbound connection from a known peer awaits acceptance
pub struct ConnectRequest {
	pub device_id: DeviceId,
	pub address: String,
}

impl ConnectRequest {
	pub fn apply(&self, _cluster: &mut Cluster) -> Result<(), ModelError> {
		Ok(())
	}
}

/// Ask the dialer to try the given addresses for a peer
pub struct DialRequest {
	pub device_id: DeviceId,
	pub addresses: Vec<String>,
}

impl DialRequest {
	pub fn apply(&self, _cluster: &mut Cluster) -> Result<(), ModelError> {
		Ok(())
	}
}

/// Ask for a connection through a relay
pub struct RelayConnectRequest {
	pub device_id: DeviceId,
	pub relay_address: String,
}

impl RelayConnectRequest {
	pub fn apply(&self, _cluster: &mut Cluster) -> Result<(), ModelError> {
		Ok(())
	}
}

/// A peer's connection state changed
pub struct PeerState {
	pub device_id: DeviceId,
	pub state: ConnectionState,
	pub endpoint: Option<String>,
	pub seen_at: i64,
}

impl PeerState {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let device = cluster
			.devices
			.get_mut(&self.device_id)
			.ok_or_else(|| ModelError::NoSuchDevice { device_id: self.device_id.short() })?;
		device.state = self.state;
		device.endpoint = self.endpoint.clone();
		if self.seen_at > device.last_seen {
			device.last_seen = self.seen_at;
		}
		device.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

/// An ignored peer connected again; only the last-seen stamp moves
pub struct IgnoredConnected {
	pub device_id: DeviceId,
	pub seen_at: i64,
}

impl IgnoredConnected {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		if let Some(record) = cluster.ignored_devices.get_mut(&self.device_id) {
			record.last_seen = self.seen_at;
		}
		Ok(())
	}
}

/// A device that is neither known, pending nor ignored connected
pub struct UnknownConnected {
	pub record: UnknownDevice,
}

impl UnknownConnected {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.unknown_devices.insert(self.record.id, self.record.clone());
		Ok(())
	}
}

// vim: ts=4
