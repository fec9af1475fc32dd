//! Decoded Block Exchange Protocol messages
//!
//! The core consumes fully parsed messages and produces opaque byte buffers;
//! TLS and wire framing live in the transport layer. These types mirror the
//! protocol schema one to one.

use serde::{Deserialize, Serialize};

use crate::identity::{BlockHash, DeviceId};
use crate::model::version::VersionVector;

/// File classification on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtoFileType {
	File,
	Directory,
	Symlink,
}

/// One block reference of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoBlockInfo {
	pub offset: u64,
	pub size: u32,
	pub hash: BlockHash,
	pub weak_hash: u32,
}

/// A file record as announced in `Index` / `IndexUpdate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoFileInfo {
	pub name: String,
	pub file_type: ProtoFileType,
	pub size: u64,
	pub permissions: u32,
	pub modified_s: i64,
	pub modified_ns: u32,
	pub modified_by: DeviceId,
	pub deleted: bool,
	pub invalid: bool,
	pub no_permissions: bool,
	pub version: VersionVector,
	pub sequence: u64,
	pub block_size: u32,
	pub blocks: Vec<ProtoBlockInfo>,
	pub symlink_target: String,
}

impl ProtoFileInfo {
	/// Number of blocks a file of this size and block size must carry
	pub fn expected_block_count(&self) -> usize {
		if self.size == 0 || self.block_size == 0 {
			0
		} else {
			((self.size + self.block_size as u64 - 1) / self.block_size as u64) as usize
		}
	}
}

/// Per-device view of a folder inside `ClusterConfig`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoFolderDevice {
	pub id: DeviceId,
	pub name: String,
	pub addresses: Vec<String>,
	pub introducer: bool,
	pub index_id: u64,
	pub max_sequence: u64,
}

/// One folder advertised in `ClusterConfig`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoFolder {
	pub id: String,
	pub label: String,
	pub read_only: bool,
	pub ignore_permissions: bool,
	pub ignore_delete: bool,
	pub disable_temp_indexes: bool,
	pub paused: bool,
	pub devices: Vec<ProtoFolderDevice>,
}

/// Reported progress for one file download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoDownloadUpdate {
	pub name: String,
	pub version: VersionVector,
	/// Indexes of blocks the peer now holds
	pub block_indexes: Vec<u32>,
}

/// Response status for a block `Request`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtoErrorCode {
	NoError,
	Generic,
	NoSuchFile,
	InvalidFile,
}

/// Close reason, informational only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoClose {
	pub reason: String,
}

/// Every message the core consumes or produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
	Hello { device_name: String, client_name: String, client_version: String },
	ClusterConfig { folders: Vec<ProtoFolder> },
	Index { folder: String, files: Vec<ProtoFileInfo> },
	IndexUpdate { folder: String, files: Vec<ProtoFileInfo> },
	Request {
		id: u32,
		folder: String,
		name: String,
		offset: u64,
		size: u32,
		hash: BlockHash,
		from_temporary: bool,
	},
	Response { id: u32, data: Vec<u8>, code: ProtoErrorCode },
	DownloadProgress { folder: String, updates: Vec<ProtoDownloadUpdate> },
	Ping,
	Close(ProtoClose),
}

impl Message {
	/// Serialize into an opaque buffer for the transport layer
	pub fn encode(&self) -> Result<Vec<u8>, String> {
		bincode::serialize(self).map_err(|e| format!("message encoding failed: {}", e))
	}

	/// Decode a buffer produced by `encode`
	pub fn decode(buf: &[u8]) -> Result<Self, String> {
		bincode::deserialize(buf).map_err(|e| format!("message decoding failed: {}", e))
	}
}


// vim: ts=4
