//! Serialized record shapes
//!
//! Store values are length-delimited bincode encodings of these mirror
//! structs. Encoding and decoding errors carry the entity name so the
//! operator can tell which table is damaged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DbError;
use crate::identity::{BlockHash, DeviceId};
use crate::model::device::Compression;
use crate::model::file_info::Bitmap;
use crate::model::folder::FolderSettings;
use crate::proto::ProtoFileInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
	pub key: Uuid,
	pub settings: FolderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
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
	pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderInfoRecord {
	pub key: Uuid,
	pub folder_id: String,
	pub device: DeviceId,
	pub index_id: u64,
	pub max_sequence: u64,
	pub remote_index_id: u64,
	pub remote_max_sequence: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfoRecord {
	pub key: Uuid,
	pub folder_id: String,
	pub device: DeviceId,
	pub proto: ProtoFileInfo,
	pub local_blocks: Option<Bitmap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
	pub hash: BlockHash,
	pub size: u32,
	pub weak_hash: u32,
}

pub fn encode<T: Serialize>(entity: &'static str, record: &T) -> Result<Vec<u8>, DbError> {
	bincode::serialize(record)
		.map_err(|e| DbError::Serialization { entity, source: Box::new(e) })
}

pub fn decode<'a, T: Deserialize<'a>>(entity: &'static str, bytes: &'a [u8]) -> Result<T, DbError> {
	bincode::deserialize(bytes)
		.map_err(|e| DbError::Deserialization { entity, source: Box::new(e) })
}


// vim: ts=4
