//! Per-(folder, device) view of a folder

use std::collections::BTreeMap;
use uuid::Uuid;

use super::file_info::FileInfo;
use crate::identity::DeviceId;

/// What one device knows about one folder.
///
/// The index ID identifies the device's index incarnation: a changed index
/// ID means the device discarded its history and a full re-sync is required.
/// The max-sequence is the monotonic counter of the last known change by
/// that device in that folder.
#[derive(Debug, Clone)]
pub struct FolderInfo {
	pub key: Uuid,
	pub device: DeviceId,
	pub index_id: u64,
	pub max_sequence: u64,
	/// The index ID the device last acknowledged of our view
	pub remote_index_id: u64,
	/// The sequence the device last acknowledged of our view
	pub remote_max_sequence: u64,
	/// Files of this view, keyed by their full path name
	pub files: BTreeMap<String, FileInfo>,
}

impl FolderInfo {
	pub fn new(key: Uuid, device: DeviceId, index_id: u64) -> Self {
		FolderInfo {
			key,
			device,
			index_id,
			max_sequence: 0,
			remote_index_id: 0,
			remote_max_sequence: 0,
			files: BTreeMap::new(),
		}
	}

	/// Advance and return the next sequence number. A file becoming the
	/// newest is stamped with exactly this value.
	pub fn advance_sequence(&mut self) -> u64 {
		self.max_sequence += 1;
		self.max_sequence
	}

	pub fn file(&self, name: &str) -> Option<&FileInfo> {
		self.files.get(name)
	}

	pub fn file_mut(&mut self, name: &str) -> Option<&mut FileInfo> {
		self.files.get_mut(name)
	}
}


// vim: ts=4
