//! Folders and pending folder advertisements

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

use super::folder_info::FolderInfo;
use super::Augmentation;
use crate::identity::DeviceId;

/// Synchronization direction of a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderType {
	SendAndReceive,
	SendOnly,
	ReceiveOnly,
}

impl Default for FolderType {
	fn default() -> Self {
		FolderType::SendAndReceive
	}
}

/// Order in which missing files are pulled from peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullOrder {
	Random,
	Alphabetic,
	SmallestFirst,
	LargestFirst,
	OldestFirst,
	NewestFirst,
}

impl Default for PullOrder {
	fn default() -> Self {
		PullOrder::Random
	}
}

/// Plain folder settings, the shape diffs and the store carry around
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderSettings {
	pub id: String,
	pub label: String,
	pub path: PathBuf,
	pub folder_type: FolderType,
	pub pull_order: PullOrder,
	/// Seconds between periodic rescans
	pub rescan_interval_s: u32,
	pub read_only: bool,
	pub ignore_permissions: bool,
	pub ignore_delete: bool,
	pub disable_temp_indexes: bool,
	pub paused: bool,
	pub scheduled: bool,
}

impl FolderSettings {
	pub fn new(id: &str, label: &str, path: PathBuf) -> Self {
		FolderSettings {
			id: id.to_string(),
			label: label.to_string(),
			path,
			folder_type: FolderType::default(),
			pull_order: PullOrder::default(),
			rescan_interval_s: 3600,
			read_only: false,
			ignore_permissions: false,
			ignore_delete: false,
			disable_temp_indexes: false,
			paused: false,
			scheduled: false,
		}
	}
}

/// A synchronized folder: settings plus the per-device views
#[derive(Debug, Clone)]
pub struct Folder {
	pub key: Uuid,
	pub settings: FolderSettings,
	/// Scan suspended after an I/O error
	pub suspended: bool,
	/// A scan is currently running
	pub scanning: bool,
	/// Unix seconds of the last completed scan
	pub last_scan_s: i64,
	/// One view per device the folder is shared with, self included
	pub folder_infos: BTreeMap<DeviceId, FolderInfo>,
	pub augmentation: Augmentation,
}

impl Folder {
	pub fn new(key: Uuid, settings: FolderSettings) -> Self {
		Folder {
			key,
			settings,
			suspended: false,
			scanning: false,
			last_scan_s: 0,
			folder_infos: BTreeMap::new(),
			augmentation: Augmentation::default(),
		}
	}

	pub fn id(&self) -> &str {
		&self.settings.id
	}

	pub fn is_shared_with(&self, device: &DeviceId) -> bool {
		self.folder_infos.contains_key(device)
	}
}

/// A folder advertised by a peer but not yet accepted locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFolder {
	pub folder_id: String,
	pub label: String,
	pub device: DeviceId,
	pub last_seen: i64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_folder_defaults() {
		let settings = FolderSettings::new("1234-5678", "docs", PathBuf::from("/data/docs"));
		assert_eq!(settings.folder_type, FolderType::SendAndReceive);
		assert_eq!(settings.pull_order, PullOrder::Random);
		assert!(!settings.paused);

		let folder = Folder::new(Uuid::nil(), settings);
		assert_eq!(folder.id(), "1234-5678");
		assert!(folder.folder_infos.is_empty());
		assert!(!folder.suspended);
	}
}

// vim: ts=4
