//! The in-memory cluster graph

use std::collections::BTreeMap;
use std::sync::Arc;

use super::block_store::BlockStore;
use super::device::{Device, IgnoredDevice, PendingDevice, UnknownDevice};
use super::folder::{Folder, PendingFolder};
use super::folder_info::FolderInfo;
use super::path::PathCache;
use crate::error::ModelError;
use crate::identity::DeviceId;

/// Everything this process knows about devices, folders and their contents.
///
/// The cluster is owned by and only mutated inside the network scheduler;
/// other schedulers send diffs. A failed diff marks the cluster tainted,
/// after which it is unsafe to persist and further mutations are refused
/// by the apply entry points.
pub struct Cluster {
	self_id: DeviceId,
	pub devices: BTreeMap<DeviceId, Device>,
	pub folders: BTreeMap<String, Folder>,
	pub pending_devices: BTreeMap<DeviceId, PendingDevice>,
	pub ignored_devices: BTreeMap<DeviceId, IgnoredDevice>,
	pub unknown_devices: BTreeMap<DeviceId, UnknownDevice>,
	/// Keyed by (folder ID, advertising device)
	pub pending_folders: BTreeMap<(String, DeviceId), PendingFolder>,
	pub blocks: BlockStore,
	pub paths: Arc<PathCache>,
	tainted: bool,
}

impl Cluster {
	/// Build a cluster around the immutable self device
	pub fn new(self_device: Device) -> Self {
		let self_id = self_device.id;
		let mut devices = BTreeMap::new();
		devices.insert(self_id, self_device);
		Cluster {
			self_id,
			devices,
			folders: BTreeMap::new(),
			pending_devices: BTreeMap::new(),
			ignored_devices: BTreeMap::new(),
			unknown_devices: BTreeMap::new(),
			pending_folders: BTreeMap::new(),
			blocks: BlockStore::new(),
			paths: PathCache::new(),
			tainted: false,
		}
	}

	pub fn self_id(&self) -> DeviceId {
		self.self_id
	}

	pub fn self_device(&self) -> &Device {
		// the self device is inserted at construction and never removed
		self.devices.get(&self.self_id).unwrap()
	}

	pub fn mark_tainted(&mut self) {
		self.tainted = true;
	}

	pub fn is_tainted(&self) -> bool {
		self.tainted
	}

	pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
		self.folders.get(folder_id)
	}

	pub fn folder_mut(&mut self, folder_id: &str) -> Option<&mut Folder> {
		self.folders.get_mut(folder_id)
	}

	/// The self device's view of a folder
	pub fn local_folder_info(&self, folder_id: &str) -> Option<&FolderInfo> {
		self.folders.get(folder_id).and_then(|f| f.folder_infos.get(&self.self_id))
	}

	pub fn local_folder_info_mut(&mut self, folder_id: &str) -> Option<&mut FolderInfo> {
		let self_id = self.self_id;
		self.folders.get_mut(folder_id).and_then(|f| f.folder_infos.get_mut(&self_id))
	}

	pub fn folder_info(&self, folder_id: &str, device: &DeviceId) -> Option<&FolderInfo> {
		self.folders.get(folder_id).and_then(|f| f.folder_infos.get(device))
	}

	pub fn folder_info_mut(
		&mut self,
		folder_id: &str,
		device: &DeviceId,
	) -> Option<&mut FolderInfo> {
		self.folders.get_mut(folder_id).and_then(|f| f.folder_infos.get_mut(device))
	}

	/// Resolve a folder by its ID or label; CLI convenience
	pub fn find_folder(&self, label_or_id: &str) -> Option<&Folder> {
		self.folders.get(label_or_id).or_else(|| {
			self.folders.values().find(|f| f.settings.label == label_or_id)
		})
	}

	/// Resolve a device by name or short-ID prefix; CLI convenience
	pub fn find_device(&self, short_or_name: &str) -> Option<&Device> {
		self.devices
			.values()
			.find(|d| d.name == short_or_name)
			.or_else(|| self.devices.values().find(|d| d.id.matches_short(short_or_name)))
	}

	pub fn folder_checked(&self, folder_id: &str) -> Result<&Folder, ModelError> {
		self.folder(folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })
	}

	/// Structural equality for replay verification: same devices, folders,
	/// folder-infos, files, blocks, version vectors and sequences.
	/// Augmentations and connection state are presentation concerns and
	/// are not compared.
	pub fn structural_eq(&self, other: &Cluster) -> bool {
		if self.self_id != other.self_id {
			return false;
		}
		if self.devices.len() != other.devices.len()
			|| !self.devices.keys().eq(other.devices.keys())
		{
			return false;
		}
		if self.pending_devices != other.pending_devices
			|| self.ignored_devices != other.ignored_devices
			|| self.unknown_devices != other.unknown_devices
			|| self.pending_folders != other.pending_folders
		{
			return false;
		}
		if self.blocks.len() != other.blocks.len()
			|| !self
				.blocks
				.iter()
				.zip(other.blocks.iter())
				.all(|((h1, e1), (h2, e2))| h1 == h2 && e1 == e2)
		{
			return false;
		}
		if self.folders.len() != other.folders.len() {
			return false;
		}
		for (id, folder) in &self.folders {
			let peer = match other.folders.get(id) {
				Some(f) => f,
				None => return false,
			};
			if folder.settings != peer.settings {
				return false;
			}
			if folder.folder_infos.len() != peer.folder_infos.len() {
				return false;
			}
			for (device, fi) in &folder.folder_infos {
				let pfi = match peer.folder_infos.get(device) {
					Some(fi) => fi,
					None => return false,
				};
				if fi.index_id != pfi.index_id || fi.max_sequence != pfi.max_sequence {
					return false;
				}
				if fi.files.len() != pfi.files.len() {
					return false;
				}
				for (name, file) in &fi.files {
					let pf = match pfi.files.get(name) {
						Some(f) => f,
						None => return false,
					};
					if file.kind != pf.kind
						|| file.size != pf.size
						|| file.block_size != pf.block_size
						|| file.permissions != pf.permissions
						|| file.modified_s != pf.modified_s
						|| file.modified_ns != pf.modified_ns
						|| file.deleted != pf.deleted
						|| file.invalid != pf.invalid
						|| file.version != pf.version
						|| file.sequence != pf.sequence
						|| file.blocks != pf.blocks
						|| file.symlink_target != pf.symlink_target
					{
						return false;
					}
				}
			}
		}
		true
	}
}


// vim: ts=4
