//! Load diffs: reconstructing the cluster from the store at startup
//!
//! The loader emits a single `LoadCluster` root whose children are streaming
//! batches. Batches apply in dependency order: blocks, devices, folders
//! (with their folder-infos), then file-infos re-referencing the blocks.

use uuid::Uuid;

use crate::error::ModelError;
use crate::identity::{BlockHash, DeviceId};
use crate::model::device::Compression;
use crate::model::file_info::{Bitmap, FileInfo};
use crate::model::folder::FolderSettings;
use crate::model::folder_info::FolderInfo;
use crate::model::{Cluster, Device, Folder, IgnoredDevice, PendingDevice, PendingFolder};
use crate::proto::ProtoFileInfo;

/// Marker root of the loading tree
#[derive(Debug)]
pub struct LoadCluster;

impl LoadCluster {
	pub fn apply(&self, _cluster: &mut Cluster) -> Result<(), ModelError> {
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadedBlock {
	pub hash: BlockHash,
	pub size: u32,
	pub weak_hash: u32,
}

/// One batch of block records; refcounts are rebuilt by the file batches
#[derive(Debug)]
pub struct LoadBlocks {
	pub blocks: Vec<LoadedBlock>,
}

impl LoadBlocks {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for block in &self.blocks {
			cluster.blocks.load(block.hash, block.size, block.weak_hash);
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadedDevice {
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

#[derive(Debug)]
pub struct LoadDevices {
	pub devices: Vec<LoadedDevice>,
}

impl LoadDevices {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for loaded in &self.devices {
			// the self device exists from construction; refresh it in place
			let device = cluster
				.devices
				.entry(loaded.id)
				.or_insert_with(|| Device::new(loaded.key, loaded.id, &loaded.name));
			device.key = loaded.key;
			device.name = loaded.name.clone();
			device.client_name = loaded.client_name.clone();
			device.client_version = loaded.client_version.clone();
			device.compression = loaded.compression;
			device.addresses = loaded.addresses.clone();
			device.introducer = loaded.introducer;
			device.auto_accept = loaded.auto_accept;
			device.paused = loaded.paused;
			device.last_seen = loaded.last_seen;
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadedFolderInfo {
	pub key: Uuid,
	pub device: DeviceId,
	pub index_id: u64,
	pub max_sequence: u64,
	pub remote_index_id: u64,
	pub remote_max_sequence: u64,
}

#[derive(Debug)]
pub struct LoadedFolder {
	pub key: Uuid,
	pub settings: FolderSettings,
	pub infos: Vec<LoadedFolderInfo>,
}

#[derive(Debug)]
pub struct LoadFolders {
	pub folders: Vec<LoadedFolder>,
}

impl LoadFolders {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for loaded in &self.folders {
			let folder_id = loaded.settings.id.clone();
			if cluster.folders.contains_key(&folder_id) {
				return Err(ModelError::FolderAlreadyExists { folder_id });
			}
			let mut folder = Folder::new(loaded.key, loaded.settings.clone());
			for info in &loaded.infos {
				if !cluster.devices.contains_key(&info.device) {
					return Err(ModelError::NoSuchDevice { device_id: info.device.short() });
				}
				let mut fi = FolderInfo::new(info.key, info.device, info.index_id);
				fi.max_sequence = info.max_sequence;
				fi.remote_index_id = info.remote_index_id;
				fi.remote_max_sequence = info.remote_max_sequence;
				folder.folder_infos.insert(info.device, fi);
			}
			cluster.folders.insert(folder_id, folder);
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadedFile {
	pub folder_id: String,
	pub device: DeviceId,
	pub key: Uuid,
	pub proto: ProtoFileInfo,
	pub local_blocks: Option<Bitmap>,
}

/// One batch of file records
#[derive(Debug)]
pub struct LoadFileInfos {
	pub files: Vec<LoadedFile>,
}

impl LoadFileInfos {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for loaded in &self.files {
			let path = cluster.paths.get(&loaded.proto.name);
			for hash in loaded.proto.blocks.iter().map(|b| b.hash) {
				cluster.blocks.add_ref(&hash)?;
			}
			let mut file = FileInfo::from_proto(loaded.key, path, &loaded.proto);
			file.local_blocks = loaded.local_blocks.clone();
			let info = cluster
				.folder_info_mut(&loaded.folder_id, &loaded.device)
				.ok_or_else(|| ModelError::NoSuchFolder { folder_id: loaded.folder_id.clone() })?;
			info.files.insert(loaded.proto.name.clone(), file);
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadPendingFolders {
	pub folders: Vec<PendingFolder>,
}

impl LoadPendingFolders {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for pf in &self.folders {
			cluster.pending_folders.insert((pf.folder_id.clone(), pf.device), pf.clone());
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadPendingDevices {
	pub devices: Vec<PendingDevice>,
}

impl LoadPendingDevices {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for pd in &self.devices {
			cluster.pending_devices.insert(pd.id, pd.clone());
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct LoadIgnoredDevices {
	pub devices: Vec<IgnoredDevice>,
}

impl LoadIgnoredDevices {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for id in &self.devices {
			cluster.ignored_devices.insert(id.id, id.clone());
		}
		Ok(())
	}
}

// vim: ts=4
