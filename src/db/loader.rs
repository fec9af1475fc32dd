//! Store to cluster: the loading diff tree
//!
//! Loading is a single `LoadCluster` diff whose children are streaming
//! batches, applied in dependency order: blocks, devices, folders with
//! their folder-infos, file-infos, then the pending and ignored records.
//! Batches report through the apply-controller so a UI can show progress.

use std::collections::BTreeMap;

use super::records::{self, BlockRecord, DeviceRecord, FileInfoRecord, FolderInfoRecord, FolderRecord};
use super::{keys, Db};
use crate::diff::load::{
	LoadBlocks, LoadCluster, LoadDevices, LoadFileInfos, LoadFolders, LoadIgnoredDevices,
	LoadPendingDevices, LoadPendingFolders, LoadedBlock, LoadedDevice, LoadedFile, LoadedFolder,
	LoadedFolderInfo,
};
use crate::diff::{ApplyController, Diff, DiffKind};
use crate::error::{DbError, ModelError};
use crate::logging::*;
use crate::model::{Cluster, IgnoredDevice, PendingDevice, PendingFolder};

/// Block records per loading batch
const BLOCKS_PER_BATCH: usize = 4096;

/// File records per loading batch
const FILES_PER_BATCH: usize = 512;

/// Build the loading diff tree from everything the store holds
pub fn load_cluster_diff(db: &Db) -> Result<Diff, DbError> {
	let mut blocks = Vec::new();
	let mut devices = Vec::new();
	let mut folders = Vec::new();
	let mut folder_infos: BTreeMap<String, Vec<LoadedFolderInfo>> = BTreeMap::new();
	let mut files = Vec::new();
	let mut pending_folders = Vec::new();
	let mut pending_devices = Vec::new();
	let mut ignored_devices = Vec::new();

	for (key, value) in db.read_all()? {
		match keys::prefix_of(&key) {
			Some(keys::PREFIX_BLOCK_INFO) => {
				let record: BlockRecord = records::decode("block_info", &value)?;
				blocks.push(LoadedBlock {
					hash: record.hash,
					size: record.size,
					weak_hash: record.weak_hash,
				});
			}
			Some(keys::PREFIX_DEVICE) => {
				let record: DeviceRecord = records::decode("device", &value)?;
				devices.push(LoadedDevice {
					key: record.key,
					id: record.id,
					name: record.name,
					client_name: record.client_name,
					client_version: record.client_version,
					compression: record.compression,
					addresses: record.addresses,
					introducer: record.introducer,
					auto_accept: record.auto_accept,
					paused: record.paused,
					last_seen: record.last_seen,
				});
			}
			Some(keys::PREFIX_FOLDER) => {
				let record: FolderRecord = records::decode("folder", &value)?;
				folders.push(record);
			}
			Some(keys::PREFIX_FOLDER_INFO) => {
				let record: FolderInfoRecord = records::decode("folder_info", &value)?;
				folder_infos.entry(record.folder_id.clone()).or_default().push(
					LoadedFolderInfo {
						key: record.key,
						device: record.device,
						index_id: record.index_id,
						max_sequence: record.max_sequence,
						remote_index_id: record.remote_index_id,
						remote_max_sequence: record.remote_max_sequence,
					},
				);
			}
			Some(keys::PREFIX_FILE_INFO) => {
				let record: FileInfoRecord = records::decode("file_info", &value)?;
				files.push(LoadedFile {
					folder_id: record.folder_id,
					device: record.device,
					key: record.key,
					proto: record.proto,
					local_blocks: record.local_blocks,
				});
			}
			Some(keys::PREFIX_PENDING_FOLDER) => {
				let record: PendingFolder = records::decode("pending_folder", &value)?;
				pending_folders.push(record);
			}
			Some(keys::PREFIX_PENDING_DEVICE) => {
				let record: PendingDevice = records::decode("pending_device", &value)?;
				pending_devices.push(record);
			}
			Some(keys::PREFIX_IGNORED_DEVICE) => {
				let record: IgnoredDevice = records::decode("ignored_device", &value)?;
				ignored_devices.push(record);
			}
			_ => {
				warn!("skipping store record with unknown prefix, key len {}", key.len());
			}
		}
	}

	info!(
		"loading cluster: {} blocks, {} devices, {} folders, {} files",
		blocks.len(),
		devices.len(),
		folders.len(),
		files.len()
	);

	let mut batches: Vec<Diff> = Vec::new();
	for chunk in chunked(blocks, BLOCKS_PER_BATCH) {
		batches.push(Diff::new(DiffKind::LoadBlocks(LoadBlocks { blocks: chunk })));
	}
	batches.push(Diff::new(DiffKind::LoadDevices(LoadDevices { devices })));
	let loaded_folders = folders
		.into_iter()
		.map(|record| LoadedFolder {
			key: record.key,
			infos: folder_infos.remove(&record.settings.id).unwrap_or_default(),
			settings: record.settings,
		})
		.collect();
	batches.push(Diff::new(DiffKind::LoadFolders(LoadFolders { folders: loaded_folders })));
	for chunk in chunked(files, FILES_PER_BATCH) {
		batches.push(Diff::new(DiffKind::LoadFileInfos(LoadFileInfos { files: chunk })));
	}
	batches.push(Diff::new(DiffKind::LoadPendingFolders(LoadPendingFolders {
		folders: pending_folders,
	})));
	batches.push(Diff::new(DiffKind::LoadPendingDevices(LoadPendingDevices {
		devices: pending_devices,
	})));
	batches.push(Diff::new(DiffKind::LoadIgnoredDevices(LoadIgnoredDevices {
		devices: ignored_devices,
	})));

	let mut root = Diff::new(DiffKind::LoadCluster(LoadCluster));
	let mut chain = batches.into_iter();
	if let Some(first) = chain.next() {
		let node = root.assign_child(first);
		let mut tail: &mut Diff = node;
		for batch in chain {
			tail = tail.assign_sibling(batch);
		}
	}
	Ok(root)
}

fn chunked<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
	let mut out = Vec::new();
	let mut current = Vec::new();
	for item in items {
		current.push(item);
		if current.len() == size {
			out.push(std::mem::take(&mut current));
		}
	}
	if !current.is_empty() {
		out.push(current);
	}
	out
}

/// Controller reporting loading progress batch by batch
pub struct LoadProgress {
	applied: usize,
}

impl LoadProgress {
	pub fn new() -> Self {
		LoadProgress { applied: 0 }
	}

	pub fn applied(&self) -> usize {
		self.applied
	}
}

impl Default for LoadProgress {
	fn default() -> Self {
		LoadProgress::new()
	}
}

impl ApplyController<DiffKind> for LoadProgress {
	fn apply(&mut self, diff: &Diff, cluster: &mut Cluster) -> Result<(), ModelError> {
		match &diff.kind {
			DiffKind::LoadBlocks(batch) => {
				debug!("loading {} blocks", batch.blocks.len());
			}
			DiffKind::LoadFileInfos(batch) => {
				debug!("loading {} files", batch.files.len());
			}
			DiffKind::LoadDevices(batch) => {
				debug!("loading {} devices", batch.devices.len());
			}
			DiffKind::LoadFolders(batch) => {
				debug!("loading {} folders", batch.folders.len());
			}
			_ => {}
		}
		self.applied += 1;
		diff.apply_node(cluster, self)
	}
}

// vim: ts=4
