//! Mutation diffs for folders, devices, files and blocks

use std::collections::BTreeMap;
use uuid::Uuid;

use super::{Diff, DiffKind};
use crate::error::ModelError;
use crate::identity::{BlockHash, DeviceId};
use crate::model::device::Compression;
use crate::model::file_info::FileInfo;
use crate::model::folder::FolderSettings;
use crate::model::folder_info::FolderInfo;
use crate::model::version::VersionVector;
use crate::model::{Cluster, Device, EntityEvent, Folder, IgnoredDevice, PendingDevice, UnknownDevice};
use crate::proto::{ProtoBlockInfo, ProtoFileInfo};
use crate::sequencer::Sequencer;

/// Chain a list of diffs into one sibling chain, returning its head
pub(super) fn chain(mut diffs: Vec<Diff>) -> Option<Diff> {
	if diffs.is_empty() {
		return None;
	}
	let mut head = diffs.remove(0);
	for diff in diffs {
		head.assign_sibling(diff);
	}
	Some(head)
}

/// Plan the reference changes a file content change implies.
///
/// Returns the prerequisite diffs counting the new list's references
/// (`AppendBlock` for hashes unknown to the store, `CloneBlock` otherwise)
/// and the hashes whose refcount reaches zero once the old references are
/// dropped. The caller attaches the former as children and the latter as a
/// trailing `RemoveBlocks` sibling, so persistence observes the whole
/// reference turnover inside one transaction.
pub(super) fn plan_block_refs(
	cluster: &Cluster,
	old_blocks: &[BlockHash],
	new_blocks: &[ProtoBlockInfo],
) -> (Vec<Diff>, Vec<BlockHash>) {
	let mut children = Vec::new();
	let mut appended: Vec<BlockHash> = Vec::new();
	for block in new_blocks {
		let known =
			cluster.blocks.contains(&block.hash) || appended.iter().any(|h| *h == block.hash);
		if known {
			children.push(Diff::new(DiffKind::CloneBlock(CloneBlock { hash: block.hash })));
		} else {
			appended.push(block.hash);
			children.push(Diff::new(DiffKind::AppendBlock(AppendBlock {
				hash: block.hash,
				size: block.size,
				weak_hash: block.weak_hash,
			})));
		}
	}

	let mut delta: BTreeMap<BlockHash, i64> = BTreeMap::new();
	for block in new_blocks {
		*delta.entry(block.hash).or_insert(0) += 1;
	}
	for hash in old_blocks {
		*delta.entry(*hash).or_insert(0) -= 1;
	}
	let mut removed = Vec::new();
	for hash in old_blocks {
		if removed.contains(hash) {
			continue;
		}
		let current = cluster.blocks.get(hash).map(|e| e.refcount as i64).unwrap_or(0);
		if current + delta.get(hash).copied().unwrap_or(0) == 0 {
			removed.push(*hash);
		}
	}
	(children, removed)
}

/// Attach planned children and the orphan sweep to a diff root
pub(super) fn attach_block_plan(root: &mut Diff, children: Vec<Diff>, removed: Vec<BlockHash>) {
	if let Some(child_chain) = chain(children) {
		root.assign_child(child_chain);
	}
	if !removed.is_empty() {
		root.assign_sibling(Diff::new(DiffKind::RemoveBlocks(RemoveBlocks { hashes: removed })));
	}
}

#[derive(Debug)]
pub struct CreateFolder {
	pub key: Uuid,
	pub settings: FolderSettings,
	pub self_info_key: Uuid,
	pub index_id: u64,
}

impl CreateFolder {
	pub fn create(sequencer: &mut Sequencer, settings: FolderSettings) -> Diff {
		Diff::new(DiffKind::CreateFolder(CreateFolder {
			key: sequencer.next_uuid(),
			settings,
			self_info_key: sequencer.next_uuid(),
			index_id: sequencer.next_u64(),
		}))
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder_id = self.settings.id.clone();
		if cluster.folders.contains_key(&folder_id) {
			return Err(ModelError::FolderAlreadyExists { folder_id });
		}
		let self_id = cluster.self_id();
		let mut folder = Folder::new(self.key, self.settings.clone());
		folder
			.folder_infos
			.insert(self_id, FolderInfo::new(self.self_info_key, self_id, self.index_id));
		cluster.folders.insert(folder_id, folder);
		Ok(())
	}
}

#[derive(Debug)]
pub struct UpsertFolder {
	pub settings: FolderSettings,
}

impl UpsertFolder {
	/// Replaces the folder settings. Scan suspension and reachability are
	/// separate diff kinds and stay untouched.
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folder_mut(&self.settings.id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.settings.id.clone() })?;
		folder.settings = self.settings.clone();
		folder.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

#[derive(Debug)]
pub struct UpsertFolderInfo {
	pub folder_id: String,
	pub device: DeviceId,
	pub key: Uuid,
	pub index_id: u64,
	pub max_sequence: u64,
}

impl UpsertFolderInfo {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		if !cluster.devices.contains_key(&self.device) {
			return Err(ModelError::NoSuchDevice { device_id: self.device.short() });
		}
		let folder = cluster
			.folder_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		let info = folder
			.folder_infos
			.entry(self.device)
			.or_insert_with(|| FolderInfo::new(self.key, self.device, self.index_id));
		info.index_id = self.index_id;
		info.max_sequence = self.max_sequence;
		Ok(())
	}
}

#[derive(Debug)]
pub struct RemoveFolder {
	pub folder_id: String,
}

impl RemoveFolder {
	pub fn create(cluster: &Cluster, folder_id: &str) -> Result<Diff, ModelError> {
		let folder = cluster.folder_checked(folder_id)?;
		let removed = orphans_after_dropping(cluster, folder.folder_infos.values());
		let mut diff =
			Diff::new(DiffKind::RemoveFolder(RemoveFolder { folder_id: folder_id.to_string() }));
		if !removed.is_empty() {
			diff.assign_sibling(Diff::new(DiffKind::RemoveBlocks(RemoveBlocks {
				hashes: removed,
			})));
		}
		Ok(diff)
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folders
			.remove(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		for info in folder.folder_infos.values() {
			for file in info.files.values() {
				for hash in &file.blocks {
					cluster.blocks.remove_ref(hash)?;
				}
			}
		}
		folder.augmentation.notify(EntityEvent::Deleted);
		Ok(())
	}
}

#[derive(Debug)]
pub struct ShareFolder {
	pub folder_id: String,
	pub device: DeviceId,
	pub key: Uuid,
	pub index_id: u64,
}

impl ShareFolder {
	pub fn create(
		cluster: &Cluster,
		sequencer: &mut Sequencer,
		folder_id: &str,
		device: DeviceId,
	) -> Result<Diff, ModelError> {
		let folder = cluster.folder_checked(folder_id)?;
		if !cluster.devices.contains_key(&device) {
			return Err(ModelError::NoSuchDevice { device_id: device.short() });
		}
		if folder.is_shared_with(&device) {
			return Err(ModelError::FolderAlreadyShared {
				folder_id: folder_id.to_string(),
				device_id: device.short(),
			});
		}
		Ok(Diff::new(DiffKind::ShareFolder(ShareFolder {
			folder_id: folder_id.to_string(),
			device,
			key: sequencer.next_uuid(),
			index_id: sequencer.next_u64(),
		})))
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		if !cluster.devices.contains_key(&self.device) {
			return Err(ModelError::NoSuchDevice { device_id: self.device.short() });
		}
		cluster.pending_folders.remove(&(self.folder_id.clone(), self.device));
		let folder = cluster
			.folder_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		if folder.folder_infos.contains_key(&self.device) {
			return Err(ModelError::FolderAlreadyShared {
				folder_id: self.folder_id.clone(),
				device_id: self.device.short(),
			});
		}
		folder
			.folder_infos
			.insert(self.device, FolderInfo::new(self.key, self.device, self.index_id));
		folder.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

#[derive(Debug)]
pub struct UnshareFolder {
	pub folder_id: String,
	pub device: DeviceId,
}

impl UnshareFolder {
	pub fn create(
		cluster: &Cluster,
		folder_id: &str,
		device: DeviceId,
	) -> Result<Diff, ModelError> {
		let folder = cluster.folder_checked(folder_id)?;
		let info = folder
			.folder_infos
			.get(&device)
			.ok_or_else(|| ModelError::NoSuchDevice { device_id: device.short() })?;
		let removed = orphans_after_dropping(cluster, std::iter::once(info));
		let mut diff = Self::create_bare(folder_id, device);
		if !removed.is_empty() {
			diff.assign_sibling(Diff::new(DiffKind::RemoveBlocks(RemoveBlocks {
				hashes: removed,
			})));
		}
		Ok(diff)
	}

	/// Variant without the orphan sweep; `RemovePeer` plans the sweep over
	/// all unshared folders at once.
	pub(super) fn create_bare(folder_id: &str, device: DeviceId) -> Diff {
		Diff::new(DiffKind::UnshareFolder(UnshareFolder {
			folder_id: folder_id.to_string(),
			device,
		}))
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folders
			.get_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		let info = folder
			.folder_infos
			.remove(&self.device)
			.ok_or_else(|| ModelError::NoSuchDevice { device_id: self.device.short() })?;
		for file in info.files.values() {
			for hash in &file.blocks {
				cluster.blocks.remove_ref(hash)?;
			}
		}
		Ok(())
	}
}

/// Upsert a peer device record. New peers get a fresh key; known peers keep
/// their key and connection state.
#[derive(Debug)]
pub struct UpdatePeer {
	pub key: Uuid,
	pub device_id: DeviceId,
	pub name: String,
	pub addresses: Vec<String>,
	pub compression: Compression,
	pub introducer: bool,
	pub auto_accept: bool,
	pub paused: bool,
}

impl UpdatePeer {
	pub fn create(
		cluster: &Cluster,
		sequencer: &mut Sequencer,
		device_id: DeviceId,
		name: &str,
	) -> Diff {
		let key = cluster
			.devices
			.get(&device_id)
			.map(|d| d.key)
			.unwrap_or_else(|| sequencer.next_uuid());
		let mut root = Diff::new(DiffKind::UpdatePeer(UpdatePeer {
			key,
			device_id,
			name: name.to_string(),
			addresses: Vec::new(),
			compression: Compression::default(),
			introducer: false,
			auto_accept: false,
			paused: false,
		}));
		// accepting a peer settles its pending / unknown records
		let mut cleanups = Vec::new();
		if cluster.pending_devices.contains_key(&device_id) {
			cleanups.push(Diff::new(DiffKind::RemovePendingDevice(RemovePendingDevice {
				device_id,
			})));
		}
		if cluster.unknown_devices.contains_key(&device_id) {
			cleanups.push(Diff::new(DiffKind::RemoveUnknownDevice(RemoveUnknownDevice {
				device_id,
			})));
		}
		if let Some(cleanup_chain) = chain(cleanups) {
			root.assign_child(cleanup_chain);
		}
		root
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let device = cluster
			.devices
			.entry(self.device_id)
			.or_insert_with(|| Device::new(self.key, self.device_id, &self.name));
		device.name = self.name.clone();
		device.addresses = self.addresses.clone();
		device.compression = self.compression;
		device.introducer = self.introducer;
		device.auto_accept = self.auto_accept;
		device.paused = self.paused;
		device.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

#[derive(Debug)]
pub struct RemovePeer {
	pub device_id: DeviceId,
}

impl RemovePeer {
	pub fn create(cluster: &Cluster, device_id: DeviceId) -> Result<Diff, ModelError> {
		if device_id == cluster.self_id() {
			return Err(ModelError::InvalidDeviceId { input: device_id.short() });
		}
		if !cluster.devices.contains_key(&device_id) {
			return Err(ModelError::NoSuchDevice { device_id: device_id.short() });
		}
		let shared: Vec<&FolderInfo> = cluster
			.folders
			.values()
			.filter_map(|f| f.folder_infos.get(&device_id))
			.collect();
		let removed = orphans_after_dropping(cluster, shared.into_iter());
		let unshares: Vec<Diff> = cluster
			.folders
			.values()
			.filter(|f| f.is_shared_with(&device_id))
			.map(|f| UnshareFolder::create_bare(f.id(), device_id))
			.collect();
		let mut root = Diff::new(DiffKind::RemovePeer(RemovePeer { device_id }));
		if let Some(unshare_chain) = chain(unshares) {
			root.assign_child(unshare_chain);
		}
		if !removed.is_empty() {
			root.assign_sibling(Diff::new(DiffKind::RemoveBlocks(RemoveBlocks {
				hashes: removed,
			})));
		}
		Ok(root)
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		if self.device_id == cluster.self_id() {
			return Err(ModelError::InvalidDeviceId { input: self.device_id.short() });
		}
		let device = cluster
			.devices
			.remove(&self.device_id)
			.ok_or_else(|| ModelError::NoSuchDevice { device_id: self.device_id.short() })?;
		cluster.pending_folders.retain(|(_, dev), _| *dev != self.device_id);
		device.augmentation.notify(EntityEvent::Deleted);
		Ok(())
	}
}

#[derive(Debug)]
pub struct AddIgnoredDevice {
	pub record: IgnoredDevice,
}

impl AddIgnoredDevice {
	pub fn create(cluster: &Cluster, record: IgnoredDevice) -> Diff {
		let device_id = record.id;
		let mut root = Diff::new(DiffKind::AddIgnoredDevice(AddIgnoredDevice { record }));
		let mut cleanups = Vec::new();
		if cluster.pending_devices.contains_key(&device_id) {
			cleanups.push(Diff::new(DiffKind::RemovePendingDevice(RemovePendingDevice {
				device_id,
			})));
		}
		if cluster.unknown_devices.contains_key(&device_id) {
			cleanups.push(Diff::new(DiffKind::RemoveUnknownDevice(RemoveUnknownDevice {
				device_id,
			})));
		}
		if let Some(cleanup_chain) = chain(cleanups) {
			root.assign_child(cleanup_chain);
		}
		root
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.ignored_devices.insert(self.record.id, self.record.clone());
		Ok(())
	}
}

#[derive(Debug)]
pub struct AddPendingDevice {
	pub record: PendingDevice,
}

impl AddPendingDevice {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		if cluster.devices.contains_key(&self.record.id) {
			return Err(ModelError::DeviceAlreadyExists { device_id: self.record.id.short() });
		}
		cluster.pending_devices.insert(self.record.id, self.record.clone());
		Ok(())
	}
}

#[derive(Debug)]
pub struct RemovePendingDevice {
	pub device_id: DeviceId,
}

impl RemovePendingDevice {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.pending_devices.remove(&self.device_id);
		Ok(())
	}
}

#[derive(Debug)]
pub struct AddUnknownDevice {
	pub record: UnknownDevice,
}

impl AddUnknownDevice {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.unknown_devices.insert(self.record.id, self.record.clone());
		Ok(())
	}
}

#[derive(Debug)]
pub struct RemoveUnknownDevice {
	pub device_id: DeviceId,
}

impl RemoveUnknownDevice {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.unknown_devices.remove(&self.device_id);
		Ok(())
	}
}

/// Install a file record in the local view. Allocates when the name is new,
/// replaces contents preserving the key otherwise.
#[derive(Debug)]
pub struct NewFile {
	pub folder_id: String,
	pub key: Uuid,
	pub proto: ProtoFileInfo,
	/// Block references held before this diff, dropped on apply
	pub prior_blocks: Vec<BlockHash>,
}

impl NewFile {
	pub fn create(
		cluster: &Cluster,
		sequencer: &mut Sequencer,
		folder_id: &str,
		proto: ProtoFileInfo,
	) -> Result<Diff, ModelError> {
		let info = cluster
			.local_folder_info(folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;
		let existing = info.file(&proto.name);
		let key = existing.map(|f| f.key).unwrap_or_else(|| sequencer.next_uuid());
		let prior_blocks = existing.map(|f| f.blocks.clone()).unwrap_or_default();
		let (children, removed) = plan_block_refs(cluster, &prior_blocks, &proto.blocks);
		let mut root = Diff::new(DiffKind::NewFile(NewFile {
			folder_id: folder_id.to_string(),
			key,
			proto,
			prior_blocks,
		}));
		attach_block_plan(&mut root, children, removed);
		Ok(root)
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		install_local_file(cluster, &self.folder_id, self.key, &self.proto, &self.prior_blocks, None)
	}
}

/// Record a local content change of an already-known file. The version
/// vector is bumped one above its previous maximum for the self device.
#[derive(Debug)]
pub struct LocalUpdate {
	pub folder_id: String,
	pub key: Uuid,
	pub proto: ProtoFileInfo,
	pub prior_blocks: Vec<BlockHash>,
	pub prior_version: VersionVector,
}

impl LocalUpdate {
	pub fn create(
		cluster: &Cluster,
		folder_id: &str,
		proto: ProtoFileInfo,
	) -> Result<Diff, ModelError> {
		let info = cluster
			.local_folder_info(folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;
		let existing = info.file(&proto.name).ok_or_else(|| ModelError::NoSuchFile {
			folder_id: folder_id.to_string(),
			name: proto.name.clone(),
		})?;
		let key = existing.key;
		let prior_blocks = existing.blocks.clone();
		let prior_version = existing.version.clone();
		let (children, removed) = plan_block_refs(cluster, &prior_blocks, &proto.blocks);
		let mut root = Diff::new(DiffKind::LocalUpdate(LocalUpdate {
			folder_id: folder_id.to_string(),
			key,
			proto,
			prior_blocks,
			prior_version,
		}));
		attach_block_plan(&mut root, children, removed);
		Ok(root)
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let self_id = cluster.self_id();
		let mut version = self.prior_version.clone();
		version.bump(self_id);
		install_local_file(
			cluster,
			&self.folder_id,
			self.key,
			&self.proto,
			&self.prior_blocks,
			Some(version),
		)
	}
}

/// Shared installer for the local view: drops prior references, stamps the
/// next sequence and rebuilds the availability bitmap.
fn install_local_file(
	cluster: &mut Cluster,
	folder_id: &str,
	key: Uuid,
	proto: &ProtoFileInfo,
	prior_blocks: &[BlockHash],
	version_override: Option<VersionVector>,
) -> Result<(), ModelError> {
	for hash in prior_blocks {
		cluster.blocks.remove_ref(hash)?;
	}
	let self_id = cluster.self_id();
	let path = cluster.paths.get(&proto.name);
	let info = cluster
		.local_folder_info_mut(folder_id)
		.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;
	let sequence = info.advance_sequence();
	let mut file = FileInfo::from_proto(key, path, proto);
	file.sequence = sequence;
	file.modified_by = self_id;
	file.version = match version_override {
		Some(version) => version,
		None if proto.version.is_empty() => {
			let mut version = VersionVector::new();
			version.bump(self_id);
			version
		}
		None => proto.version.clone(),
	};
	// the availability bitmap is rebuilt even when the block list did not
	// change; local content is on disk, so every bit is set
	file.reset_availability(true);
	if let Some(old) = info.files.remove(&proto.name) {
		file.augmentation = old.augmentation;
	}
	file.augmentation.notify(EntityEvent::Updated);
	info.files.insert(proto.name.clone(), file);
	Ok(())
}

/// Lock or unlock a file while a transfer touches it
#[derive(Debug)]
pub struct LockFile {
	pub folder_id: String,
	pub device: DeviceId,
	pub name: String,
	pub locked: bool,
}

impl LockFile {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder_id = self.folder_id.clone();
		let file = cluster
			.folder_info_mut(&self.folder_id, &self.device)
			.and_then(|info| info.file_mut(&self.name))
			.ok_or_else(|| ModelError::NoSuchFile { folder_id, name: self.name.clone() })?;
		file.locked = self.locked;
		Ok(())
	}
}

/// Restore or revoke reachability of a local file after I/O trouble
#[derive(Debug)]
pub struct MarkReachable {
	pub folder_id: String,
	pub name: String,
	pub reachable: bool,
}

impl MarkReachable {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder_id = self.folder_id.clone();
		let file = cluster
			.local_folder_info_mut(&self.folder_id)
			.and_then(|info| info.file_mut(&self.name))
			.ok_or_else(|| ModelError::NoSuchFile { folder_id, name: self.name.clone() })?;
		file.unreachable = !self.reachable;
		file.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

/// Pause or resume scanning of a folder after an I/O error
#[derive(Debug)]
pub struct SuspendFolder {
	pub folder_id: String,
	pub suspended: bool,
	pub reason: Option<String>,
}

impl SuspendFolder {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folder_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		folder.suspended = self.suspended;
		folder.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

/// Introduce a new block into the content store with one reference
#[derive(Debug)]
pub struct AppendBlock {
	pub hash: BlockHash,
	pub size: u32,
	pub weak_hash: u32,
}

impl AppendBlock {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.blocks.put(self.hash, self.size, self.weak_hash);
		Ok(())
	}
}

/// Add one reference to an existing block
#[derive(Debug)]
pub struct CloneBlock {
	pub hash: BlockHash,
}

impl CloneBlock {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.blocks.add_ref(&self.hash)
	}
}

/// Drop fully orphaned blocks from the content store
#[derive(Debug)]
pub struct RemoveBlocks {
	pub hashes: Vec<BlockHash>,
}

impl RemoveBlocks {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		cluster.blocks.remove(&self.hashes);
		Ok(())
	}
}

/// Refresh the advertised addresses of a device
#[derive(Debug)]
pub struct UpdateContact {
	pub device_id: DeviceId,
	pub addresses: Vec<String>,
	pub seen_at: i64,
}

impl UpdateContact {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let device = cluster
			.devices
			.get_mut(&self.device_id)
			.ok_or_else(|| ModelError::NoSuchDevice { device_id: self.device_id.short() })?;
		device.addresses = self.addresses.clone();
		device.last_seen = self.seen_at;
		Ok(())
	}
}

/// Orphans that appear once every block reference of `infos` is dropped
fn orphans_after_dropping<'a, I>(cluster: &Cluster, infos: I) -> Vec<BlockHash>
where
	I: Iterator<Item = &'a FolderInfo>,
{
	let mut dropped: BTreeMap<BlockHash, u32> = BTreeMap::new();
	for info in infos {
		for file in info.files.values() {
			for hash in &file.blocks {
				*dropped.entry(*hash).or_insert(0) += 1;
			}
		}
	}
	dropped
		.into_iter()
		.filter(|(hash, count)| {
			cluster.blocks.get(hash).map(|e| e.refcount == *count).unwrap_or(false)
		})
		.map(|(hash, _)| hash)
		.collect()
}

// vim: ts=4
