//! Peer diffs: absorbing `ClusterConfig` and `Index`/`IndexUpdate` messages

use std::collections::BTreeMap;
use uuid::Uuid;

use super::modify::{attach_block_plan, plan_block_refs, RemoveBlocks};
use super::{Diff, DiffKind};
use crate::error::ModelError;
use crate::identity::{BlockHash, DeviceId};
use crate::model::file_info::FileInfo;
use crate::model::version::VersionOrder;
use crate::model::{Cluster, EntityEvent, PendingFolder};
use crate::proto::{ProtoFileInfo, ProtoFolder};
use crate::sequencer::Sequencer;

/// Absorb a peer's `ClusterConfig`.
///
/// For every advertised folder the peer shares with us, the stored
/// folder-info is checked against the peer's own entry: a changed index ID
/// drops every peer file record before new ones are accepted, a max-sequence
/// going backward is an error. The peer's entry for the self device records
/// what the peer has acknowledged of our index, which drives the updates
/// streamer. Folders we do not share become pending records.
#[derive(Debug)]
pub struct ClusterUpdate {
	pub device: DeviceId,
	pub folders: Vec<ProtoFolder>,
	pub seen_at: i64,
}

impl ClusterUpdate {
	pub fn create(
		cluster: &Cluster,
		device: DeviceId,
		folders: Vec<ProtoFolder>,
		seen_at: i64,
	) -> Result<Diff, ModelError> {
		if !cluster.devices.contains_key(&device) {
			return Err(ModelError::NoSuchDevice { device_id: device.short() });
		}
		// blocks orphaned by index resets are swept in the same transaction
		let mut dropped: BTreeMap<BlockHash, u32> = BTreeMap::new();
		for advertised in &folders {
			let info = match cluster.folder_info(&advertised.id, &device) {
				Some(info) => info,
				None => continue,
			};
			let peer_entry = advertised.devices.iter().find(|d| d.id == device);
			if let Some(entry) = peer_entry {
				if entry.index_id != info.index_id {
					for file in info.files.values() {
						for hash in &file.blocks {
							*dropped.entry(*hash).or_insert(0) += 1;
						}
					}
				}
			}
		}
		let removed: Vec<BlockHash> = dropped
			.into_iter()
			.filter(|(hash, count)| {
				cluster.blocks.get(hash).map(|e| e.refcount == *count).unwrap_or(false)
			})
			.map(|(hash, _)| hash)
			.collect();

		let mut root =
			Diff::new(DiffKind::ClusterUpdate(ClusterUpdate { device, folders, seen_at }));
		if !removed.is_empty() {
			root.assign_sibling(Diff::new(DiffKind::RemoveBlocks(RemoveBlocks {
				hashes: removed,
			})));
		}
		Ok(root)
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let self_id = cluster.self_id();
		for advertised in &self.folders {
			let shared = cluster
				.folder(&advertised.id)
				.map(|f| f.is_shared_with(&self.device))
				.unwrap_or(false);
			if !shared {
				cluster.pending_folders.insert(
					(advertised.id.clone(), self.device),
					PendingFolder {
						folder_id: advertised.id.clone(),
						label: advertised.label.clone(),
						device: self.device,
						last_seen: self.seen_at,
					},
				);
				continue;
			}

			let peer_entry = advertised.devices.iter().find(|d| d.id == self.device).cloned();
			let self_entry = advertised.devices.iter().find(|d| d.id == self_id).cloned();

			let missing = || ModelError::NoSuchFolder { folder_id: advertised.id.clone() };
			if let Some(entry) = &peer_entry {
				let info =
					cluster.folder_info(&advertised.id, &self.device).ok_or_else(missing)?;
				if entry.index_id != info.index_id {
					// the peer discarded its history; drop its records
					let old_files = {
						let info = cluster
							.folder_info_mut(&advertised.id, &self.device)
							.ok_or_else(missing)?;
						std::mem::take(&mut info.files)
					};
					for file in old_files.values() {
						for hash in &file.blocks {
							cluster.blocks.remove_ref(hash)?;
						}
						file.augmentation.notify(EntityEvent::Deleted);
					}
					let info = cluster
						.folder_info_mut(&advertised.id, &self.device)
						.ok_or_else(missing)?;
					info.index_id = entry.index_id;
					info.max_sequence = 0;
				} else if entry.max_sequence < info.max_sequence {
					return Err(ModelError::PeerSequenceRegression {
						folder_id: advertised.id.clone(),
						device_id: self.device.short(),
						stored: info.max_sequence,
						announced: entry.max_sequence,
					});
				}
			}
			if let Some(entry) = &self_entry {
				let info =
					cluster.folder_info_mut(&advertised.id, &self.device).ok_or_else(missing)?;
				info.remote_index_id = entry.index_id;
				info.remote_max_sequence = entry.max_sequence;
			}
		}
		Ok(())
	}
}

/// Ingest one `Index` / `IndexUpdate` batch for a peer's folder view.
///
/// Unknown files are created, strictly newer versions replace the stored
/// record, equal versions are a no-op and older versions are an error.
#[derive(Debug)]
pub struct UpdateFolder {
	pub folder_id: String,
	pub device: DeviceId,
	/// Pre-generated keys for records that turn out to be new
	pub files: Vec<(Uuid, ProtoFileInfo)>,
}

impl UpdateFolder {
	pub fn create(
		cluster: &Cluster,
		sequencer: &mut Sequencer,
		folder_id: &str,
		device: DeviceId,
		files: Vec<ProtoFileInfo>,
	) -> Result<Diff, ModelError> {
		let info = cluster
			.folder_info(folder_id, &device)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;

		let mut old_blocks: Vec<BlockHash> = Vec::new();
		let mut new_blocks = Vec::new();
		let mut keyed = Vec::with_capacity(files.len());
		for proto in files {
			match info.file(&proto.name) {
				Some(existing) => match proto.version.compare(&existing.version) {
					VersionOrder::Equal => {
						keyed.push((existing.key, proto));
						continue;
					}
					VersionOrder::Dominated => {
						return Err(ModelError::PeerFileRegression {
							folder_id: folder_id.to_string(),
							device_id: device.short(),
							name: proto.name.clone(),
						});
					}
					_ => {
						old_blocks.extend(existing.blocks.iter().cloned());
						new_blocks.extend(proto.blocks.iter().cloned());
						keyed.push((existing.key, proto));
					}
				},
				None => {
					new_blocks.extend(proto.blocks.iter().cloned());
					keyed.push((sequencer.next_uuid(), proto));
				}
			}
		}

		let (children, removed) = plan_block_refs(cluster, &old_blocks, &new_blocks);
		let mut root = Diff::new(DiffKind::UpdateFolder(UpdateFolder {
			folder_id: folder_id.to_string(),
			device,
			files: keyed,
		}));
		attach_block_plan(&mut root, children, removed);
		Ok(root)
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for (key, proto) in &self.files {
			let path = cluster.paths.get(&proto.name);
			let info = cluster
				.folder_info_mut(&self.folder_id, &self.device)
				.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;

			let (file_key, prior) = match info.file(&proto.name) {
				Some(existing) => match proto.version.compare(&existing.version) {
					VersionOrder::Equal => continue,
					VersionOrder::Dominated => {
						return Err(ModelError::PeerFileRegression {
							folder_id: self.folder_id.clone(),
							device_id: self.device.short(),
							name: proto.name.clone(),
						});
					}
					_ => (existing.key, existing.blocks.clone()),
				},
				None => (*key, Vec::new()),
			};

			let mut file = FileInfo::from_proto(file_key, path, proto);
			let sequence = proto.sequence;
			if let Some(old) = info.files.remove(&proto.name) {
				file.augmentation = old.augmentation;
			}
			file.augmentation.notify(EntityEvent::Updated);
			info.files.insert(proto.name.clone(), file);
			if sequence > info.max_sequence {
				info.max_sequence = sequence;
			}
			for hash in &prior {
				cluster.blocks.remove_ref(hash)?;
			}
		}
		Ok(())
	}
}

// vim: ts=4
