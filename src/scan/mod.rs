//! Local scan and hash engine
//!
//! A dedicated engine runs per folder on the scan scheduler, walking the
//! filesystem with a stack of typed tasks and reconciling what it finds
//! against a snapshot of the cluster's local view. The engine emits
//! [`ScanEvent`]s; the network scheduler turns one batch per tick into a
//! single aggregate diff, so the coordinator is never flooded.

pub mod engine;
pub mod hasher;
pub mod mru;
pub mod task;

pub use engine::{ScanEngine, ScanOptions, ScanStatus};
pub use hasher::{HashJob, HashResult, HasherPool, HashedBlock};
pub use mru::{BlockReader, MruCache};

use std::collections::BTreeMap;

use crate::diff::local::{
	BlocksAvailability, FileAvailability, FileIoError, IoFailure, ScanFinish, ScanStart,
};
use crate::diff::modify::{LocalUpdate, NewFile, SuspendFolder};
use crate::diff::{Diff, DiffKind};
use crate::error::ModelError;
use crate::identity::{BlockHash, DeviceId};
use crate::model::file_info::FileKind;
use crate::model::Cluster;
use crate::proto::{ProtoFileInfo, ProtoFileType};
use crate::sequencer::Sequencer;

/// Smallest block size the hasher will pick
pub const MIN_BLOCK_SIZE: u32 = 128 * 1024;

/// Largest block size the hasher will pick
pub const MAX_BLOCK_SIZE: u32 = 16 * 1024 * 1024;

/// Suffix of partially downloaded files
pub const TMP_SUFFIX: &str = ".bepsync-tmp";

/// Pick a block size targeting a bounded block count per file: the smallest
/// power-of-two size, within limits, that keeps the file under 2048 blocks.
pub fn block_size_for(file_size: u64) -> u32 {
	let mut size = MIN_BLOCK_SIZE as u64;
	while size < MAX_BLOCK_SIZE as u64 && file_size / size >= 2048 {
		size *= 2;
	}
	size as u32
}

/// What one scan run observed
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
	Started,
	/// New or changed disk content, fully hashed
	Updated { proto: ProtoFileInfo },
	/// Disk content matches the model record
	Unchanged { rel: String },
	/// A model entry disappeared from disk
	Deleted { rel: String },
	/// Some blocks of a partial download matched the peer's hashes
	TempBlocks { rel: String, indexes: Vec<u32> },
	/// Recoverable I/O failure on one file
	IoFailure { rel: String, message: String },
	/// Folder-level I/O error; scanning stops
	Suspended { message: String },
	Finished,
}

/// Snapshot of one local file used for disk comparison
#[derive(Debug, Clone)]
pub struct LocalMeta {
	pub kind: FileKind,
	pub size: u64,
	pub block_size: u32,
	pub permissions: u32,
	pub modified_s: i64,
	pub symlink_target: String,
	pub deleted: bool,
	/// Ignored by policy; the record exists but is never synced
	pub invalid: bool,
}

/// Snapshot of the best peer candidate for a partially downloaded file
#[derive(Debug, Clone)]
pub struct PeerMeta {
	pub device: DeviceId,
	pub size: u64,
	pub block_size: u32,
	pub blocks: Vec<BlockHash>,
	/// A transfer currently holds the file
	pub synchronizing: bool,
}

/// Snapshot the local view of a folder for the scan engine
pub fn local_view(cluster: &Cluster, folder_id: &str) -> BTreeMap<String, LocalMeta> {
	let mut view = BTreeMap::new();
	if let Some(info) = cluster.local_folder_info(folder_id) {
		for (name, file) in &info.files {
			view.insert(
				name.clone(),
				LocalMeta {
					kind: file.kind,
					size: file.size,
					block_size: file.block_size,
					permissions: file.permissions,
					modified_s: file.modified_s,
					symlink_target: file.symlink_target.clone(),
					deleted: file.deleted,
					invalid: file.invalid,
				},
			);
		}
	}
	view
}

/// Snapshot the best peer candidate per name: among non-deleted, valid peer
/// records, the one whose version carries the highest counter.
pub fn peer_view(cluster: &Cluster, folder_id: &str) -> BTreeMap<String, PeerMeta> {
	let mut view: BTreeMap<String, (u64, PeerMeta)> = BTreeMap::new();
	let folder = match cluster.folder(folder_id) {
		Some(folder) => folder,
		None => return BTreeMap::new(),
	};
	let self_id = cluster.self_id();
	for (device, info) in &folder.folder_infos {
		if *device == self_id {
			continue;
		}
		for (name, file) in &info.files {
			if file.deleted || file.invalid {
				continue;
			}
			let rank = file.version.best().map(|c| c.value).unwrap_or(0);
			let candidate = PeerMeta {
				device: *device,
				size: file.size,
				block_size: file.block_size,
				blocks: file.blocks.clone(),
				synchronizing: file.locked,
			};
			match view.get(name) {
				Some((best, _)) if *best >= rank => {}
				_ => {
					view.insert(name.clone(), (rank, candidate));
				}
			}
		}
	}
	view.into_iter().map(|(name, (_, meta))| (name, meta)).collect()
}

/// Turn one tick's worth of scan events into cluster mutations.
///
/// Each diff is created against the state its predecessors left behind and
/// applied immediately, so reference planning never goes stale inside the
/// batch (a rename observed as delete-plus-create reuses its blocks). The
/// returned aggregate is already applied; it exists for the persistence
/// observer, which must see the same sequence. One update per tick keeps
/// the coordinator from being flooded by large folders.
pub fn apply_model_update(
	cluster: &mut Cluster,
	sequencer: &mut Sequencer,
	folder_id: &str,
	events: Vec<ScanEvent>,
	now: i64,
) -> Result<Diff, ModelError> {
	let mut diffs = Vec::new();
	let mut failures = Vec::new();
	for event in events {
		let diff = match event {
			ScanEvent::Started => Diff::new(DiffKind::ScanStart(ScanStart {
				folder_id: folder_id.to_string(),
				at: now,
			})),
			ScanEvent::Updated { proto } => {
				let known = cluster
					.local_folder_info(folder_id)
					.map(|info| info.file(&proto.name).is_some())
					.unwrap_or(false);
				if known {
					LocalUpdate::create(cluster, folder_id, proto)?
				} else {
					NewFile::create(cluster, sequencer, folder_id, proto)?
				}
			}
			ScanEvent::Unchanged { rel } => Diff::new(DiffKind::FileAvailability(
				FileAvailability { folder_id: folder_id.to_string(), name: rel },
			)),
			ScanEvent::Deleted { rel } => {
				let info = cluster
					.local_folder_info(folder_id)
					.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;
				let file = match info.file(&rel) {
					Some(file) if !file.deleted => file,
					_ => continue,
				};
				let mut proto = file.to_proto(|_| (0, 0));
				proto.deleted = true;
				proto.size = 0;
				proto.blocks = Vec::new();
				LocalUpdate::create(cluster, folder_id, proto)?
			}
			ScanEvent::TempBlocks { rel, indexes } => Diff::new(DiffKind::BlocksAvailability(
				BlocksAvailability { folder_id: folder_id.to_string(), name: rel, blocks: indexes },
			)),
			ScanEvent::IoFailure { rel, message } => {
				failures.push(FileIoError {
					folder_id: folder_id.to_string(),
					name: rel,
					message,
				});
				continue;
			}
			ScanEvent::Suspended { message } => Diff::new(DiffKind::SuspendFolder(SuspendFolder {
				folder_id: folder_id.to_string(),
				suspended: true,
				reason: Some(message),
			})),
			ScanEvent::Finished => Diff::new(DiffKind::ScanFinish(ScanFinish {
				folder_id: folder_id.to_string(),
				at: now,
			})),
		};
		diff.apply(cluster)?;
		diffs.push(diff);
	}
	if !failures.is_empty() {
		let diff = Diff::new(DiffKind::IoFailure(IoFailure { errors: failures }));
		diff.apply(cluster)?;
		diffs.push(diff);
	}
	Ok(Diff::aggregate(diffs))
}

/// Kind conversion for freshly scanned disk entries
pub fn proto_kind(kind: FileKind) -> ProtoFileType {
	kind.into()
}


// vim: ts=4
