//! Conflict resolution and the advance diff
//!
//! [`resolve`] decides, for one peer file against the local record, whether
//! the update is copied, wins a conflict, loses one, or is ignored.
//! [`Advance`] carries the decision into the cluster.

use uuid::Uuid;

use super::modify::{attach_block_plan, plan_block_refs};
use super::{Diff, DiffKind};
use crate::error::ModelError;
use crate::identity::{BlockHash, DeviceId};
use crate::model::file_info::FileInfo;
use crate::model::version::VersionOrder;
use crate::model::{Cluster, EntityEvent};
use crate::proto::ProtoFileInfo;
use crate::sequencer::Sequencer;

/// What to do with a peer file update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceAction {
	/// Nothing to do: invalid, suppressed, or already present
	Ignore,
	/// Install the peer's content locally
	RemoteCopy,
	/// Concurrent edit lost locally: rename the local file to a conflicting
	/// name, then install the peer's content under the original name
	ResolveRemoteWin,
	/// Concurrent edit won locally: keep ours, suppress the peer version
	ResolveLocalWin,
}

/// The decision table, evaluated top-down, first match wins.
pub fn resolve(peer_file: &FileInfo, local_file: Option<&FileInfo>) -> AdvanceAction {
	if peer_file.invalid || peer_file.suppressed {
		return AdvanceAction::Ignore;
	}
	let local = match local_file {
		None => return AdvanceAction::RemoteCopy,
		Some(local) => local,
	};
	match peer_file.version.compare(&local.version) {
		VersionOrder::Equal => {
			if local.is_locally_available() {
				AdvanceAction::Ignore
			} else {
				AdvanceAction::RemoteCopy
			}
		}
		VersionOrder::Dominates => AdvanceAction::RemoteCopy,
		VersionOrder::Dominated => AdvanceAction::ResolveLocalWin,
		VersionOrder::Concurrent => {
			// lexicographic (modified_s, modifier); ties go to the remote side
			let peer_wins = (peer_file.modified_s, peer_file.modified_by)
				>= (local.modified_s, local.modified_by);
			if peer_wins {
				AdvanceAction::ResolveRemoteWin
			} else {
				AdvanceAction::ResolveLocalWin
			}
		}
	}
}

/// The conflict rename planned for a `ResolveRemoteWin`. The renamed record
/// keeps its key; it is the same entity under a new name.
#[derive(Debug)]
pub struct ConflictRename {
	pub name: String,
}

#[derive(Debug)]
pub struct Advance {
	pub action: AdvanceAction,
	pub folder_id: String,
	pub peer_device: DeviceId,
	pub proto: ProtoFileInfo,
	/// Key of the local record receiving the peer content
	pub key: Uuid,
	pub conflict: Option<ConflictRename>,
	/// Local block references dropped when the peer content replaces ours
	pub prior_blocks: Vec<BlockHash>,
}

impl Advance {
	/// Build the diff for a resolved action. `Ignore` yields no diff.
	/// The conflict timestamp is the wall clock at creation.
	pub fn create(
		action: AdvanceAction,
		cluster: &Cluster,
		sequencer: &mut Sequencer,
		folder_id: &str,
		peer_device: DeviceId,
		name: &str,
		now: chrono::NaiveDateTime,
	) -> Result<Option<Diff>, ModelError> {
		let peer_file = cluster
			.folder_info(folder_id, &peer_device)
			.and_then(|info| info.file(name))
			.ok_or_else(|| ModelError::NoSuchFile {
				folder_id: folder_id.to_string(),
				name: name.to_string(),
			})?;
		let local_info = cluster
			.local_folder_info(folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;
		let local_file = local_info.file(name);
		let proto = peer_file
			.to_proto(|hash| cluster.blocks.get(hash).map(|e| (e.size, e.weak_hash)).unwrap_or((0, 0)));

		match action {
			AdvanceAction::Ignore => Ok(None),
			AdvanceAction::RemoteCopy => {
				let key = local_file.map(|f| f.key).unwrap_or_else(|| sequencer.next_uuid());
				let prior_blocks = local_file.map(|f| f.blocks.clone()).unwrap_or_default();
				let (children, removed) = plan_block_refs(cluster, &prior_blocks, &proto.blocks);
				let mut root = Diff::new(DiffKind::Advance(Advance {
					action,
					folder_id: folder_id.to_string(),
					peer_device,
					proto,
					key,
					conflict: None,
					prior_blocks,
				}));
				attach_block_plan(&mut root, children, removed);
				Ok(Some(root))
			}
			AdvanceAction::ResolveRemoteWin => {
				let local = local_file.ok_or_else(|| ModelError::NoSuchFile {
					folder_id: folder_id.to_string(),
					name: name.to_string(),
				})?;
				let conflict =
					ConflictRename { name: local.conflicting_name(&peer_device, now) };
				// the local record keeps its references under the conflict
				// name; the peer content is all new references
				let (children, removed) = plan_block_refs(cluster, &[], &proto.blocks);
				let mut root = Diff::new(DiffKind::Advance(Advance {
					action,
					folder_id: folder_id.to_string(),
					peer_device,
					proto,
					key: sequencer.next_uuid(),
					conflict: Some(conflict),
					prior_blocks: Vec::new(),
				}));
				attach_block_plan(&mut root, children, removed);
				Ok(Some(root))
			}
			AdvanceAction::ResolveLocalWin => Ok(Some(Diff::new(DiffKind::Advance(Advance {
				action,
				folder_id: folder_id.to_string(),
				peer_device,
				proto,
				key: Uuid::nil(),
				conflict: None,
				prior_blocks: Vec::new(),
			})))),
		}
	}

	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		match self.action {
			AdvanceAction::Ignore => Ok(()),
			AdvanceAction::RemoteCopy => self.apply_remote_copy(cluster),
			AdvanceAction::ResolveRemoteWin => self.apply_remote_win(cluster),
			AdvanceAction::ResolveLocalWin => self.apply_local_win(cluster),
		}
	}

	/// Install a pending local record mirroring the peer file, with the
	/// availability bitmap cleared; downloads fill it in.
	fn apply_remote_copy(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for hash in &self.prior_blocks {
			cluster.blocks.remove_ref(hash)?;
		}
		let path = cluster.paths.get(&self.proto.name);
		let info = cluster
			.local_folder_info_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		let sequence = info.advance_sequence();
		let mut file = FileInfo::from_proto(self.key, path, &self.proto);
		file.sequence = sequence;
		file.reset_availability(false);
		if let Some(old) = info.files.remove(&self.proto.name) {
			file.augmentation = old.augmentation;
		}
		file.augmentation.notify(EntityEvent::Updated);
		info.files.insert(self.proto.name.clone(), file);
		Ok(())
	}

	/// Move the losing local record to the conflicting name, then install
	/// the peer content under the original name.
	fn apply_remote_win(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let conflict = self.conflict.as_ref().ok_or_else(|| ModelError::NoSuchFile {
			folder_id: self.folder_id.clone(),
			name: self.proto.name.clone(),
		})?;
		let conflict_path = cluster.paths.get(&conflict.name);
		let peer_path = cluster.paths.get(&self.proto.name);
		let info = cluster
			.local_folder_info_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;

		let mut renamed =
			info.files.remove(&self.proto.name).ok_or_else(|| ModelError::NoSuchFile {
				folder_id: self.folder_id.clone(),
				name: self.proto.name.clone(),
			})?;
		renamed.path = conflict_path;
		renamed.sequence = info.advance_sequence();
		renamed.augmentation.notify(EntityEvent::Updated);
		info.files.insert(conflict.name.clone(), renamed);

		let sequence = info.advance_sequence();
		let mut file = FileInfo::from_proto(self.key, peer_path, &self.proto);
		file.sequence = sequence;
		file.reset_availability(false);
		file.augmentation.notify(EntityEvent::Updated);
		info.files.insert(self.proto.name.clone(), file);
		Ok(())
	}

	/// Keep ours; mark the peer version so it is not requested again until
	/// the peer advances past it.
	fn apply_local_win(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder_id = self.folder_id.clone();
		let file = cluster
			.folder_info_mut(&self.folder_id, &self.peer_device)
			.and_then(|info| info.file_mut(&self.proto.name))
			.ok_or_else(|| ModelError::NoSuchFile { folder_id, name: self.proto.name.clone() })?;
		file.suppressed = true;
		Ok(())
	}
}

// vim: ts=4
