//! Cluster to store: the committed-diff observer
//!
//! A [`ClusterVisitor`] that converts each committed diff into store write
//! operations. Operations are grouped into transactions of up to the
//! configured threshold of diffs, flushed earlier when the pending bytes
//! exceed the store's upper limit.

use super::records::{self, BlockRecord, DeviceRecord, FileInfoRecord, FolderInfoRecord, FolderRecord};
use super::{keys, Db, WriteOp};
use crate::diff::advance::AdvanceAction;
use crate::diff::{advance, local, modify, peer, ClusterVisitor, Diff};
use crate::error::{DbError, SyncError};
use crate::identity::DeviceId;
use crate::logging::*;
use crate::model::Cluster;

pub struct DbObserver<'db> {
	db: &'db Db,
	ops: Vec<WriteOp>,
	uncommitted: usize,
	uncommitted_threshold: usize,
	pending_bytes: u64,
	upper_limit: u64,
}

impl<'db> DbObserver<'db> {
	pub fn new(db: &'db Db, uncommitted_threshold: usize, upper_limit: u64) -> Self {
		DbObserver {
			db,
			ops: Vec::new(),
			uncommitted: 0,
			uncommitted_threshold,
			pending_bytes: 0,
			upper_limit,
		}
	}

	/// Observe one committed diff. Flushes when the batch is full.
	pub fn record(&mut self, diff: &Diff, cluster: &Cluster) -> Result<(), SyncError> {
		{
			let mut visitor = RecordVisitor {
				cluster,
				ops: &mut self.ops,
				pending_bytes: &mut self.pending_bytes,
			};
			diff.visit(&mut visitor)?;
		}
		self.uncommitted += 1;
		if self.uncommitted >= self.uncommitted_threshold || self.pending_bytes >= self.upper_limit
		{
			self.flush()?;
		}
		Ok(())
	}

	/// Write the pending operations in one transaction
	pub fn flush(&mut self) -> Result<(), DbError> {
		if self.ops.is_empty() {
			self.uncommitted = 0;
			return Ok(());
		}
		trace!("flushing {} store operations", self.ops.len());
		self.db.write_batch(&self.ops)?;
		self.ops.clear();
		self.uncommitted = 0;
		self.pending_bytes = 0;
		Ok(())
	}

	pub fn pending_ops(&self) -> usize {
		self.ops.len()
	}
}

struct RecordVisitor<'a> {
	cluster: &'a Cluster,
	ops: &'a mut Vec<WriteOp>,
	pending_bytes: &'a mut u64,
}

impl<'a> RecordVisitor<'a> {
	fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
		*self.pending_bytes += (key.len() + value.len()) as u64;
		self.ops.push(WriteOp::Put { key, value });
	}

	fn delete(&mut self, key: Vec<u8>) {
		self.ops.push(WriteOp::Delete { key });
	}

	fn put_folder(&mut self, folder_id: &str) -> Result<(), SyncError> {
		if let Some(folder) = self.cluster.folder(folder_id) {
			let record = FolderRecord { key: folder.key, settings: folder.settings.clone() };
			let value = records::encode("folder", &record)?;
			self.put(keys::folder_key(folder_id), value);
		}
		Ok(())
	}

	fn put_folder_info(&mut self, folder_id: &str, device: &DeviceId) -> Result<(), SyncError> {
		if let Some(info) = self.cluster.folder_info(folder_id, device) {
			let record = FolderInfoRecord {
				key: info.key,
				folder_id: folder_id.to_string(),
				device: *device,
				index_id: info.index_id,
				max_sequence: info.max_sequence,
				remote_index_id: info.remote_index_id,
				remote_max_sequence: info.remote_max_sequence,
			};
			let value = records::encode("folder_info", &record)?;
			self.put(keys::folder_info_key(folder_id, device), value);
		}
		Ok(())
	}

	fn put_file(
		&mut self,
		folder_id: &str,
		device: &DeviceId,
		name: &str,
	) -> Result<(), SyncError> {
		let file = match self.cluster.folder_info(folder_id, device).and_then(|i| i.file(name)) {
			Some(file) => file,
			None => return Ok(()),
		};
		let cluster = self.cluster;
		let proto = file
			.to_proto(|hash| cluster.blocks.get(hash).map(|e| (e.size, e.weak_hash)).unwrap_or((0, 0)));
		let file_key = file.key;
		let record = FileInfoRecord {
			key: file_key,
			folder_id: folder_id.to_string(),
			device: *device,
			proto,
			local_blocks: file.local_blocks.clone(),
		};
		let value = records::encode("file_info", &record)?;
		self.put(keys::file_info_key(&file_key), value);
		Ok(())
	}

	fn put_device(&mut self, device_id: &DeviceId) -> Result<(), SyncError> {
		if let Some(device) = self.cluster.devices.get(device_id) {
			let record = DeviceRecord {
				key: device.key,
				id: device.id,
				name: device.name.clone(),
				client_name: device.client_name.clone(),
				client_version: device.client_version.clone(),
				compression: device.compression,
				addresses: device.addresses.clone(),
				introducer: device.introducer,
				auto_accept: device.auto_accept,
				paused: device.paused,
				last_seen: device.last_seen,
			};
			let value = records::encode("device", &record)?;
			self.put(keys::device_key(device_id), value);
		}
		Ok(())
	}
}

impl<'a> ClusterVisitor for RecordVisitor<'a> {
	fn on_create_folder(&mut self, d: &modify::CreateFolder) -> Result<(), SyncError> {
		self.put_folder(&d.settings.id)?;
		let self_id = self.cluster.self_id();
		self.put_folder_info(&d.settings.id, &self_id)
	}

	fn on_upsert_folder(&mut self, d: &modify::UpsertFolder) -> Result<(), SyncError> {
		self.put_folder(&d.settings.id)
	}

	fn on_upsert_folder_info(&mut self, d: &modify::UpsertFolderInfo) -> Result<(), SyncError> {
		self.put_folder_info(&d.folder_id, &d.device)
	}

	fn on_remove_folder(&mut self, d: &modify::RemoveFolder) -> Result<(), SyncError> {
		self.delete(keys::folder_key(&d.folder_id));
		self.ops.push(WriteOp::DeleteFolderScoped { folder_id: d.folder_id.clone() });
		Ok(())
	}

	fn on_share_folder(&mut self, d: &modify::ShareFolder) -> Result<(), SyncError> {
		self.delete(keys::pending_folder_key(&d.folder_id, &d.device));
		self.put_folder_info(&d.folder_id, &d.device)
	}

	fn on_unshare_folder(&mut self, d: &modify::UnshareFolder) -> Result<(), SyncError> {
		self.delete(keys::folder_info_key(&d.folder_id, &d.device));
		self.ops.push(WriteOp::DeleteFiles {
			folder_id: d.folder_id.clone(),
			device: d.device,
		});
		Ok(())
	}

	fn on_update_peer(&mut self, d: &modify::UpdatePeer) -> Result<(), SyncError> {
		self.put_device(&d.device_id)
	}

	fn on_remove_peer(&mut self, d: &modify::RemovePeer) -> Result<(), SyncError> {
		self.delete(keys::device_key(&d.device_id));
		self.ops.push(WriteOp::DeleteDeviceScoped { device: d.device_id });
		Ok(())
	}

	fn on_add_ignored_device(&mut self, d: &modify::AddIgnoredDevice) -> Result<(), SyncError> {
		let value = records::encode("ignored_device", &d.record)?;
		self.put(keys::ignored_device_key(&d.record.id), value);
		Ok(())
	}

	fn on_add_pending_device(&mut self, d: &modify::AddPendingDevice) -> Result<(), SyncError> {
		let value = records::encode("pending_device", &d.record)?;
		self.put(keys::pending_device_key(&d.record.id), value);
		Ok(())
	}

	fn on_remove_pending_device(
		&mut self,
		d: &modify::RemovePendingDevice,
	) -> Result<(), SyncError> {
		self.delete(keys::pending_device_key(&d.device_id));
		Ok(())
	}

	fn on_new_file(&mut self, d: &modify::NewFile) -> Result<(), SyncError> {
		let self_id = self.cluster.self_id();
		self.put_file(&d.folder_id, &self_id, &d.proto.name)?;
		self.put_folder_info(&d.folder_id, &self_id)
	}

	fn on_local_update(&mut self, d: &modify::LocalUpdate) -> Result<(), SyncError> {
		let self_id = self.cluster.self_id();
		self.put_file(&d.folder_id, &self_id, &d.proto.name)?;
		self.put_folder_info(&d.folder_id, &self_id)
	}

	fn on_append_block(&mut self, d: &modify::AppendBlock) -> Result<(), SyncError> {
		let record = BlockRecord { hash: d.hash, size: d.size, weak_hash: d.weak_hash };
		let value = records::encode("block_info", &record)?;
		self.put(keys::block_key(&d.hash), value);
		Ok(())
	}

	fn on_remove_blocks(&mut self, d: &modify::RemoveBlocks) -> Result<(), SyncError> {
		for hash in &d.hashes {
			self.delete(keys::block_key(hash));
		}
		Ok(())
	}

	fn on_update_contact(&mut self, d: &modify::UpdateContact) -> Result<(), SyncError> {
		self.put_device(&d.device_id)
	}

	fn on_cluster_update(&mut self, d: &peer::ClusterUpdate) -> Result<(), SyncError> {
		for advertised in &d.folders {
			let shared = self
				.cluster
				.folder(&advertised.id)
				.map(|f| f.is_shared_with(&d.device))
				.unwrap_or(false);
			if shared {
				self.put_folder_info(&advertised.id, &d.device)?;
				// an index reset left the view empty; the scan delete is
				// idempotent when nothing was dropped
				let empty = self
					.cluster
					.folder_info(&advertised.id, &d.device)
					.map(|i| i.files.is_empty())
					.unwrap_or(false);
				if empty {
					self.ops.push(WriteOp::DeleteFiles {
						folder_id: advertised.id.clone(),
						device: d.device,
					});
				}
			} else if let Some(pending) =
				self.cluster.pending_folders.get(&(advertised.id.clone(), d.device))
			{
				let value = records::encode("pending_folder", pending)?;
				self.put(keys::pending_folder_key(&advertised.id, &d.device), value);
			}
		}
		Ok(())
	}

	fn on_update_folder(&mut self, d: &peer::UpdateFolder) -> Result<(), SyncError> {
		for (_, proto) in &d.files {
			self.put_file(&d.folder_id, &d.device, &proto.name)?;
		}
		self.put_folder_info(&d.folder_id, &d.device)
	}

	fn on_advance(&mut self, d: &advance::Advance) -> Result<(), SyncError> {
		let self_id = self.cluster.self_id();
		match d.action {
			AdvanceAction::Ignore | AdvanceAction::ResolveLocalWin => Ok(()),
			AdvanceAction::RemoteCopy => {
				self.put_file(&d.folder_id, &self_id, &d.proto.name)?;
				self.put_folder_info(&d.folder_id, &self_id)
			}
			AdvanceAction::ResolveRemoteWin => {
				if let Some(conflict) = &d.conflict {
					self.put_file(&d.folder_id, &self_id, &conflict.name)?;
				}
				self.put_file(&d.folder_id, &self_id, &d.proto.name)?;
				self.put_folder_info(&d.folder_id, &self_id)
			}
		}
	}

	fn on_file_availability(&mut self, d: &local::FileAvailability) -> Result<(), SyncError> {
		let self_id = self.cluster.self_id();
		self.put_file(&d.folder_id, &self_id, &d.name)
	}

	fn on_blocks_availability(&mut self, d: &local::BlocksAvailability) -> Result<(), SyncError> {
		let self_id = self.cluster.self_id();
		self.put_file(&d.folder_id, &self_id, &d.name)
	}
}

// vim: ts=4
