//! Updates streamer
//!
//! Yields the local files a peer has not acknowledged yet, in ascending
//! sequence order. A peer remembering a different index ID gets the whole
//! index again; otherwise only files newer than its acknowledged sequence.

use std::collections::BTreeMap;

use crate::error::ModelError;
use crate::identity::DeviceId;
use crate::model::file_info::FileInfo;
use crate::model::Cluster;

pub struct UpdatesStreamer {
	folder_id: String,
	/// Remaining files, keyed by the sequence they were queued with
	queue: BTreeMap<u64, String>,
	full_resync: bool,
}

impl UpdatesStreamer {
	pub fn new(cluster: &Cluster, folder_id: &str, peer: DeviceId) -> Result<Self, ModelError> {
		let local = cluster
			.local_folder_info(folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder_id.to_string() })?;
		let peer_info = cluster
			.folder_info(folder_id, &peer)
			.ok_or_else(|| ModelError::NoSuchDevice { device_id: peer.short() })?;

		let full_resync = peer_info.remote_index_id != local.index_id;
		let threshold = if full_resync { 0 } else { peer_info.remote_max_sequence };
		let queue = local
			.files
			.iter()
			.filter(|(_, file)| file.sequence > threshold)
			.map(|(name, file)| (file.sequence, name.clone()))
			.collect();
		Ok(UpdatesStreamer { folder_id: folder_id.to_string(), queue, full_resync })
	}

	/// Whether the peer's remembered index ID forced a full re-send
	pub fn is_full_resync(&self) -> bool {
		self.full_resync
	}

	/// The next unacknowledged file, lowest sequence first. Entries whose
	/// file advanced since queueing are skipped; `on_update` queued the
	/// newer sequence.
	pub fn next(&mut self, cluster: &Cluster) -> Option<FileInfo> {
		while let Some((&sequence, _)) = self.queue.iter().next() {
			let name = match self.queue.remove(&sequence) {
				Some(name) => name,
				None => continue,
			};
			let file = cluster
				.local_folder_info(&self.folder_id)
				.and_then(|info| info.file(&name));
			match file {
				Some(file) if file.sequence == sequence => return Some(file.clone()),
				_ => continue,
			}
		}
		None
	}

	/// A new local file was committed while streaming; insert it into the
	/// ordered view.
	pub fn on_update(&mut self, file: &FileInfo) {
		self.queue.insert(file.sequence, file.name().to_string());
	}

	pub fn pending(&self) -> usize {
		self.queue.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diff::modify::{CreateFolder, NewFile};
	use crate::identity::{hash_block, DeviceId};
	use crate::model::folder::FolderSettings;
	use crate::model::{Cluster, Device};
	use crate::proto::{ProtoBlockInfo, ProtoFileInfo, ProtoFileType};
	use crate::sequencer::Sequencer;
	use std::path::PathBuf;
	use uuid::Uuid;

	fn proto_file(name: &str, data: &[u8]) -> ProtoFileInfo {
		let blocks = if data.is_empty() {
			Vec::new()
		} else {
			vec![ProtoBlockInfo {
				offset: 0,
				size: data.len() as u32,
				hash: hash_block(data),
				weak_hash: 0,
			}]
		};
		ProtoFileInfo {
			name: name.to_string(),
			file_type: ProtoFileType::File,
			size: data.len() as u64,
			permissions: 0o644,
			modified_s: 100,
			modified_ns: 0,
			modified_by: DeviceId::from_bytes([1; 32]),
			deleted: false,
			invalid: false,
			no_permissions: false,
			version: Default::default(),
			sequence: 0,
			block_size: 128 * 1024,
			blocks,
			symlink_target: String::new(),
		}
	}

	fn seeded_cluster() -> (Cluster, Sequencer, DeviceId) {
		let self_id = DeviceId::from_bytes([1; 32]);
		let peer_id = DeviceId::from_bytes([2; 32]);
		let mut cluster = Cluster::new(Device::new(Uuid::nil(), self_id, "self"));
		let mut sequencer = Sequencer::with_seed(42);

		cluster.devices.insert(peer_id, Device::new(sequencer.next_uuid(), peer_id, "peer"));
		let settings = FolderSettings::new("1234-5678", "docs", PathBuf::from("/tmp/docs"));
		CreateFolder::create(&mut sequencer, settings).apply(&mut cluster).unwrap();
		crate::diff::modify::ShareFolder::create(&cluster, &mut sequencer, "1234-5678", peer_id)
			.unwrap()
			.apply(&mut cluster)
			.unwrap();

		NewFile::create(&cluster, &mut sequencer, "1234-5678", proto_file("a.txt", b"aaa"))
			.unwrap()
			.apply(&mut cluster)
			.unwrap();
		NewFile::create(&cluster, &mut sequencer, "1234-5678", proto_file("b.txt", b"bbb"))
			.unwrap()
			.apply(&mut cluster)
			.unwrap();
		(cluster, sequencer, peer_id)
	}

	#[test]
	fn test_matching_index_streams_tail() {
		let (mut cluster, _seq, peer_id) = seeded_cluster();
		// the peer acknowledged our index up to sequence 1
		let local_index = cluster.local_folder_info("1234-5678").unwrap().index_id;
		{
			let info = cluster.folder_info_mut("1234-5678", &peer_id).unwrap();
			info.remote_index_id = local_index;
			info.remote_max_sequence = 1;
		}
		let mut streamer = UpdatesStreamer::new(&cluster, "1234-5678", peer_id).unwrap();
		assert!(!streamer.is_full_resync());
		let first = streamer.next(&cluster).unwrap();
		assert_eq!(first.name(), "b.txt");
		assert_eq!(first.sequence, 2);
		assert!(streamer.next(&cluster).is_none());
	}

	#[test]
	fn test_mismatched_index_streams_everything() {
		let (cluster, _seq, peer_id) = seeded_cluster();
		// peer remembers nothing: remote_index_id stays 0
		let mut streamer = UpdatesStreamer::new(&cluster, "1234-5678", peer_id).unwrap();
		assert!(streamer.is_full_resync());
		let names: Vec<String> = std::iter::from_fn(|| streamer.next(&cluster))
			.map(|f| f.name().to_string())
			.collect();
		assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
	}

	#[test]
	fn test_on_update_inserts_into_view() {
		let (mut cluster, mut sequencer, peer_id) = seeded_cluster();
		let local_index = cluster.local_folder_info("1234-5678").unwrap().index_id;
		{
			let info = cluster.folder_info_mut("1234-5678", &peer_id).unwrap();
			info.remote_index_id = local_index;
			info.remote_max_sequence = 2;
		}
		let mut streamer = UpdatesStreamer::new(&cluster, "1234-5678", peer_id).unwrap();
		assert_eq!(streamer.pending(), 0);

		NewFile::create(&cluster, &mut sequencer, "1234-5678", proto_file("c.txt", b"ccc"))
			.unwrap()
			.apply(&mut cluster)
			.unwrap();
		let file =
			cluster.local_folder_info("1234-5678").unwrap().file("c.txt").unwrap().clone();
		streamer.on_update(&file);
		let next = streamer.next(&cluster).unwrap();
		assert_eq!(next.name(), "c.txt");
		assert!(streamer.next(&cluster).is_none());
	}

	#[test]
	fn test_stale_queue_entry_skipped_after_update() {
		let (mut cluster, mut sequencer, peer_id) = seeded_cluster();
		let mut streamer = UpdatesStreamer::new(&cluster, "1234-5678", peer_id).unwrap();
		// a.txt advances while queued; the stale sequence is skipped and the
		// file is yielded once, at its new position
		crate::diff::modify::LocalUpdate::create(
			&cluster,
			"1234-5678",
			proto_file("a.txt", b"aaaa"),
		)
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
		let file =
			cluster.local_folder_info("1234-5678").unwrap().file("a.txt").unwrap().clone();
		streamer.on_update(&file);

		let names: Vec<String> = std::iter::from_fn(|| streamer.next(&cluster))
			.map(|f| f.name().to_string())
			.collect();
		assert_eq!(names, vec!["b.txt".to_string(), "a.txt".to_string()]);
	}
}

// vim: ts=4
