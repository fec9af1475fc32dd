//! Persistence replay: committed diffs observed into the store rebuild a
//! structurally equal cluster on load.

use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

use bepsync::db::{load_cluster_diff, loader::LoadProgress, Db, DbObserver};
use bepsync::diff::modify::{
	AddIgnoredDevice, AddPendingDevice, CreateFolder, LocalUpdate, NewFile, ShareFolder,
	UpdatePeer,
};
use bepsync::diff::peer::UpdateFolder;
use bepsync::identity::{hash_block, DeviceId};
use bepsync::model::folder::FolderSettings;
use bepsync::model::{Cluster, Device, IgnoredDevice, PendingDevice};
use bepsync::proto::{ProtoBlockInfo, ProtoFileInfo, ProtoFileType};
use bepsync::{Diff, Sequencer};

const FOLDER: &str = "1234-5678";

fn self_id() -> DeviceId {
	DeviceId::from_bytes([1; 32])
}

fn peer_id() -> DeviceId {
	DeviceId::from_bytes([2; 32])
}

fn proto_file(name: &str, data: &[u8], sequence: u64) -> ProtoFileInfo {
	let blocks = if data.is_empty() {
		Vec::new()
	} else {
		vec![ProtoBlockInfo {
			offset: 0,
			size: data.len() as u32,
			hash: hash_block(data),
			weak_hash: 7,
		}]
	};
	ProtoFileInfo {
		name: name.to_string(),
		file_type: ProtoFileType::File,
		size: data.len() as u64,
		permissions: 0o644,
		modified_s: 100,
		modified_ns: 0,
		modified_by: self_id(),
		deleted: false,
		invalid: false,
		no_permissions: false,
		version: Default::default(),
		sequence,
		block_size: if data.is_empty() { 0 } else { data.len() as u32 },
		blocks,
		symlink_target: String::new(),
	}
}

fn fresh_cluster() -> Cluster {
	Cluster::new(Device::new(Uuid::nil(), self_id(), "self"))
}

/// Apply and record one diff
fn commit(
	diff: Diff,
	cluster: &mut Cluster,
	observer: &mut DbObserver<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
	diff.apply(cluster)?;
	observer.record(&diff, cluster)?;
	Ok(())
}

fn populate(cluster: &mut Cluster, observer: &mut DbObserver<'_>, sequencer: &mut Sequencer) {
	commit(
		UpdatePeer::create(cluster, sequencer, peer_id(), "peer"),
		cluster,
		observer,
	)
	.unwrap();
	let settings = FolderSettings::new(FOLDER, "docs", PathBuf::from("/tmp/docs"));
	commit(CreateFolder::create(sequencer, settings), cluster, observer).unwrap();
	commit(
		ShareFolder::create(cluster, sequencer, FOLDER, peer_id()).unwrap(),
		cluster,
		observer,
	)
	.unwrap();

	// two local files, one shared block with a peer file
	commit(
		NewFile::create(cluster, sequencer, FOLDER, proto_file("a.txt", b"shared", 0)).unwrap(),
		cluster,
		observer,
	)
	.unwrap();
	commit(
		NewFile::create(cluster, sequencer, FOLDER, proto_file("b.txt", b"solo", 0)).unwrap(),
		cluster,
		observer,
	)
	.unwrap();
	commit(
		LocalUpdate::create(cluster, FOLDER, proto_file("b.txt", b"solo2", 0)).unwrap(),
		cluster,
		observer,
	)
	.unwrap();

	let mut peer_file = proto_file("a.txt", b"shared", 1);
	peer_file.version = bepsync::VersionVector::single(peer_id(), 1);
	peer_file.modified_by = peer_id();
	commit(
		UpdateFolder::create(cluster, sequencer, FOLDER, peer_id(), vec![peer_file]).unwrap(),
		cluster,
		observer,
	)
	.unwrap();

	commit(
		Diff::new(bepsync::DiffKind::AddPendingDevice(AddPendingDevice {
			record: PendingDevice {
				id: DeviceId::from_bytes([3; 32]),
				name: "visitor".to_string(),
				address: "tcp://10.0.0.3:22000".to_string(),
				last_seen: 1000,
			},
		})),
		cluster,
		observer,
	)
	.unwrap();
	commit(
		AddIgnoredDevice::create(
			cluster,
			IgnoredDevice {
				id: DeviceId::from_bytes([4; 32]),
				name: "banned".to_string(),
				last_seen: 900,
			},
		),
		cluster,
		observer,
	)
	.unwrap();
}

#[test]
fn replay_rebuilds_structurally_equal_cluster() {
	let tmp = TempDir::new().unwrap();
	let db = Db::open(&tmp.path().join("cluster.db")).unwrap();
	let mut sequencer = Sequencer::with_seed(5);

	let mut original = fresh_cluster();
	{
		let mut observer = DbObserver::new(&db, 100, 64 * 1024 * 1024);
		populate(&mut original, &mut observer, &mut sequencer);
		observer.flush().unwrap();
	}

	let mut restored = fresh_cluster();
	let load = load_cluster_diff(&db).unwrap();
	let mut progress = LoadProgress::new();
	load.apply_controlled(&mut restored, &mut progress).unwrap();
	assert!(progress.applied() > 0);

	assert!(original.structural_eq(&restored), "replayed cluster differs");

	// refcounts are rebuilt from the file records, not stored
	assert_eq!(restored.blocks.get(&hash_block(b"shared")).unwrap().refcount, 2);
	assert_eq!(restored.blocks.get(&hash_block(b"solo2")).unwrap().refcount, 1);
	// the replaced content of b.txt is gone from the store
	assert!(restored.blocks.get(&hash_block(b"solo")).is_none());
}

#[test]
fn flush_threshold_batches_transactions() {
	let tmp = TempDir::new().unwrap();
	let db = Db::open(&tmp.path().join("cluster.db")).unwrap();
	let mut sequencer = Sequencer::with_seed(6);
	let mut cluster = fresh_cluster();

	// threshold of 1 flushes after every diff
	let mut observer = DbObserver::new(&db, 1, 64 * 1024 * 1024);
	let settings = FolderSettings::new(FOLDER, "docs", PathBuf::from("/tmp/docs"));
	commit(CreateFolder::create(&mut sequencer, settings), &mut cluster, &mut observer).unwrap();
	assert_eq!(observer.pending_ops(), 0, "threshold 1 should have flushed");

	let records = db.read_all().unwrap();
	assert!(!records.is_empty());
}

#[test]
fn unshare_scrubs_peer_records_from_store() {
	let tmp = TempDir::new().unwrap();
	let db = Db::open(&tmp.path().join("cluster.db")).unwrap();
	let mut sequencer = Sequencer::with_seed(8);
	let mut cluster = fresh_cluster();
	{
		let mut observer = DbObserver::new(&db, 100, 64 * 1024 * 1024);
		populate(&mut cluster, &mut observer, &mut sequencer);
		commit(
			bepsync::diff::modify::UnshareFolder::create(&cluster, FOLDER, peer_id()).unwrap(),
			&mut cluster,
			&mut observer,
		)
		.unwrap();
		observer.flush().unwrap();
	}

	let mut restored = fresh_cluster();
	let load = load_cluster_diff(&db).unwrap();
	let mut progress = LoadProgress::new();
	load.apply_controlled(&mut restored, &mut progress).unwrap();
	assert!(cluster.structural_eq(&restored));
	assert!(restored.folder_info(FOLDER, &peer_id()).is_none());
}

// vim: ts=4
