//! Cluster model and diff pipeline tests: file lifecycle, block
//! refcounting, orphan collection and the tainting discipline.

use std::path::PathBuf;
use uuid::Uuid;

use bepsync::diff::modify::{CreateFolder, LocalUpdate, NewFile, RemoveFolder, ShareFolder};
use bepsync::identity::{hash_block, DeviceId};
use bepsync::model::folder::FolderSettings;
use bepsync::model::{Cluster, Device};
use bepsync::proto::{ProtoBlockInfo, ProtoFileInfo, ProtoFileType};
use bepsync::{ModelError, Sequencer};

const FOLDER: &str = "1234-5678";

fn self_id() -> DeviceId {
	DeviceId::from_bytes([1; 32])
}

fn peer_id() -> DeviceId {
	DeviceId::from_bytes([2; 32])
}

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
		modified_by: self_id(),
		deleted: false,
		invalid: false,
		no_permissions: false,
		version: Default::default(),
		sequence: 0,
		block_size: if data.is_empty() { 0 } else { data.len() as u32 },
		blocks,
		symlink_target: String::new(),
	}
}

fn seeded_cluster() -> (Cluster, Sequencer) {
	let mut cluster = Cluster::new(Device::new(Uuid::nil(), self_id(), "self"));
	let mut sequencer = Sequencer::with_seed(7);
	let settings = FolderSettings::new(FOLDER, "docs", PathBuf::from("/tmp/docs"));
	CreateFolder::create(&mut sequencer, settings).apply(&mut cluster).unwrap();
	(cluster, sequencer)
}

#[test]
fn new_file_creates_block_and_stamps_sequence() {
	let (mut cluster, mut sequencer) = seeded_cluster();

	let proto = proto_file("a.txt", b"12345");
	let diff = NewFile::create(&cluster, &mut sequencer, FOLDER, proto).unwrap();
	diff.apply(&mut cluster).unwrap();

	let info = cluster.local_folder_info(FOLDER).unwrap();
	assert_eq!(info.max_sequence, 1);
	assert_eq!(cluster.blocks.len(), 1);
	let file = info.file("a.txt").unwrap();
	assert_eq!(file.sequence, 1);
	assert_eq!(file.blocks, vec![hash_block(b"12345")]);
	assert_eq!(file.version.counters().len(), 1);
	assert!(!cluster.is_tainted());

	// invariant: block list length matches the size arithmetic, and the
	// availability bitmap has the same length
	assert_eq!(file.blocks.len(), file.expected_block_count());
	assert_eq!(file.local_blocks.as_ref().unwrap().len(), 1);
	assert!(file.is_locally_available());
}

#[test]
fn local_update_from_empty_to_populated() {
	let (mut cluster, mut sequencer) = seeded_cluster();

	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b""))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	assert_eq!(cluster.blocks.len(), 0);
	assert!(cluster
		.local_folder_info(FOLDER)
		.unwrap()
		.file("a.txt")
		.unwrap()
		.is_locally_available());

	LocalUpdate::create(&cluster, FOLDER, proto_file("a.txt", b"12345"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	let info = cluster.local_folder_info(FOLDER).unwrap();
	let file = info.file("a.txt").unwrap();
	assert_eq!(file.sequence, 2);
	assert_eq!(cluster.blocks.len(), 1);
	assert_eq!(cluster.blocks.get(&hash_block(b"12345")).unwrap().refcount, 1);
	// the self counter was bumped
	assert_eq!(file.version.get(&self_id()), 2);
}

#[test]
fn local_update_back_to_empty_collects_orphans() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b""))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	LocalUpdate::create(&cluster, FOLDER, proto_file("a.txt", b"12345"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	LocalUpdate::create(&cluster, FOLDER, proto_file("a.txt", b""))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	let info = cluster.local_folder_info(FOLDER).unwrap();
	assert_eq!(info.file("a.txt").unwrap().sequence, 3);
	assert_eq!(cluster.blocks.len(), 0);
}

#[test]
fn replacing_content_keeps_refcounts_consistent() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b"aaaa"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("b.txt", b"aaaa"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	// both files reference the same block
	assert_eq!(cluster.blocks.len(), 1);
	assert_eq!(cluster.blocks.get(&hash_block(b"aaaa")).unwrap().refcount, 2);

	// replacing one file's content drops one reference and adds a new block
	LocalUpdate::create(&cluster, FOLDER, proto_file("a.txt", b"bbbb"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	assert_eq!(cluster.blocks.len(), 2);
	assert_eq!(cluster.blocks.get(&hash_block(b"aaaa")).unwrap().refcount, 1);
	assert_eq!(cluster.blocks.get(&hash_block(b"bbbb")).unwrap().refcount, 1);
}

#[test]
fn deleted_file_keeps_version_and_sequence() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b"12345"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	let mut gone = proto_file("a.txt", b"");
	gone.deleted = true;
	LocalUpdate::create(&cluster, FOLDER, gone).unwrap().apply(&mut cluster).unwrap();

	let file = cluster.local_folder_info(FOLDER).unwrap().file("a.txt").unwrap();
	assert!(file.deleted);
	assert_eq!(file.size, 0);
	assert!(file.blocks.is_empty());
	assert_eq!(file.sequence, 2);
	assert!(!file.version.is_empty());
	assert_eq!(cluster.blocks.len(), 0);
}

#[test]
fn share_folder_twice_fails_and_taints() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	cluster.devices.insert(peer_id(), Device::new(Uuid::from_u128(2), peer_id(), "peer"));

	ShareFolder::create(&cluster, &mut sequencer, FOLDER, peer_id())
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	// creating the duplicate share is already refused
	assert!(matches!(
		ShareFolder::create(&cluster, &mut sequencer, FOLDER, peer_id()),
		Err(ModelError::FolderAlreadyShared { .. })
	));

	// forcing the apply anyway taints the cluster
	let forced = bepsync::Diff::new(bepsync::DiffKind::ShareFolder(
		bepsync::diff::modify::ShareFolder {
			folder_id: FOLDER.to_string(),
			device: peer_id(),
			key: Uuid::from_u128(9),
			index_id: 9,
		},
	));
	assert!(forced.apply(&mut cluster).is_err());
	assert!(cluster.is_tainted());

	// a tainted cluster refuses everything else
	let benign = NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("x", b"x")).unwrap();
	assert!(matches!(benign.apply(&mut cluster), Err(ModelError::ClusterTainted)));
}

#[test]
fn create_duplicate_folder_fails() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	let settings = FolderSettings::new(FOLDER, "other", PathBuf::from("/tmp/other"));
	let diff = CreateFolder::create(&mut sequencer, settings);
	assert!(matches!(
		diff.apply(&mut cluster),
		Err(ModelError::FolderAlreadyExists { .. })
	));
}

#[test]
fn remove_folder_orphans_its_blocks() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b"12345"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	assert_eq!(cluster.blocks.len(), 1);

	RemoveFolder::create(&cluster, FOLDER).unwrap().apply(&mut cluster).unwrap();
	assert!(cluster.folder(FOLDER).is_none());
	assert_eq!(cluster.blocks.len(), 0);
	assert!(!cluster.is_tainted());
}

#[test]
fn accepting_a_pending_peer_clears_its_records() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	let diff = bepsync::Diff::new(bepsync::DiffKind::AddPendingDevice(
		bepsync::diff::modify::AddPendingDevice {
			record: bepsync::model::PendingDevice {
				id: peer_id(),
				name: "visitor".to_string(),
				address: "tcp://10.0.0.2:22000".to_string(),
				last_seen: 50,
			},
		},
	));
	diff.apply(&mut cluster).unwrap();
	assert!(cluster.pending_devices.contains_key(&peer_id()));

	bepsync::diff::modify::UpdatePeer::create(&cluster, &mut sequencer, peer_id(), "peer")
		.apply(&mut cluster)
		.unwrap();
	assert!(cluster.devices.contains_key(&peer_id()));
	assert!(!cluster.pending_devices.contains_key(&peer_id()));
}

#[test]
fn removing_a_peer_unshares_and_sweeps() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	cluster.devices.insert(peer_id(), Device::new(Uuid::from_u128(2), peer_id(), "peer"));
	ShareFolder::create(&cluster, &mut sequencer, FOLDER, peer_id())
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	// the peer holds a file whose block nobody else references
	bepsync::diff::peer::UpdateFolder::create(
		&cluster,
		&mut sequencer,
		FOLDER,
		peer_id(),
		vec![{
			let mut f = proto_file("p.txt", b"peer-only");
			f.version = bepsync::VersionVector::single(peer_id(), 1);
			f.sequence = 1;
			f
		}],
	)
	.unwrap()
	.apply(&mut cluster)
	.unwrap();
	assert_eq!(cluster.blocks.len(), 1);

	bepsync::diff::modify::RemovePeer::create(&cluster, peer_id())
		.unwrap()
		.apply(&mut cluster)
		.unwrap();
	assert!(!cluster.devices.contains_key(&peer_id()));
	assert!(!cluster.folder(FOLDER).unwrap().is_shared_with(&peer_id()));
	assert_eq!(cluster.blocks.len(), 0);
	assert!(!cluster.is_tainted());
}

#[test]
fn folder_state_diffs_are_narrow() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b"12345"))
		.unwrap()
		.apply(&mut cluster)
		.unwrap();

	// suspension does not touch settings
	bepsync::Diff::new(bepsync::DiffKind::SuspendFolder(
		bepsync::diff::modify::SuspendFolder {
			folder_id: FOLDER.to_string(),
			suspended: true,
			reason: Some("disk gone".to_string()),
		},
	))
	.apply(&mut cluster)
	.unwrap();
	assert!(cluster.folder(FOLDER).unwrap().suspended);
	assert!(!cluster.folder(FOLDER).unwrap().settings.paused);

	// a scan request only schedules
	bepsync::Diff::new(bepsync::DiffKind::ScanRequest(bepsync::diff::local::ScanRequest {
		folder_id: FOLDER.to_string(),
	}))
	.apply(&mut cluster)
	.unwrap();
	assert!(cluster.folder(FOLDER).unwrap().settings.scheduled);

	// reachability flips only the file flag
	bepsync::Diff::new(bepsync::DiffKind::MarkReachable(
		bepsync::diff::modify::MarkReachable {
			folder_id: FOLDER.to_string(),
			name: "a.txt".to_string(),
			reachable: false,
		},
	))
	.apply(&mut cluster)
	.unwrap();
	let file = cluster.local_folder_info(FOLDER).unwrap().file("a.txt").unwrap();
	assert!(file.unreachable);
	assert!(!file.deleted);

	// locking marks the transfer hold
	bepsync::Diff::new(bepsync::DiffKind::LockFile(bepsync::diff::modify::LockFile {
		folder_id: FOLDER.to_string(),
		device: self_id(),
		name: "a.txt".to_string(),
		locked: true,
	}))
	.apply(&mut cluster)
	.unwrap();
	assert!(cluster.local_folder_info(FOLDER).unwrap().file("a.txt").unwrap().locked);
}

#[test]
fn aggregate_applies_in_order_atomically() {
	let (mut cluster, mut sequencer) = seeded_cluster();
	let first = NewFile::create(&cluster, &mut sequencer, FOLDER, proto_file("a.txt", b"aa"))
		.unwrap();
	// second diff depends on the first being applied; aggregates preserve
	// ordering
	let aggregate = bepsync::Diff::aggregate(vec![first]);
	aggregate.apply(&mut cluster).unwrap();
	assert_eq!(cluster.local_folder_info(FOLDER).unwrap().max_sequence, 1);
}

// vim: ts=4
