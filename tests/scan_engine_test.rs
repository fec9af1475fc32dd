//! Scan engine tests against real directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use tempfile::TempDir;

use bepsync::identity::{hash_block, DeviceId};
use bepsync::model::file_info::FileKind;
use bepsync::scan::{
	HasherPool, LocalMeta, PeerMeta, ScanEngine, ScanEvent, ScanOptions, ScanStatus, TMP_SUFFIX,
};

const FOLDER: &str = "1234-5678";

fn device() -> DeviceId {
	DeviceId::from_bytes([1; 32])
}

fn run_to_completion(engine: &mut ScanEngine, pool: &HasherPool) -> (Vec<ScanEvent>, ScanStatus) {
	let mut events = Vec::new();
	let status = loop {
		let status = engine.tick(pool);
		events.extend(engine.take_events());
		match status {
			ScanStatus::Running => continue,
			ScanStatus::Waiting => match pool.recv() {
				Some(result) => {
					engine.on_hash_result(result, pool);
					continue;
				}
				None => break status,
			},
			other => break other,
		}
	};
	events.extend(engine.take_events());
	(events, status)
}

fn make_engine(
	root: &Path,
	view: BTreeMap<String, LocalMeta>,
	peers: BTreeMap<String, PeerMeta>,
) -> ScanEngine {
	ScanEngine::new(
		FOLDER,
		device(),
		root.to_path_buf(),
		view,
		peers,
		ScanOptions::default(),
		Arc::new(AtomicI64::new(64)),
	)
}

fn updated<'a>(events: &'a [ScanEvent], rel: &str) -> &'a bepsync::proto::ProtoFileInfo {
	events
		.iter()
		.find_map(|e| match e {
			ScanEvent::Updated { proto } if proto.name == rel => Some(proto),
			_ => None,
		})
		.unwrap_or_else(|| panic!("no Updated event for {}", rel))
}

#[test]
fn fresh_directory_is_fully_reported() {
	let tmp = TempDir::new().unwrap();
	fs::write(tmp.path().join("a.txt"), b"hello world").unwrap();
	fs::create_dir(tmp.path().join("sub")).unwrap();
	fs::write(tmp.path().join("sub/b.bin"), b"0123456789").unwrap();

	let pool = HasherPool::new(2, None);
	let mut engine = make_engine(tmp.path(), BTreeMap::new(), BTreeMap::new());
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);

	assert_eq!(events.first(), Some(&ScanEvent::Started));
	assert_eq!(events.last(), Some(&ScanEvent::Finished));

	let a = updated(&events, "a.txt");
	assert_eq!(a.size, 11);
	assert_eq!(a.blocks.len(), 1);
	assert_eq!(a.blocks[0].hash, hash_block(b"hello world"));

	let sub = updated(&events, "sub");
	assert!(matches!(sub.file_type, bepsync::proto::ProtoFileType::Directory));

	let b = updated(&events, "sub/b.bin");
	assert_eq!(b.blocks[0].hash, hash_block(b"0123456789"));
	pool.shutdown();
}

#[test]
fn unchanged_files_short_circuit_to_availability() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("a.txt");
	fs::write(&path, b"stable").unwrap();
	let meta = fs::metadata(&path).unwrap();
	let modified_s = meta
		.modified()
		.unwrap()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap()
		.as_secs() as i64;

	let mut view = BTreeMap::new();
	view.insert(
		"a.txt".to_string(),
		LocalMeta {
			kind: FileKind::File,
			size: 6,
			block_size: 128 * 1024,
			permissions: permissions_of(&meta),
			modified_s,
			symlink_target: String::new(),
			deleted: false,
			invalid: false,
		},
	);

	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(tmp.path(), view, BTreeMap::new());
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);
	assert!(events.contains(&ScanEvent::Unchanged { rel: "a.txt".to_string() }));
	assert!(!events.iter().any(|e| matches!(e, ScanEvent::Updated { .. })));
	pool.shutdown();
}

#[test]
fn touched_mtime_triggers_a_rehash() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("a.txt");
	fs::write(&path, b"stable").unwrap();
	let meta = fs::metadata(&path).unwrap();
	let modified_s = meta
		.modified()
		.unwrap()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap()
		.as_secs() as i64;

	let mut view = BTreeMap::new();
	view.insert(
		"a.txt".to_string(),
		LocalMeta {
			kind: FileKind::File,
			size: 6,
			block_size: 128 * 1024,
			permissions: permissions_of(&meta),
			modified_s,
			symlink_target: String::new(),
			deleted: false,
			invalid: false,
		},
	);

	// same size and content, different mtime: the file is rehashed
	filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(modified_s + 60, 0))
		.unwrap();

	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(tmp.path(), view, BTreeMap::new());
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);
	let a = updated(&events, "a.txt");
	assert_eq!(a.blocks[0].hash, hash_block(b"stable"));
	pool.shutdown();
}

#[test]
fn missing_model_entries_are_reported_deleted() {
	let tmp = TempDir::new().unwrap();

	let mut view = BTreeMap::new();
	view.insert(
		"gone.txt".to_string(),
		LocalMeta {
			kind: FileKind::File,
			size: 3,
			block_size: 128 * 1024,
			permissions: 0o644,
			modified_s: 100,
			symlink_target: String::new(),
			deleted: false,
			invalid: false,
		},
	);
	view.insert(
		"lost-dir".to_string(),
		LocalMeta {
			kind: FileKind::Directory,
			size: 0,
			block_size: 0,
			permissions: 0o755,
			modified_s: 100,
			symlink_target: String::new(),
			deleted: false,
			invalid: false,
		},
	);
	view.insert(
		"lost-dir/inner.txt".to_string(),
		LocalMeta {
			kind: FileKind::File,
			size: 3,
			block_size: 128 * 1024,
			permissions: 0o644,
			modified_s: 100,
			symlink_target: String::new(),
			deleted: false,
			invalid: false,
		},
	);

	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(tmp.path(), view, BTreeMap::new());
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);
	assert!(events.contains(&ScanEvent::Deleted { rel: "gone.txt".to_string() }));
	assert!(events.contains(&ScanEvent::Deleted { rel: "lost-dir".to_string() }));
	assert!(events.contains(&ScanEvent::Deleted { rel: "lost-dir/inner.txt".to_string() }));
	pool.shutdown();
}

#[test]
fn matching_temp_file_is_renamed_into_place() {
	let tmp = TempDir::new().unwrap();
	let content = b"downloaded";
	fs::write(tmp.path().join(format!("c.txt{}", TMP_SUFFIX)), content).unwrap();

	let mut peers = BTreeMap::new();
	peers.insert(
		"c.txt".to_string(),
		PeerMeta {
			device: DeviceId::from_bytes([2; 32]),
			size: content.len() as u64,
			block_size: 128 * 1024,
			blocks: vec![hash_block(content)],
			synchronizing: false,
		},
	);

	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(tmp.path(), BTreeMap::new(), peers);
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);

	assert!(tmp.path().join("c.txt").exists());
	assert!(!tmp.path().join(format!("c.txt{}", TMP_SUFFIX)).exists());
	let c = updated(&events, "c.txt");
	assert_eq!(c.blocks[0].hash, hash_block(content));
	pool.shutdown();
}

#[test]
fn partially_matching_temp_file_reports_block_availability() {
	let tmp = TempDir::new().unwrap();
	// first block matches the peer, second does not
	fs::write(tmp.path().join(format!("d.bin{}", TMP_SUFFIX)), b"XXXXgarbage!").unwrap();

	let mut peers = BTreeMap::new();
	peers.insert(
		"d.bin".to_string(),
		PeerMeta {
			device: DeviceId::from_bytes([2; 32]),
			size: 8,
			block_size: 4,
			blocks: vec![hash_block(b"XXXX"), hash_block(b"YYYY")],
			synchronizing: false,
		},
	);

	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(tmp.path(), BTreeMap::new(), peers);
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);
	assert!(events
		.contains(&ScanEvent::TempBlocks { rel: "d.bin".to_string(), indexes: vec![0] }));
	pool.shutdown();
}

#[test]
fn orphaned_temp_file_is_removed() {
	let tmp = TempDir::new().unwrap();
	let tmp_file = tmp.path().join(format!("e.txt{}", TMP_SUFFIX));
	fs::write(&tmp_file, b"junk").unwrap();

	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(tmp.path(), BTreeMap::new(), BTreeMap::new());
	let (_, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);
	assert!(!tmp_file.exists());
	pool.shutdown();
}

#[test]
fn ignored_names_are_recorded_invalid() {
	let tmp = TempDir::new().unwrap();
	fs::write(tmp.path().join("keep.txt"), b"keep").unwrap();
	fs::write(tmp.path().join("skip.log"), b"skip").unwrap();

	let ignoring_engine = |view: BTreeMap<String, LocalMeta>| {
		ScanEngine::new(
			FOLDER,
			device(),
			tmp.path().to_path_buf(),
			view,
			BTreeMap::new(),
			ScanOptions { ignore_patterns: vec!["*.log".to_string()], ..ScanOptions::default() },
			Arc::new(AtomicI64::new(64)),
		)
	};

	let pool = HasherPool::new(1, None);
	let mut engine = ignoring_engine(BTreeMap::new());
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);

	let keep = updated(&events, "keep.txt");
	assert!(!keep.invalid);
	assert_eq!(keep.blocks[0].hash, hash_block(b"keep"));

	// the ignored entry still gets a record, marked invalid and never hashed
	let skip = updated(&events, "skip.log");
	assert!(skip.invalid);
	assert!(skip.blocks.is_empty());
	assert_eq!(skip.size, 0);
	// not reported as deleted either
	assert!(!events.contains(&ScanEvent::Deleted { rel: "skip.log".to_string() }));

	// a rescan with the invalid record in the view leaves it untouched
	let mut view = BTreeMap::new();
	view.insert(
		"skip.log".to_string(),
		LocalMeta {
			kind: FileKind::File,
			size: 0,
			block_size: 0,
			permissions: skip.permissions,
			modified_s: skip.modified_s,
			symlink_target: String::new(),
			deleted: false,
			invalid: true,
		},
	);
	let mut engine = ignoring_engine(view);
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Finished);
	assert!(events.contains(&ScanEvent::Unchanged { rel: "skip.log".to_string() }));
	assert!(!events.iter().any(
		|e| matches!(e, ScanEvent::Updated { proto } if proto.name == "skip.log")
	));
	pool.shutdown();
}

#[test]
fn missing_root_suspends_the_folder() {
	let pool = HasherPool::new(1, None);
	let mut engine = make_engine(
		Path::new("/nonexistent/bepsync-test-root"),
		BTreeMap::new(),
		BTreeMap::new(),
	);
	let (events, status) = run_to_completion(&mut engine, &pool);
	assert_eq!(status, ScanStatus::Suspended);
	assert!(events.iter().any(|e| matches!(e, ScanEvent::Suspended { .. })));
	pool.shutdown();
}

#[test]
fn symlinks_are_compared_by_target() {
	let tmp = TempDir::new().unwrap();
	#[cfg(unix)]
	{
		std::os::unix::fs::symlink("target-a", tmp.path().join("link")).unwrap();

		let mut view = BTreeMap::new();
		view.insert(
			"link".to_string(),
			LocalMeta {
				kind: FileKind::Symlink,
				size: 0,
				block_size: 0,
				permissions: 0o777,
				modified_s: 0,
				symlink_target: "target-a".to_string(),
				deleted: false,
				invalid: false,
			},
		);
		let pool = HasherPool::new(1, None);
		let mut engine = make_engine(tmp.path(), view, BTreeMap::new());
		let (events, _) = run_to_completion(&mut engine, &pool);
		assert!(events.contains(&ScanEvent::Unchanged { rel: "link".to_string() }));
		pool.shutdown();

		// a changed target is an update
		let mut view = BTreeMap::new();
		view.insert(
			"link".to_string(),
			LocalMeta {
				kind: FileKind::Symlink,
				size: 0,
				block_size: 0,
				permissions: 0o777,
				modified_s: 0,
				symlink_target: "target-b".to_string(),
				deleted: false,
				invalid: false,
			},
		);
		let pool = HasherPool::new(1, None);
		let mut engine = make_engine(tmp.path(), view, BTreeMap::new());
		let (events, _) = run_to_completion(&mut engine, &pool);
		let link = updated(&events, "link");
		assert_eq!(link.symlink_target, "target-a");
		assert!(link.blocks.is_empty());
		pool.shutdown();
	}
}

#[cfg(unix)]
fn permissions_of(meta: &fs::Metadata) -> u32 {
	use std::os::unix::fs::PermissionsExt;
	meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions_of(_meta: &fs::Metadata) -> u32 {
	0o644
}

// vim: ts=4
