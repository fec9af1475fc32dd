//! Per-folder scan state machine
//!
//! The engine walks the folder with a task stack, reconciles disk contents
//! against the snapshot of the local view, schedules block hashing on the
//! worker pool within the global concurrency budget, and accumulates the
//! events one tick turns into a single model update.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use globset::{Glob, GlobSet, GlobSetBuilder};

use super::hasher::{HashJob, HashResult, HashedBlock, HasherPool};
use super::task::{DiskEntry, ScanTask};
use super::{block_size_for, LocalMeta, PeerMeta, ScanEvent, TMP_SUFFIX};
use crate::identity::DeviceId;
use crate::logging::*;
use crate::model::file_info::FileKind;
use crate::proto::{ProtoBlockInfo, ProtoFileInfo};

#[derive(Debug, Clone)]
pub struct ScanOptions {
	/// Files examined per tick before yielding
	pub files_scan_iteration_limit: usize,
	/// Bytes of hashed content per tick before yielding
	pub bytes_scan_iteration_limit: u64,
	/// Consecutive blocks per hash job
	pub blocks_per_segment: u32,
	pub ignore_permissions: bool,
	/// Glob patterns of names excluded from the scan
	pub ignore_patterns: Vec<String>,
}

impl Default for ScanOptions {
	fn default() -> Self {
		ScanOptions {
			files_scan_iteration_limit: 64,
			bytes_scan_iteration_limit: 16 * 1024 * 1024,
			blocks_per_segment: 16,
			ignore_permissions: false,
			ignore_patterns: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
	/// More stack work is ready; call `tick` again
	Running,
	/// Hashing is in flight or the budget is exhausted; wait for results
	Waiting,
	/// Folder-level I/O error; a rescan must be requested
	Suspended,
	Finished,
	Fatal,
}

enum PendingKind {
	/// A tracked file of the local view
	Tracked(DiskEntry),
	/// A partial download, compared against the best peer candidate
	Temp { rel: String, abs: PathBuf },
}

struct PendingHash {
	kind: PendingKind,
	block_size: u32,
	total_blocks: u32,
	next_block: u32,
	received: BTreeMap<u32, HashedBlock>,
	/// Blocks submitted to the pool and not yet returned
	outstanding: u32,
	failed: Option<String>,
}

pub struct ScanEngine {
	folder_id: String,
	device: DeviceId,
	root: PathBuf,
	view: BTreeMap<String, LocalMeta>,
	peers: BTreeMap<String, PeerMeta>,
	options: ScanOptions,
	ignore: Option<GlobSet>,
	stack: Vec<ScanTask>,
	seen: BTreeSet<String>,
	events: Vec<ScanEvent>,
	/// Global concurrent-hash budget, shared across folders
	hashes_left: Arc<AtomicI64>,
	in_flight: BTreeMap<String, PendingHash>,
	/// Debited block counts per job, credited back on completion
	jobs: BTreeMap<u64, u32>,
	next_job_id: u64,
	swept: bool,
	suspended: bool,
	finished: bool,
	fatal: bool,
}

impl ScanEngine {
	pub fn new(
		folder_id: &str,
		device: DeviceId,
		root: PathBuf,
		view: BTreeMap<String, LocalMeta>,
		peers: BTreeMap<String, PeerMeta>,
		options: ScanOptions,
		hashes_left: Arc<AtomicI64>,
	) -> Self {
		let ignore = compile_ignore(&options.ignore_patterns);
		let stack = vec![ScanTask::CompleteScan, ScanTask::UnscannedDir { rel: String::new() }];
		ScanEngine {
			folder_id: folder_id.to_string(),
			device,
			root,
			view,
			peers,
			options,
			ignore,
			stack,
			seen: BTreeSet::new(),
			events: vec![ScanEvent::Started],
			hashes_left,
			in_flight: BTreeMap::new(),
			jobs: BTreeMap::new(),
			next_job_id: 0,
			swept: false,
			suspended: false,
			finished: false,
			fatal: false,
		}
	}

	pub fn folder_id(&self) -> &str {
		&self.folder_id
	}

	/// Drain the accumulated events; one call per tick builds one update
	pub fn take_events(&mut self) -> Vec<ScanEvent> {
		std::mem::take(&mut self.events)
	}

	/// Resume a suspended engine; restarts the walk from the root
	pub fn unsuspend(&mut self) {
		if self.suspended {
			self.stack.push(ScanTask::UnsuspendScan);
		}
	}

	/// Run one scheduler turn: absorb hash results, then work the stack
	/// within the per-tick limits.
	pub fn tick(&mut self, pool: &HasherPool) -> ScanStatus {
		self.pump_results(pool);
		if self.fatal {
			return ScanStatus::Fatal;
		}
		if self.suspended {
			// only UnsuspendScan may be processed while suspended
			if matches!(self.stack.last(), Some(ScanTask::UnsuspendScan)) {
				if let Some(task) = self.stack.pop() {
					self.process(task, pool);
				}
			} else {
				return ScanStatus::Suspended;
			}
		}
		self.resume_stalled(pool);
		let mut examined = 0usize;
		let mut hashed_bytes = 0u64;
		while let Some(task) = self.stack.pop() {
			if matches!(task, ScanTask::CompleteScan) && !self.in_flight.is_empty() {
				// hashing still in flight; completion stays queued behind it
				self.stack.insert(0, ScanTask::CompleteScan);
				return ScanStatus::Waiting;
			}
			if let ScanTask::Unexamined { .. } = &task {
				examined += 1;
			}
			hashed_bytes += self.process(task, pool);
			if self.fatal {
				return ScanStatus::Fatal;
			}
			if self.suspended {
				return ScanStatus::Suspended;
			}
			if self.finished {
				return ScanStatus::Finished;
			}
			if examined >= self.options.files_scan_iteration_limit
				|| hashed_bytes >= self.options.bytes_scan_iteration_limit
			{
				return ScanStatus::Running;
			}
		}
		if self.in_flight.is_empty() {
			ScanStatus::Running
		} else {
			ScanStatus::Waiting
		}
	}

	/// Absorb every ready hash result
	pub fn pump_results(&mut self, pool: &HasherPool) {
		while let Some(result) = pool.try_recv() {
			self.on_hash_result(result, pool);
		}
	}

	/// Files that ran out of budget with nothing in flight get another try;
	/// other folders' completions may have freed the budget meanwhile.
	fn resume_stalled(&mut self, pool: &HasherPool) {
		let stalled: Vec<(String, PathBuf)> = self
			.in_flight
			.iter()
			.filter(|(_, p)| {
				p.failed.is_none() && p.outstanding == 0 && p.next_block < p.total_blocks
			})
			.map(|(rel, p)| {
				let abs = match &p.kind {
					PendingKind::Tracked(entry) => entry.abs.clone(),
					PendingKind::Temp { abs, .. } => abs.clone(),
				};
				(rel.clone(), abs)
			})
			.collect();
		for (rel, abs) in stalled {
			self.submit_segments(&rel, &abs, pool);
		}
	}

	fn process(&mut self, task: ScanTask, pool: &HasherPool) -> u64 {
		match task {
			ScanTask::CompleteScan => self.complete_scan(),
			ScanTask::UnscannedDir { rel } => {
				self.stack.push(ScanTask::ScanDir { rel });
			}
			ScanTask::ScanDir { rel } => self.scan_dir(&rel),
			ScanTask::Unexamined { entry } => self.examine(entry),
			ScanTask::HashFile { entry } => {
				let bytes = entry.size;
				self.start_tracked_hash(entry, pool);
				return bytes;
			}
			ScanTask::Incomplete { rel, abs, size } => {
				let bytes = size;
				self.start_temp_hash(rel, abs, pool);
				return bytes;
			}
			ScanTask::RehashedIncomplete { rel, abs, blocks } => {
				self.finish_temp(rel, abs, blocks);
			}
			ScanTask::RemovedDir { rel } => self.removed_dir(&rel),
			ScanTask::ConfirmedDeleted { rel } => {
				self.events.push(ScanEvent::Deleted { rel });
			}
			ScanTask::SuspendScan { message } => {
				warn!("folder {}: scan suspended: {}", self.folder_id, message);
				self.events.push(ScanEvent::Suspended { message });
				self.suspended = true;
			}
			ScanTask::UnsuspendScan => {
				self.suspended = false;
				self.swept = false;
				self.seen.clear();
				self.stack.push(ScanTask::CompleteScan);
				self.stack.push(ScanTask::UnscannedDir { rel: String::new() });
			}
			ScanTask::FatalError { message } => {
				error!("folder {}: fatal scan error: {}", self.folder_id, message);
				self.fatal = true;
			}
		}
		0
	}

	/// Terminal task: sweep for deletions, then report completion. `tick`
	/// keeps this queued while hashing is in flight.
	fn complete_scan(&mut self) {
		if !self.swept {
			self.swept = true;
			self.stack.push(ScanTask::CompleteScan);
			let missing = self.missing_entries();
			for (rel, kind) in missing.into_iter().rev() {
				match kind {
					FileKind::Directory => self.stack.push(ScanTask::RemovedDir { rel }),
					_ => self.stack.push(ScanTask::ConfirmedDeleted { rel }),
				}
			}
			return;
		}
		self.events.push(ScanEvent::Finished);
		self.finished = true;
	}

	/// Model entries that never showed up on disk, collapsed so a missing
	/// directory covers its subtree.
	fn missing_entries(&self) -> Vec<(String, FileKind)> {
		let mut missing = Vec::new();
		let mut covered: Option<String> = None;
		for (name, meta) in &self.view {
			if meta.deleted || self.seen.contains(name) {
				continue;
			}
			if let Some(prefix) = &covered {
				if name.starts_with(prefix.as_str()) && name[prefix.len()..].starts_with('/') {
					continue;
				}
			}
			if meta.kind == FileKind::Directory {
				covered = Some(name.clone());
			}
			missing.push((name.clone(), meta.kind));
		}
		missing
	}

	fn removed_dir(&mut self, rel: &str) {
		self.events.push(ScanEvent::Deleted { rel: rel.to_string() });
		let prefix = format!("{}/", rel);
		let doomed: Vec<String> = self
			.view
			.iter()
			.filter(|(name, meta)| name.starts_with(&prefix) && !meta.deleted)
			.map(|(name, _)| name.clone())
			.collect();
		for name in doomed {
			self.events.push(ScanEvent::Deleted { rel: name });
		}
	}

	fn scan_dir(&mut self, rel: &str) {
		let abs = self.abs_path(rel);
		let entries = match std::fs::read_dir(&abs) {
			Ok(entries) => entries,
			Err(e) => {
				if rel.is_empty() {
					self.stack.push(ScanTask::SuspendScan {
						message: format!("{}: {}", abs.display(), e),
					});
				} else {
					self.events.push(ScanEvent::IoFailure {
						rel: rel.to_string(),
						message: e.to_string(),
					});
				}
				return;
			}
		};
		for dirent in entries {
			let dirent = match dirent {
				Ok(dirent) => dirent,
				Err(e) => {
					self.events.push(ScanEvent::IoFailure {
						rel: rel.to_string(),
						message: e.to_string(),
					});
					continue;
				}
			};
			let name = dirent.file_name().to_string_lossy().into_owned();
			let child_rel =
				if rel.is_empty() { name.clone() } else { format!("{}/{}", rel, name) };
			let child_abs = dirent.path();
			if let Some(ignore) = &self.ignore {
				if ignore.is_match(&child_rel) {
					self.seen.insert(child_rel.clone());
					// ignored by policy: recorded as invalid, never hashed
					// or synced, and ignored directories are not descended
					let already_invalid = self
						.view
						.get(&child_rel)
						.map(|m| m.invalid && !m.deleted)
						.unwrap_or(false);
					if already_invalid {
						self.events.push(ScanEvent::Unchanged { rel: child_rel });
					} else {
						match self.read_entry(&child_rel, &child_abs) {
							Ok(entry) => {
								let mut proto = self.entry_proto(&entry, Vec::new());
								proto.invalid = true;
								self.events.push(ScanEvent::Updated { proto });
							}
							Err(message) => {
								self.events.push(ScanEvent::IoFailure {
									rel: child_rel,
									message,
								});
							}
						}
					}
					continue;
				}
			}
			if let Some(final_name) = name.strip_suffix(TMP_SUFFIX) {
				let final_rel = if rel.is_empty() {
					final_name.to_string()
				} else {
					format!("{}/{}", rel, final_name)
				};
				let size = std::fs::symlink_metadata(&child_abs)
					.map(|m| m.len())
					.unwrap_or(0);
				self.seen.insert(final_rel.clone());
				self.stack.push(ScanTask::Incomplete { rel: final_rel, abs: child_abs, size });
				continue;
			}
			match self.read_entry(&child_rel, &child_abs) {
				Ok(entry) => self.stack.push(ScanTask::Unexamined { entry }),
				Err(message) => {
					self.events.push(ScanEvent::IoFailure { rel: child_rel, message });
				}
			}
		}
	}

	fn read_entry(&self, rel: &str, abs: &Path) -> Result<DiskEntry, String> {
		let meta = std::fs::symlink_metadata(abs).map_err(|e| e.to_string())?;
		let file_type = meta.file_type();
		let (kind, symlink_target) = if file_type.is_symlink() {
			let target = std::fs::read_link(abs)
				.map(|t| t.to_string_lossy().into_owned())
				.map_err(|e| e.to_string())?;
			(FileKind::Symlink, target)
		} else if file_type.is_dir() {
			(FileKind::Directory, String::new())
		} else {
			(FileKind::File, String::new())
		};
		let modified = meta
			.modified()
			.ok()
			.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
			.unwrap_or_default();
		Ok(DiskEntry {
			rel: rel.to_string(),
			abs: abs.to_path_buf(),
			kind,
			size: if kind == FileKind::File { meta.len() } else { 0 },
			modified_s: modified.as_secs() as i64,
			modified_ns: modified.subsec_nanos(),
			permissions: permissions_of(&meta),
			symlink_target,
		})
	}

	/// Classify one entry; unchanged content short-circuits to availability
	fn examine(&mut self, entry: DiskEntry) {
		self.seen.insert(entry.rel.clone());
		let unchanged = self.matches_model(&entry);
		match entry.kind {
			FileKind::Symlink => {
				if unchanged {
					self.events.push(ScanEvent::Unchanged { rel: entry.rel });
				} else {
					let proto = self.entry_proto(&entry, Vec::new());
					self.events.push(ScanEvent::Updated { proto });
				}
			}
			FileKind::Directory => {
				if unchanged {
					self.events.push(ScanEvent::Unchanged { rel: entry.rel.clone() });
				} else {
					let proto = self.entry_proto(&entry, Vec::new());
					self.events.push(ScanEvent::Updated { proto });
				}
				self.stack.push(ScanTask::UnscannedDir { rel: entry.rel });
			}
			FileKind::File => {
				if unchanged {
					self.events.push(ScanEvent::Unchanged { rel: entry.rel });
				} else if entry.size == 0 {
					let proto = self.entry_proto(&entry, Vec::new());
					self.events.push(ScanEvent::Updated { proto });
				} else {
					self.stack.push(ScanTask::HashFile { entry });
				}
			}
		}
	}

	fn matches_model(&self, entry: &DiskEntry) -> bool {
		let meta = match self.view.get(&entry.rel) {
			// an invalid record never matches: once the entry stops being
			// ignored it must be re-recorded as valid content
			Some(meta) if !meta.deleted && !meta.invalid => meta,
			_ => return false,
		};
		if meta.kind != entry.kind {
			return false;
		}
		match entry.kind {
			FileKind::Symlink => meta.symlink_target == entry.symlink_target,
			FileKind::Directory => {
				self.options.ignore_permissions || meta.permissions == entry.permissions
			}
			FileKind::File => {
				meta.size == entry.size
					&& meta.modified_s == entry.modified_s
					&& (self.options.ignore_permissions || meta.permissions == entry.permissions)
			}
		}
	}

	fn entry_proto(&self, entry: &DiskEntry, blocks: Vec<HashedBlock>) -> ProtoFileInfo {
		let size: u64 = blocks.iter().map(|b| b.size as u64).sum();
		let block_size = if blocks.is_empty() { 0 } else { block_size_for(entry.size) };
		let mut offset = 0u64;
		let proto_blocks = blocks
			.into_iter()
			.map(|b| {
				let info = ProtoBlockInfo {
					offset,
					size: b.size,
					hash: b.hash,
					weak_hash: b.weak_hash,
				};
				offset += info.size as u64;
				info
			})
			.collect();
		ProtoFileInfo {
			name: entry.rel.clone(),
			file_type: entry.kind.into(),
			size,
			permissions: entry.permissions,
			modified_s: entry.modified_s,
			modified_ns: entry.modified_ns,
			modified_by: self.device,
			deleted: false,
			invalid: false,
			no_permissions: false,
			version: Default::default(),
			sequence: 0,
			block_size,
			blocks: proto_blocks,
			symlink_target: entry.symlink_target.clone(),
		}
	}

	fn start_tracked_hash(&mut self, entry: DiskEntry, pool: &HasherPool) {
		let block_size = block_size_for(entry.size);
		let total = ((entry.size + block_size as u64 - 1) / block_size as u64) as u32;
		let rel = entry.rel.clone();
		let abs = entry.abs.clone();
		let pending = PendingHash {
			kind: PendingKind::Tracked(entry),
			block_size,
			total_blocks: total,
			next_block: 0,
			received: BTreeMap::new(),
			outstanding: 0,
			failed: None,
		};
		self.in_flight.insert(rel.clone(), pending);
		self.submit_segments(&rel, &abs, pool);
	}

	fn start_temp_hash(&mut self, rel: String, abs: PathBuf, pool: &HasherPool) {
		let peer = match self.peers.get(&rel) {
			Some(peer) if !peer.synchronizing => peer.clone(),
			// no candidate, or a transfer owns it: the partial file goes
			Some(_) | None => {
				let _ = std::fs::remove_file(&abs);
				return;
			}
		};
		let total = peer.blocks.len() as u32;
		if total == 0 {
			let _ = std::fs::remove_file(&abs);
			return;
		}
		let pending = PendingHash {
			kind: PendingKind::Temp { rel: rel.clone(), abs: abs.clone() },
			block_size: peer.block_size,
			total_blocks: total,
			next_block: 0,
			received: BTreeMap::new(),
			outstanding: 0,
			failed: None,
		};
		self.in_flight.insert(rel.clone(), pending);
		self.submit_segments(&rel, &abs, pool);
	}

	/// Submit as many segments as the global budget allows
	fn submit_segments(&mut self, rel: &str, abs: &Path, pool: &HasherPool) {
		loop {
			let (first, count, block_size) = {
				let pending = match self.in_flight.get(rel) {
					Some(pending) => pending,
					None => return,
				};
				if pending.failed.is_some() || pending.next_block >= pending.total_blocks {
					return;
				}
				let remaining = pending.total_blocks - pending.next_block;
				let want = remaining.min(self.options.blocks_per_segment);
				let granted = debit(&self.hashes_left, want);
				if granted == 0 {
					return;
				}
				(pending.next_block, granted, pending.block_size)
			};
			self.next_job_id += 1;
			let job_id = self.next_job_id;
			self.jobs.insert(job_id, count);
			if let Some(pending) = self.in_flight.get_mut(rel) {
				pending.next_block += count;
				pending.outstanding += count;
			}
			pool.submit(HashJob {
				job_id,
				folder: self.folder_id.clone(),
				rel: rel.to_string(),
				path: abs.to_path_buf(),
				block_size,
				first_block: first,
				block_count: count,
			});
		}
	}

	/// Feed one result back; the daemon routes results by their folder
	pub fn on_hash_result(&mut self, result: HashResult, pool: &HasherPool) {
		let debited = self.jobs.remove(&result.job_id).unwrap_or(0);
		self.hashes_left.fetch_add(debited as i64, Ordering::AcqRel);

		let rel = result.rel.clone();
		let abs = {
			let pending = match self.in_flight.get_mut(&rel) {
				Some(pending) => pending,
				None => return,
			};
			pending.outstanding = pending.outstanding.saturating_sub(debited);
			if let Some(message) = result.error {
				pending.failed = Some(message);
			} else {
				let short = (result.blocks.len() as u32) < debited;
				for block in result.blocks {
					pending.received.insert(block.index, block);
				}
				if short {
					// the file ended early; do not wait for blocks past
					// the end
					let end =
						pending.received.keys().next_back().map(|i| i + 1).unwrap_or(0);
					pending.total_blocks = end;
					pending.next_block = pending.next_block.min(end);
				}
			}
			match &pending.kind {
				PendingKind::Tracked(entry) => entry.abs.clone(),
				PendingKind::Temp { abs, .. } => abs.clone(),
			}
		};

		self.submit_segments(&rel, &abs, pool);

		let done = {
			let pending = match self.in_flight.get(&rel) {
				Some(pending) => pending,
				None => return,
			};
			pending.outstanding == 0
				&& (pending.failed.is_some() || pending.next_block >= pending.total_blocks)
		};
		if done {
			if let Some(pending) = self.in_flight.remove(&rel) {
				self.finalize_hash(rel, pending);
			}
		}
	}

	fn finalize_hash(&mut self, rel: String, pending: PendingHash) {
		let blocks: Vec<HashedBlock> = pending.received.into_iter().map(|(_, b)| b).collect();
		match pending.kind {
			PendingKind::Tracked(entry) => {
				if let Some(message) = pending.failed {
					// tracked files survive a read failure as unreachable
					self.events.push(ScanEvent::IoFailure { rel, message });
					return;
				}
				let proto = self.entry_proto(&entry, blocks);
				self.events.push(ScanEvent::Updated { proto });
			}
			PendingKind::Temp { rel, abs } => {
				if pending.failed.is_some() {
					let _ = std::fs::remove_file(&abs);
					return;
				}
				self.stack.push(ScanTask::RehashedIncomplete { rel, abs, blocks });
			}
		}
	}

	/// Compare a rehashed partial file against the peer's block list
	fn finish_temp(&mut self, rel: String, abs: PathBuf, blocks: Vec<HashedBlock>) {
		let peer = match self.peers.get(&rel) {
			Some(peer) => peer,
			None => {
				let _ = std::fs::remove_file(&abs);
				return;
			}
		};
		let matching: Vec<u32> = blocks
			.iter()
			.filter(|b| {
				peer.blocks.get(b.index as usize).map(|hash| *hash == b.hash).unwrap_or(false)
			})
			.map(|b| b.index)
			.collect();
		if matching.len() == peer.blocks.len() && blocks.len() == peer.blocks.len() {
			// everything present: move into place and report the content
			let final_abs = self.abs_path(&rel);
			if let Err(e) = std::fs::rename(&abs, &final_abs) {
				self.events.push(ScanEvent::IoFailure { rel, message: e.to_string() });
				return;
			}
			match self.read_entry(&rel, &final_abs) {
				Ok(entry) => {
					let proto = self.entry_proto(&entry, blocks);
					self.events.push(ScanEvent::Updated { proto });
				}
				Err(message) => {
					self.events.push(ScanEvent::IoFailure { rel, message });
				}
			}
		} else if !matching.is_empty() {
			self.events.push(ScanEvent::TempBlocks { rel, indexes: matching });
		} else {
			let _ = std::fs::remove_file(&abs);
		}
	}

	fn abs_path(&self, rel: &str) -> PathBuf {
		if rel.is_empty() {
			self.root.clone()
		} else {
			self.root.join(rel)
		}
	}
}

/// Take up to `want` from the shared budget; returns what was granted
fn debit(budget: &AtomicI64, want: u32) -> u32 {
	let mut current = budget.load(Ordering::Acquire);
	loop {
		if current <= 0 {
			return 0;
		}
		let take = current.min(want as i64) as u32;
		match budget.compare_exchange(
			current,
			current - take as i64,
			Ordering::AcqRel,
			Ordering::Acquire,
		) {
			Ok(_) => return take,
			Err(actual) => current = actual,
		}
	}
}

fn compile_ignore(patterns: &[String]) -> Option<GlobSet> {
	if patterns.is_empty() {
		return None;
	}
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		match Glob::new(pattern) {
			Ok(glob) => {
				builder.add(glob);
			}
			Err(e) => {
				warn!("ignoring invalid pattern {}: {}", pattern, e);
			}
		}
	}
	builder.build().ok()
}

#[cfg(unix)]
fn permissions_of(meta: &std::fs::Metadata) -> u32 {
	use std::os::unix::fs::PermissionsExt;
	meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions_of(meta: &std::fs::Metadata) -> u32 {
	if meta.permissions().readonly() {
		0o444
	} else {
		0o644
	}
}

// vim: ts=4
