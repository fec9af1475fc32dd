//! File records and their local-availability bitmap

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::path::InternedPath;
use super::version::VersionVector;
use super::Augmentation;
use crate::identity::{BlockHash, DeviceId};
use crate::proto::{ProtoBlockInfo, ProtoFileInfo, ProtoFileType};

/// File classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
	File,
	Directory,
	Symlink,
}

impl From<ProtoFileType> for FileKind {
	fn from(t: ProtoFileType) -> Self {
		match t {
			ProtoFileType::File => FileKind::File,
			ProtoFileType::Directory => FileKind::Directory,
			ProtoFileType::Symlink => FileKind::Symlink,
		}
	}
}

impl From<FileKind> for ProtoFileType {
	fn from(k: FileKind) -> Self {
		match k {
			FileKind::File => ProtoFileType::File,
			FileKind::Directory => ProtoFileType::Directory,
			FileKind::Symlink => ProtoFileType::Symlink,
		}
	}
}

/// Fixed-size bitmap, one bit per block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
	bits: usize,
	words: Vec<u64>,
}

impl Bitmap {
	pub fn new(bits: usize, filled: bool) -> Self {
		let word_count = (bits + 63) / 64;
		let mut words = vec![if filled { u64::MAX } else { 0 }; word_count];
		if filled && bits % 64 != 0 {
			if let Some(last) = words.last_mut() {
				*last = (1u64 << (bits % 64)) - 1;
			}
		}
		Bitmap { bits, words }
	}

	pub fn len(&self) -> usize {
		self.bits
	}

	pub fn is_empty(&self) -> bool {
		self.bits == 0
	}

	pub fn get(&self, i: usize) -> bool {
		if i >= self.bits {
			return false;
		}
		self.words[i / 64] & (1u64 << (i % 64)) != 0
	}

	pub fn set(&mut self, i: usize) {
		if i < self.bits {
			self.words[i / 64] |= 1u64 << (i % 64);
		}
	}

	pub fn clear(&mut self, i: usize) {
		if i < self.bits {
			self.words[i / 64] &= !(1u64 << (i % 64));
		}
	}

	pub fn count_set(&self) -> usize {
		self.words.iter().map(|w| w.count_ones() as usize).sum()
	}

	pub fn all_set(&self) -> bool {
		self.count_set() == self.bits
	}
}

/// A file, directory or symlink inside one folder-info view
#[derive(Debug, Clone)]
pub struct FileInfo {
	pub key: Uuid,
	pub path: InternedPath,
	pub kind: FileKind,
	pub size: u64,
	pub block_size: u32,
	pub permissions: u32,
	pub modified_s: i64,
	pub modified_ns: u32,
	pub modified_by: DeviceId,
	pub deleted: bool,
	pub invalid: bool,
	pub no_permissions: bool,
	pub symlink_target: String,
	pub version: VersionVector,
	pub sequence: u64,
	/// Ordered block references; hashes index the content store
	pub blocks: Vec<BlockHash>,
	/// Which blocks are present on disk. `None` for peer views.
	pub local_blocks: Option<Bitmap>,
	/// Local content is known but currently unreadable
	pub unreachable: bool,
	/// A transfer holds the file; concurrent mutation is deferred
	pub locked: bool,
	/// The version lost a conflict locally; not re-requested until the
	/// peer advances past it
	pub suppressed: bool,
	pub augmentation: Augmentation,
}

impl FileInfo {
	/// Build a record from a decoded protocol file
	pub fn from_proto(key: Uuid, path: InternedPath, proto: &ProtoFileInfo) -> Self {
		FileInfo {
			key,
			path,
			kind: proto.file_type.into(),
			size: proto.size,
			block_size: proto.block_size,
			permissions: proto.permissions,
			modified_s: proto.modified_s,
			modified_ns: proto.modified_ns,
			modified_by: proto.modified_by,
			deleted: proto.deleted,
			invalid: proto.invalid,
			no_permissions: proto.no_permissions,
			symlink_target: proto.symlink_target.clone(),
			version: proto.version.clone(),
			sequence: proto.sequence,
			blocks: proto.blocks.iter().map(|b| b.hash).collect(),
			local_blocks: None,
			unreachable: false,
			locked: false,
			suppressed: false,
			augmentation: Augmentation::default(),
		}
	}

	/// Render the record for an `Index` / `IndexUpdate`, looking block
	/// sizes up through `block_meta`.
	pub fn to_proto<F>(&self, block_meta: F) -> ProtoFileInfo
	where
		F: Fn(&BlockHash) -> (u32, u32),
	{
		let mut offset = 0u64;
		let blocks = self
			.blocks
			.iter()
			.map(|hash| {
				let (size, weak_hash) = block_meta(hash);
				let b = ProtoBlockInfo { offset, size, hash: *hash, weak_hash };
				offset += size as u64;
				b
			})
			.collect();
		ProtoFileInfo {
			name: self.name().to_string(),
			file_type: self.kind.into(),
			size: self.size,
			permissions: self.permissions,
			modified_s: self.modified_s,
			modified_ns: self.modified_ns,
			modified_by: self.modified_by,
			deleted: self.deleted,
			invalid: self.invalid,
			no_permissions: self.no_permissions,
			version: self.version.clone(),
			sequence: self.sequence,
			block_size: self.block_size,
			blocks,
			symlink_target: self.symlink_target.clone(),
		}
	}

	pub fn name(&self) -> &str {
		self.path.full_name()
	}

	/// `ceil(size / block_size)`; zero for empty files, dirs and symlinks
	pub fn expected_block_count(&self) -> usize {
		if self.size == 0 || self.block_size == 0 || self.kind != FileKind::File {
			0
		} else {
			((self.size + self.block_size as u64 - 1) / self.block_size as u64) as usize
		}
	}

	/// Rebuild the availability bitmap. Called on every local update, even
	/// when the block list did not change.
	pub fn reset_availability(&mut self, present: bool) {
		self.local_blocks = Some(Bitmap::new(self.blocks.len(), present));
	}

	pub fn mark_block_available(&mut self, index: usize) {
		if let Some(map) = self.local_blocks.as_mut() {
			map.set(index);
		}
	}

	/// An empty or block-less local record counts as fully available
	pub fn is_locally_available(&self) -> bool {
		match &self.local_blocks {
			Some(map) => map.all_set(),
			None => false,
		}
	}

	/// Conflict rename target: `name.sync-conflict-YYYYMMDD-HHMMSS-<short>.ext`.
	/// The timestamp is the wall clock at conflict creation.
	pub fn conflicting_name(&self, winner: &DeviceId, now: chrono::NaiveDateTime) -> String {
		let parent = self.path.parent_name();
		let own = self.path.own_name();
		let (stem, ext) = match own.rfind('.') {
			Some(pos) if pos > 0 => (&own[..pos], &own[pos..]),
			_ => (own, ""),
		};
		let marker =
			format!("{}.sync-conflict-{}-{}{}", stem, now.format("%Y%m%d-%H%M%S"), winner.short(), ext);
		if parent.is_empty() {
			marker
		} else {
			format!("{}/{}", parent, marker)
		}
	}
}


// vim: ts=4
