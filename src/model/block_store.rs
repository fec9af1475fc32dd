//! Content-addressed block store
//!
//! One entry per distinct block hash, reference-counted across every file
//! that lists the block. The store is mutated only through diffs so the
//! persistence observer sees the same sequence of changes.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ModelError;
use crate::identity::{render_digest, BlockHash};

/// Stored metadata of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
	pub size: u32,
	pub weak_hash: u32,
	pub refcount: u32,
}

/// Block table keyed by content hash
#[derive(Debug, Clone, Default)]
pub struct BlockStore {
	blocks: BTreeMap<BlockHash, BlockEntry>,
	/// Hashes whose refcount dropped to zero since the last deduction
	orphans: BTreeSet<BlockHash>,
}

impl BlockStore {
	pub fn new() -> Self {
		BlockStore::default()
	}

	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	pub fn get(&self, hash: &BlockHash) -> Option<&BlockEntry> {
		self.blocks.get(hash)
	}

	pub fn contains(&self, hash: &BlockHash) -> bool {
		self.blocks.contains_key(hash)
	}

	/// Insert a block with no references yet; the loader's file batches
	/// rebuild the refcounts.
	pub fn load(&mut self, hash: BlockHash, size: u32, weak_hash: u32) {
		self.blocks.entry(hash).or_insert(BlockEntry { size, weak_hash, refcount: 0 });
	}

	/// Insert or re-reference a block. Idempotent for identical metadata.
	pub fn put(&mut self, hash: BlockHash, size: u32, weak_hash: u32) {
		let entry =
			self.blocks.entry(hash).or_insert(BlockEntry { size, weak_hash, refcount: 0 });
		entry.refcount += 1;
		self.orphans.remove(&hash);
	}

	/// Add one reference to an existing block
	pub fn add_ref(&mut self, hash: &BlockHash) -> Result<(), ModelError> {
		match self.blocks.get_mut(hash) {
			Some(entry) => {
				entry.refcount += 1;
				self.orphans.remove(hash);
				Ok(())
			}
			None => Err(ModelError::MissingBlock { hash: render_digest(hash) }),
		}
	}

	/// Drop one reference. A refcount of zero marks the block orphaned.
	pub fn remove_ref(&mut self, hash: &BlockHash) -> Result<(), ModelError> {
		match self.blocks.get_mut(hash) {
			Some(entry) => {
				if entry.refcount == 0 {
					return Err(ModelError::BlockUnderflow { hash: render_digest(hash) });
				}
				entry.refcount -= 1;
				if entry.refcount == 0 {
					self.orphans.insert(*hash);
				}
				Ok(())
			}
			None => Err(ModelError::MissingBlock { hash: render_digest(hash) }),
		}
	}

	/// Take the current orphan set, clearing it. The caller turns the result
	/// into a bulk `remove_blocks` diff.
	pub fn deduce_orphans(&mut self) -> Vec<BlockHash> {
		let orphans: Vec<_> = self
			.orphans
			.iter()
			.filter(|h| self.blocks.get(*h).map(|e| e.refcount == 0).unwrap_or(false))
			.cloned()
			.collect();
		self.orphans.clear();
		orphans
	}

	/// Remove blocks outright; used by the `remove_blocks` diff
	pub fn remove(&mut self, hashes: &[BlockHash]) {
		for hash in hashes {
			self.blocks.remove(hash);
			self.orphans.remove(hash);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&BlockHash, &BlockEntry)> {
		self.blocks.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_put_creates_and_refs() {
		let mut store = BlockStore::new();
		store.put([1; 32], 1024, 7);
		assert_eq!(store.get(&[1; 32]).unwrap().refcount, 1);
		store.put([1; 32], 1024, 7);
		assert_eq!(store.get(&[1; 32]).unwrap().refcount, 2);
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_unref_to_zero_orphans() {
		let mut store = BlockStore::new();
		store.put([1; 32], 1024, 7);
		store.remove_ref(&[1; 32]).unwrap();
		let orphans = store.deduce_orphans();
		assert_eq!(orphans, vec![[1u8; 32]]);
		// deduction clears the set
		assert!(store.deduce_orphans().is_empty());
		store.remove(&orphans);
		assert!(store.is_empty());
	}

	#[test]
	fn test_reref_rescues_orphan() {
		let mut store = BlockStore::new();
		store.put([1; 32], 1024, 7);
		store.remove_ref(&[1; 32]).unwrap();
		store.add_ref(&[1; 32]).unwrap();
		assert!(store.deduce_orphans().is_empty());
		assert_eq!(store.get(&[1; 32]).unwrap().refcount, 1);
	}

	#[test]
	fn test_unref_missing_block_fails() {
		let mut store = BlockStore::new();
		assert!(store.remove_ref(&[9; 32]).is_err());
		assert!(store.add_ref(&[9; 32]).is_err());
	}

	#[test]
	fn test_underflow_detected() {
		let mut store = BlockStore::new();
		store.put([1; 32], 10, 0);
		store.remove_ref(&[1; 32]).unwrap();
		assert!(store.remove_ref(&[1; 32]).is_err());
	}
}

// vim: ts=4
