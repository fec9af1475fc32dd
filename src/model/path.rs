//! Interned hierarchical paths
//!
//! Files share their path objects through a process-wide cache so that equal
//! path strings are stored once. A path remembers the offsets of its `/`
//! separators, so the parent and own-name views are zero-copy substrings.
//! The cache holds weak references only; dropping the last referent removes
//! the entry.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Weak};

const SHARD_COUNT: usize = 16;

struct PathData {
	full: String,
	/// Byte offsets of every `/` in `full`
	separators: Vec<u32>,
	cache: Weak<PathCache>,
	shard: usize,
}

impl Drop for PathData {
	fn drop(&mut self) {
		if let Some(cache) = self.cache.upgrade() {
			if let Ok(mut map) = cache.shards[self.shard].lock() {
				if let Some(entry) = map.get(&self.full) {
					if entry.strong_count() == 0 {
						map.remove(&self.full);
					}
				}
			}
		}
	}
}

/// Shared interned path
#[derive(Clone)]
pub struct InternedPath {
	data: Arc<PathData>,
}

impl InternedPath {
	pub fn full_name(&self) -> &str {
		&self.data.full
	}

	/// Everything before the last separator; empty for top-level names
	pub fn parent_name(&self) -> &str {
		match self.data.separators.last() {
			Some(&off) => &self.data.full[..off as usize],
			None => "",
		}
	}

	/// The last path component
	pub fn own_name(&self) -> &str {
		match self.data.separators.last() {
			Some(&off) => &self.data.full[off as usize + 1..],
			None => &self.data.full,
		}
	}

	pub fn depth(&self) -> usize {
		self.data.separators.len()
	}
}

impl PartialEq for InternedPath {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.data, &other.data) || self.data.full == other.data.full
	}
}

impl Eq for InternedPath {}

impl fmt::Debug for InternedPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "InternedPath({})", self.data.full)
	}
}

impl fmt::Display for InternedPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.data.full)
	}
}

/// Sharded intern cache. Lookups dominate insertions, and the stored values
/// are immutable, so a mutex per shard is enough.
pub struct PathCache {
	shards: Vec<Mutex<HashMap<String, Weak<PathData>>>>,
}

impl PathCache {
	pub fn new() -> Arc<Self> {
		let mut shards = Vec::with_capacity(SHARD_COUNT);
		for _ in 0..SHARD_COUNT {
			shards.push(Mutex::new(HashMap::new()));
		}
		Arc::new(PathCache { shards })
	}

	/// Intern `name`, returning the shared path object
	pub fn get(self: &Arc<Self>, name: &str) -> InternedPath {
		let shard = shard_of(name);
		let mut map = match self.shards[shard].lock() {
			Ok(map) => map,
			Err(poisoned) => poisoned.into_inner(),
		};
		if let Some(weak) = map.get(name) {
			if let Some(data) = weak.upgrade() {
				return InternedPath { data };
			}
		}
		let data = Arc::new(PathData {
			full: name.to_string(),
			separators: name
				.bytes()
				.enumerate()
				.filter(|(_, b)| *b == b'/')
				.map(|(i, _)| i as u32)
				.collect(),
			cache: Arc::downgrade(self),
			shard,
		});
		map.insert(name.to_string(), Arc::downgrade(&data));
		InternedPath { data }
	}

	/// Number of live entries, across all shards
	pub fn len(&self) -> usize {
		self.shards.iter().map(|s| s.lock().map(|m| m.len()).unwrap_or(0)).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn shard_of(name: &str) -> usize {
	let mut hasher = DefaultHasher::new();
	name.hash(&mut hasher);
	(hasher.finish() as usize) % SHARD_COUNT
}


// vim: ts=4
