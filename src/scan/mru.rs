//! Bounded MRU cache for open block file descriptors
//!
//! Serving block requests reopens the same files over and over; a small
//! most-recently-used pool keeps them open. Eviction closes the descriptor.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::ScanError;

pub struct MruCache<K, V> {
	capacity: usize,
	/// Entries with their last-use stamp
	entries: HashMap<K, (u64, V)>,
	clock: u64,
}

impl<K: std::hash::Hash + Eq + Clone, V> MruCache<K, V> {
	pub fn new(capacity: usize) -> Self {
		MruCache { capacity: capacity.max(1), entries: HashMap::new(), clock: 0 }
	}

	pub fn get(&mut self, key: &K) -> Option<&mut V> {
		self.clock += 1;
		let clock = self.clock;
		self.entries.get_mut(key).map(|(stamp, value)| {
			*stamp = clock;
			value
		})
	}

	/// Insert, evicting the least recently used entry when full
	pub fn put(&mut self, key: K, value: V) {
		if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
			if let Some(oldest) = self
				.entries
				.iter()
				.min_by_key(|(_, (stamp, _))| *stamp)
				.map(|(k, _)| k.clone())
			{
				self.entries.remove(&oldest);
			}
		}
		self.clock += 1;
		self.entries.insert(key, (self.clock, value));
	}

	pub fn remove(&mut self, key: &K) -> Option<V> {
		self.entries.remove(key).map(|(_, value)| value)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Reads blocks out of folder files through the descriptor pool
pub struct BlockReader {
	cache: MruCache<PathBuf, File>,
}

impl BlockReader {
	/// `mru_size` is the descriptor pool bound (`fs.mru_size`)
	pub fn new(mru_size: usize) -> Self {
		BlockReader { cache: MruCache::new(mru_size) }
	}

	/// Read `size` bytes at `offset` from `path`
	pub fn read_block(&mut self, path: &Path, offset: u64, size: u32) -> Result<Vec<u8>, ScanError> {
		let io_err = |e: std::io::Error| ScanError::Io {
			path: path.display().to_string(),
			source: e,
		};
		if self.cache.get(&path.to_path_buf()).is_none() {
			let file = File::open(path).map_err(io_err)?;
			self.cache.put(path.to_path_buf(), file);
		}
		let file = match self.cache.get(&path.to_path_buf()) {
			Some(file) => file,
			None => {
				return Err(ScanError::Io {
					path: path.display().to_string(),
					source: std::io::Error::new(std::io::ErrorKind::Other, "descriptor evicted"),
				})
			}
		};
		file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
		let mut buf = vec![0u8; size as usize];
		let mut read = 0;
		while read < buf.len() {
			let n = file.read(&mut buf[read..]).map_err(io_err)?;
			if n == 0 {
				break;
			}
			read += n;
		}
		buf.truncate(read);
		Ok(buf)
	}

	/// Drop a pooled descriptor, e.g. before the file is replaced
	pub fn forget(&mut self, path: &Path) {
		self.cache.remove(&path.to_path_buf());
	}

	pub fn open_descriptors(&self) -> usize {
		self.cache.len()
	}
}


// vim: ts=4
