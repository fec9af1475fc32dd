//! Block hashing worker pool
//!
//! Hash jobs cover a run of consecutive blocks of one file; workers stream
//! the bytes off disk and hand back strong and weak digests. The pool wakes
//! the scan scheduler when results are ready. The global concurrency budget
//! lives in the engine; the pool just works through what it is given.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::identity::{hash_block, weak_hash, BlockHash};
use crate::logging::*;
use crate::runtime::Waker;

/// A run of consecutive blocks of one file
#[derive(Debug, Clone)]
pub struct HashJob {
	pub job_id: u64,
	/// Folder the job belongs to; results route back by this
	pub folder: String,
	pub rel: String,
	pub path: PathBuf,
	pub block_size: u32,
	pub first_block: u32,
	pub block_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashedBlock {
	pub index: u32,
	pub hash: BlockHash,
	pub weak_hash: u32,
	pub size: u32,
}

#[derive(Debug)]
pub struct HashResult {
	pub job_id: u64,
	pub folder: String,
	pub rel: String,
	pub blocks: Vec<HashedBlock>,
	pub error: Option<String>,
}

struct JobQueue {
	jobs: Mutex<(VecDeque<HashJob>, bool)>,
	ready: Condvar,
}

impl JobQueue {
	fn push(&self, job: HashJob) {
		if let Ok(mut guard) = self.jobs.lock() {
			guard.0.push_back(job);
		}
		self.ready.notify_one();
	}

	fn close(&self) {
		if let Ok(mut guard) = self.jobs.lock() {
			guard.1 = true;
		}
		self.ready.notify_all();
	}

	/// Blocks until a job arrives; `None` means the pool is closing
	fn pop(&self) -> Option<HashJob> {
		let mut guard = match self.jobs.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		};
		loop {
			if let Some(job) = guard.0.pop_front() {
				return Some(job);
			}
			if guard.1 {
				return None;
			}
			guard = match self.ready.wait(guard) {
				Ok(guard) => guard,
				Err(poisoned) => poisoned.into_inner(),
			};
		}
	}
}

pub struct HasherPool {
	queue: Arc<JobQueue>,
	results: Receiver<HashResult>,
	workers: Vec<JoinHandle<()>>,
}

impl HasherPool {
	/// Spawn `threads` hasher workers. `waker` (the scan scheduler's) is
	/// signalled whenever a result is ready.
	pub fn new(threads: usize, waker: Option<Arc<Waker>>) -> Self {
		let queue = Arc::new(JobQueue {
			jobs: Mutex::new((VecDeque::new(), false)),
			ready: Condvar::new(),
		});
		let (tx, rx) = channel();
		let mut workers = Vec::with_capacity(threads.max(1));
		for n in 0..threads.max(1) {
			let queue = queue.clone();
			let tx: Sender<HashResult> = tx.clone();
			let waker = waker.clone();
			let handle = std::thread::Builder::new()
				.name(format!("hasher-{}", n))
				.spawn(move || {
					while let Some(job) = queue.pop() {
						let result = hash_segment(&job);
						if tx.send(result).is_err() {
							break;
						}
						if let Some(waker) = &waker {
							waker.wake();
						}
					}
				})
				.expect("spawning hasher thread");
			workers.push(handle);
		}
		HasherPool { queue, results: rx, workers }
	}

	pub fn submit(&self, job: HashJob) {
		trace!("hash job {} for {} ({} blocks)", job.job_id, job.rel, job.block_count);
		self.queue.push(job);
	}

	pub fn try_recv(&self) -> Option<HashResult> {
		self.results.try_recv().ok()
	}

	/// Blocking receive, used by tests and drain-on-shutdown
	pub fn recv(&self) -> Option<HashResult> {
		self.results.recv().ok()
	}

	pub fn shutdown(self) {
		self.queue.close();
		for worker in self.workers {
			let _ = worker.join();
		}
	}
}

/// Read and hash one segment of consecutive blocks
fn hash_segment(job: &HashJob) -> HashResult {
	let fail = |e: std::io::Error| HashResult {
		job_id: job.job_id,
		folder: job.folder.clone(),
		rel: job.rel.clone(),
		blocks: Vec::new(),
		error: Some(format!("{}: {}", job.path.display(), e)),
	};
	let mut file = match File::open(&job.path) {
		Ok(file) => file,
		Err(e) => return fail(e),
	};
	let offset = job.first_block as u64 * job.block_size as u64;
	if let Err(e) = file.seek(SeekFrom::Start(offset)) {
		return fail(e);
	}
	let mut blocks = Vec::with_capacity(job.block_count as usize);
	let mut buf = vec![0u8; job.block_size as usize];
	for n in 0..job.block_count {
		let mut read = 0;
		loop {
			match file.read(&mut buf[read..]) {
				Ok(0) => break,
				Ok(bytes) => {
					read += bytes;
					if read == buf.len() {
						break;
					}
				}
				Err(e) => return fail(e),
			}
		}
		if read == 0 {
			break;
		}
		let data = &buf[..read];
		blocks.push(HashedBlock {
			index: job.first_block + n,
			hash: hash_block(data),
			weak_hash: weak_hash(data),
			size: read as u32,
		});
		if read < buf.len() {
			break;
		}
	}
	HashResult {
		job_id: job.job_id,
		folder: job.folder.clone(),
		rel: job.rel.clone(),
		blocks,
		error: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::TempDir;

	fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
		let path = dir.path().join(name);
		let mut f = File::create(&path).unwrap();
		f.write_all(data).unwrap();
		path
	}

	#[test]
	fn test_hash_segment_covers_blocks() {
		let tmp = TempDir::new().unwrap();
		let path = write_file(&tmp, "f", b"aaaabbbbcc");
		let pool = HasherPool::new(1, None);
		pool.submit(HashJob {
			job_id: 1,
			folder: "folder".to_string(),
			rel: "f".to_string(),
			path,
			block_size: 4,
			first_block: 0,
			block_count: 3,
		});
		let result = pool.recv().unwrap();
		assert!(result.error.is_none());
		assert_eq!(result.blocks.len(), 3);
		assert_eq!(result.blocks[0].hash, hash_block(b"aaaa"));
		assert_eq!(result.blocks[1].hash, hash_block(b"bbbb"));
		assert_eq!(result.blocks[2].hash, hash_block(b"cc"));
		assert_eq!(result.blocks[2].size, 2);
		pool.shutdown();
	}

	#[test]
	fn test_hash_segment_mid_file() {
		let tmp = TempDir::new().unwrap();
		let path = write_file(&tmp, "f", b"aaaabbbbcccc");
		let pool = HasherPool::new(2, None);
		pool.submit(HashJob {
			job_id: 7,
			folder: "folder".to_string(),
			rel: "f".to_string(),
			path,
			block_size: 4,
			first_block: 1,
			block_count: 2,
		});
		let result = pool.recv().unwrap();
		assert_eq!(result.job_id, 7);
		assert_eq!(result.blocks[0].index, 1);
		assert_eq!(result.blocks[0].hash, hash_block(b"bbbb"));
		assert_eq!(result.blocks[1].index, 2);
		pool.shutdown();
	}

	#[test]
	fn test_missing_file_reports_error() {
		let pool = HasherPool::new(1, None);
		pool.submit(HashJob {
			job_id: 2,
			folder: "folder".to_string(),
			rel: "gone".to_string(),
			path: PathBuf::from("/nonexistent/gone"),
			block_size: 4,
			first_block: 0,
			block_count: 1,
		});
		let result = pool.recv().unwrap();
		assert!(result.error.is_some());
		assert!(result.blocks.is_empty());
		pool.shutdown();
	}

	#[test]
	fn test_result_wakes_scheduler() {
		let tmp = TempDir::new().unwrap();
		let path = write_file(&tmp, "f", b"data");
		let waker = Arc::new(Waker::condvar());
		let pool = HasherPool::new(1, Some(waker.clone()));
		pool.submit(HashJob {
			job_id: 3,
			folder: "folder".to_string(),
			rel: "f".to_string(),
			path,
			block_size: 4,
			first_block: 0,
			block_count: 1,
		});
		assert!(waker.wait(std::time::Duration::from_secs(5)));
		assert!(pool.recv().is_some());
		pool.shutdown();
	}
}

// vim: ts=4
