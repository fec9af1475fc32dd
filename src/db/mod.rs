//! Persistence bridge
//!
//! The cluster is mirrored into a single byte-keyed redb table. The loader
//! turns the stored records back into a diff tree at startup; the observer
//! converts committed diffs into store transactions during steady state.
//! Only the store's transactional API is relied upon; compaction is its
//! own business.

pub mod keys;
pub mod loader;
pub mod observer;
pub mod records;

pub use loader::load_cluster_diff;
pub use observer::DbObserver;

use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::path;

use crate::error::DbError;
use crate::identity::DeviceId;
use crate::logging::*;

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("cluster");

/// One operation of a store transaction
pub enum WriteOp {
	Put { key: Vec<u8>, value: Vec<u8> },
	Delete { key: Vec<u8> },
	/// Drop every file record of one (folder, device) view
	DeleteFiles { folder_id: String, device: DeviceId },
	/// Drop folder infos and file records of a removed folder
	DeleteFolderScoped { folder_id: String },
	/// Drop folder infos, file records and pending folders of a removed device
	DeleteDeviceScoped { device: DeviceId },
}

/// The on-disk store
pub struct Db {
	db: redb::Database,
}

impl Db {
	/// Open or create the store database
	pub fn open(db_path: &path::Path) -> Result<Self, DbError> {
		let db = redb::Database::create(db_path)
			.map_err(|e| DbError::Store { message: e.to_string() })?;
		// Ensure the table exists
		{
			let write_txn = db.begin_write()?;
			let _ = write_txn.open_table(TABLE)?;
			write_txn.commit()?;
		}
		Ok(Db { db })
	}

	/// Apply a batch of operations in one atomic transaction
	pub fn write_batch(&self, ops: &[WriteOp]) -> Result<(), DbError> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(TABLE)?;
			for op in ops {
				match op {
					WriteOp::Put { key, value } => {
						table.insert(key.as_slice(), value.as_slice())?;
					}
					WriteOp::Delete { key } => {
						table.remove(key.as_slice())?;
					}
					WriteOp::DeleteFiles { folder_id, device } => {
						let doomed = collect_file_keys(&table, |record| {
							&record.folder_id == folder_id && &record.device == device
						})?;
						for key in doomed {
							table.remove(key.as_slice())?;
						}
					}
					WriteOp::DeleteFolderScoped { folder_id } => {
						let mut doomed = collect_keys(&table, |key| {
							keys::prefix_of(key) == Some(keys::PREFIX_FOLDER_INFO)
								&& key.len() > 33 && &key[33..] == folder_id.as_bytes()
						})?;
						doomed.extend(collect_file_keys(&table, |record| {
							&record.folder_id == folder_id
						})?);
						for key in doomed {
							table.remove(key.as_slice())?;
						}
					}
					WriteOp::DeleteDeviceScoped { device } => {
						let device_scoped = |prefix: u8| {
							move |key: &[u8]| {
								keys::prefix_of(key) == Some(prefix)
									&& key.len() >= 33 && &key[1..33] == device.as_bytes()
							}
						};
						let mut doomed =
							collect_keys(&table, device_scoped(keys::PREFIX_FOLDER_INFO))?;
						doomed.extend(collect_keys(
							&table,
							device_scoped(keys::PREFIX_PENDING_FOLDER),
						)?);
						doomed.extend(collect_file_keys(&table, |record| {
							&record.device == device
						})?);
						for key in doomed {
							table.remove(key.as_slice())?;
						}
					}
				}
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	/// Read every record; the loader buckets them by prefix
	pub fn read_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DbError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(TABLE)?;
		let mut out = Vec::new();
		let mut iter = table.iter()?;
		loop {
			match iter.next() {
				Some(Ok((key, value))) => {
					out.push((key.value().to_vec(), value.value().to_vec()));
				}
				None => break,
				Some(Err(e)) => return Err(e.into()),
			}
		}
		debug!("read {} records from store", out.len());
		Ok(out)
	}
}

fn collect_keys<T, F>(table: &T, matches: F) -> Result<Vec<Vec<u8>>, DbError>
where
	T: ReadableTable<&'static [u8], &'static [u8]>,
	F: Fn(&[u8]) -> bool,
{
	let mut keys = Vec::new();
	let mut iter = table.iter()?;
	loop {
		match iter.next() {
			Some(Ok((key, _))) => {
				let key = key.value().to_vec();
				if matches(&key) {
					keys.push(key);
				}
			}
			None => break,
			Some(Err(e)) => return Err(e.into()),
		}
	}
	Ok(keys)
}

fn collect_file_keys<T, F>(table: &T, matches: F) -> Result<Vec<Vec<u8>>, DbError>
where
	T: ReadableTable<&'static [u8], &'static [u8]>,
	F: Fn(&records::FileInfoRecord) -> bool,
{
	let mut keys = Vec::new();
	let mut iter = table.iter()?;
	loop {
		match iter.next() {
			Some(Ok((key, value))) => {
				let key_bytes = key.value().to_vec();
				if keys::prefix_of(&key_bytes) != Some(keys::PREFIX_FILE_INFO) {
					continue;
				}
				let record: records::FileInfoRecord =
					records::decode("file_info", value.value())?;
				if matches(&record) {
					keys.push(key_bytes);
				}
			}
			None => break,
			Some(Err(e)) => return Err(e.into()),
		}
	}
	Ok(keys)
}


// vim: ts=4
