//! Error types for cluster, persistence and scan operations

use std::error::Error;
use std::fmt;
use std::io;

/// Model consistency errors surfaced by diff application
///
/// Any of these returned from a diff taints the cluster (see
/// `Cluster::is_tainted`); the caller must stop applying diffs from the
/// same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
	/// A device with this ID is already part of the cluster
	DeviceAlreadyExists { device_id: String },

	/// The referenced device is not part of the cluster
	NoSuchDevice { device_id: String },

	/// A folder with this ID already exists
	FolderAlreadyExists { folder_id: String },

	/// The referenced folder does not exist
	NoSuchFolder { folder_id: String },

	/// The folder is already shared with the peer
	FolderAlreadyShared { folder_id: String, device_id: String },

	/// The referenced file does not exist in the folder
	NoSuchFile { folder_id: String, name: String },

	/// A peer announced a max-sequence lower than previously seen
	PeerSequenceRegression { folder_id: String, device_id: String, stored: u64, announced: u64 },

	/// A peer re-announced a file with an older version
	PeerFileRegression { folder_id: String, device_id: String, name: String },

	/// A device ID failed checksum or length validation
	InvalidDeviceId { input: String },

	/// A block referenced by a file is missing from the content store
	MissingBlock { hash: String },

	/// A block unref went below zero
	BlockUnderflow { hash: String },

	/// The cluster was tainted by an earlier failed diff; mutations refused
	ClusterTainted,
}

impl fmt::Display for ModelError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ModelError::DeviceAlreadyExists { device_id } => {
				write!(f, "device already exists: {}", device_id)
			}
			ModelError::NoSuchDevice { device_id } => {
				write!(f, "no such device: {}", device_id)
			}
			ModelError::FolderAlreadyExists { folder_id } => {
				write!(f, "folder already exists: {}", folder_id)
			}
			ModelError::NoSuchFolder { folder_id } => {
				write!(f, "no such folder: {}", folder_id)
			}
			ModelError::FolderAlreadyShared { folder_id, device_id } => {
				write!(f, "folder {} already shared with {}", folder_id, device_id)
			}
			ModelError::NoSuchFile { folder_id, name } => {
				write!(f, "no such file in folder {}: {}", folder_id, name)
			}
			ModelError::PeerSequenceRegression { folder_id, device_id, stored, announced } => {
				write!(
					f,
					"peer {} regressed sequence on folder {}: stored {}, announced {}",
					device_id, folder_id, stored, announced
				)
			}
			ModelError::PeerFileRegression { folder_id, device_id, name } => {
				write!(f, "peer {} regressed file {} in folder {}", device_id, name, folder_id)
			}
			ModelError::InvalidDeviceId { input } => {
				write!(f, "invalid device id: {}", input)
			}
			ModelError::MissingBlock { hash } => {
				write!(f, "block not found in content store: {}", hash)
			}
			ModelError::BlockUnderflow { hash } => {
				write!(f, "block refcount underflow: {}", hash)
			}
			ModelError::ClusterTainted => {
				write!(f, "cluster is tainted, refusing further mutations")
			}
		}
	}
}

impl Error for ModelError {}

/// Persistence bridge errors
#[derive(Debug)]
pub enum DbError {
	/// The underlying store failed
	Store { message: String },

	/// A stored record could not be decoded
	Deserialization { entity: &'static str, source: Box<dyn Error + Send + Sync> },

	/// A record could not be encoded for storage
	Serialization { entity: &'static str, source: Box<dyn Error + Send + Sync> },

	/// A stored record references an unknown entity
	Dangling { entity: &'static str, key: String },
}

impl fmt::Display for DbError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DbError::Store { message } => write!(f, "store failure: {}", message),
			DbError::Deserialization { entity, source } => {
				write!(f, "{} deserialization failure: {}", entity, source)
			}
			DbError::Serialization { entity, source } => {
				write!(f, "{} serialization failure: {}", entity, source)
			}
			DbError::Dangling { entity, key } => {
				write!(f, "{} record references unknown entity: {}", entity, key)
			}
		}
	}
}

impl Error for DbError {}

impl From<redb::Error> for DbError {
	fn from(e: redb::Error) -> Self {
		DbError::Store { message: e.to_string() }
	}
}

impl From<redb::DatabaseError> for DbError {
	fn from(e: redb::DatabaseError) -> Self {
		DbError::Store { message: e.to_string() }
	}
}

impl From<redb::TransactionError> for DbError {
	fn from(e: redb::TransactionError) -> Self {
		DbError::Store { message: e.to_string() }
	}
}

impl From<redb::TableError> for DbError {
	fn from(e: redb::TableError) -> Self {
		DbError::Store { message: e.to_string() }
	}
}

impl From<redb::StorageError> for DbError {
	fn from(e: redb::StorageError) -> Self {
		DbError::Store { message: e.to_string() }
	}
}

impl From<redb::CommitError> for DbError {
	fn from(e: redb::CommitError) -> Self {
		DbError::Store { message: e.to_string() }
	}
}

/// Scan and hash engine errors
///
/// Disk errors carry the path they happened on. A recoverable error on one
/// file downgrades that file to unreachable; an error on the folder root
/// suspends the whole folder.
#[derive(Debug)]
pub enum ScanError {
	/// I/O failure on a specific path
	Io { path: String, source: io::Error },

	/// The folder root disappeared or is not a directory
	RootUnavailable { path: String },

	/// The hasher pool shut down while jobs were in flight
	HasherGone,
}

impl fmt::Display for ScanError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ScanError::Io { path, source } => write!(f, "I/O error on {}: {}", path, source),
			ScanError::RootUnavailable { path } => {
				write!(f, "folder root unavailable: {}", path)
			}
			ScanError::HasherGone => write!(f, "hasher pool is gone"),
		}
	}
}

impl Error for ScanError {}

/// Configuration errors, fatal at startup
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Read { path: String, source: io::Error },

	/// Config file could not be parsed
	Parse { message: String },

	/// A numeric option failed the strictly-positive validation
	InvalidValue { key: &'static str, message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Read { path, source } => {
				write!(f, "cannot read config {}: {}", path, source)
			}
			ConfigError::Parse { message } => write!(f, "cannot parse config: {}", message),
			ConfigError::InvalidValue { key, message } => {
				write!(f, "invalid config value for {}: {}", key, message)
			}
		}
	}
}

impl Error for ConfigError {}

/// Unified error type covering every subsystem
#[derive(Debug)]
pub enum SyncError {
	/// Model consistency violation (nested)
	Model(ModelError),

	/// Persistence failure (nested)
	Db(DbError),

	/// Scan engine failure (nested)
	Scan(ScanError),

	/// Configuration failure (nested)
	Config(ConfigError),

	/// Plain I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Model(e) => write!(f, "model error: {}", e),
			SyncError::Db(e) => write!(f, "db error: {}", e),
			SyncError::Scan(e) => write!(f, "scan error: {}", e),
			SyncError::Config(e) => write!(f, "config error: {}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {}

impl From<ModelError> for SyncError {
	fn from(e: ModelError) -> Self {
		SyncError::Model(e)
	}
}

impl From<DbError> for SyncError {
	fn from(e: DbError) -> Self {
		SyncError::Db(e)
	}
}

impl From<ScanError> for SyncError {
	fn from(e: ScanError) -> Self {
		SyncError::Scan(e)
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(message: String) -> Self {
		SyncError::Other { message }
	}
}

// vim: ts=4
