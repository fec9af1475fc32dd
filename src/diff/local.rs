//! Local diffs emitted by the scan engine

use crate::error::ModelError;
use crate::model::{Cluster, EntityEvent};

#[derive(Debug)]
pub struct ScanStart {
	pub folder_id: String,
	pub at: i64,
}

impl ScanStart {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folder_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		folder.scanning = true;
		folder.settings.scheduled = false;
		folder.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

#[derive(Debug)]
pub struct ScanFinish {
	pub folder_id: String,
	pub at: i64,
}

impl ScanFinish {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folder_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		folder.scanning = false;
		folder.last_scan_s = self.at;
		folder.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

/// Ask for a (re)scan of a folder; the scan scheduler picks it up
#[derive(Debug)]
pub struct ScanRequest {
	pub folder_id: String,
}

impl ScanRequest {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder = cluster
			.folder_mut(&self.folder_id)
			.ok_or_else(|| ModelError::NoSuchFolder { folder_id: self.folder_id.clone() })?;
		folder.settings.scheduled = true;
		Ok(())
	}
}

/// Disk content matches the model record; every block is present
#[derive(Debug)]
pub struct FileAvailability {
	pub folder_id: String,
	pub name: String,
}

impl FileAvailability {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder_id = self.folder_id.clone();
		let file = cluster
			.local_folder_info_mut(&self.folder_id)
			.and_then(|info| info.file_mut(&self.name))
			.ok_or_else(|| ModelError::NoSuchFile { folder_id, name: self.name.clone() })?;
		file.reset_availability(true);
		file.unreachable = false;
		file.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

/// Some blocks of a partially downloaded file are present on disk
#[derive(Debug)]
pub struct BlocksAvailability {
	pub folder_id: String,
	pub name: String,
	/// Indexes into the file's block list
	pub blocks: Vec<u32>,
}

impl BlocksAvailability {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let folder_id = self.folder_id.clone();
		let file = cluster
			.local_folder_info_mut(&self.folder_id)
			.and_then(|info| info.file_mut(&self.name))
			.ok_or_else(|| ModelError::NoSuchFile { folder_id, name: self.name.clone() })?;
		if file.local_blocks.is_none() {
			file.reset_availability(false);
		}
		for index in &self.blocks {
			file.mark_block_available(*index as usize);
		}
		file.augmentation.notify(EntityEvent::Updated);
		Ok(())
	}
}

/// One recoverable I/O failure attached to a file
#[derive(Debug)]
pub struct FileIoError {
	pub folder_id: String,
	pub name: String,
	pub message: String,
}

/// Recoverable disk errors; the affected files become unreachable without
/// stopping the engine
#[derive(Debug)]
pub struct IoFailure {
	pub errors: Vec<FileIoError>,
}

impl IoFailure {
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		for error in &self.errors {
			let file = cluster
				.local_folder_info_mut(&error.folder_id)
				.and_then(|info| info.file_mut(&error.name));
			if let Some(file) = file {
				file.unreachable = true;
				file.augmentation.notify(EntityEvent::Updated);
			}
		}
		Ok(())
	}
}

// vim: ts=4
