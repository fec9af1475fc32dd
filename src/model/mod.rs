//! The cluster data model
//!
//! Entities live in typed maps owned by the [`Cluster`]; every mutation goes
//! through the diff pipeline in [`crate::diff`]. Cross-links between
//! entities use stable IDs (folder ID, device ID, block hash) rather than
//! pointers.

pub mod block_store;
pub mod cluster;
pub mod device;
pub mod file_info;
pub mod folder;
pub mod folder_info;
pub mod path;
pub mod version;

pub use block_store::{BlockEntry, BlockStore};
pub use cluster::Cluster;
pub use device::{Compression, ConnectionState, Device, IgnoredDevice, PendingDevice, UnknownDevice};
pub use file_info::{Bitmap, FileInfo, FileKind};
pub use folder::{Folder, FolderSettings, FolderType, PendingFolder, PullOrder};
pub use folder_info::FolderInfo;
pub use path::{InternedPath, PathCache};
pub use version::{Counter, VersionOrder, VersionVector};

use std::fmt;
use std::sync::Arc;

/// What happened to an observed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEvent {
	Updated,
	Deleted,
}

type AugmentationHook = Arc<dyn Fn(EntityEvent) + Send + Sync>;

/// One-way observer hook the presentation layer attaches to an entity.
/// Resetting the slot is the lifetime guard: a destroyed owner drops the
/// hook with it, and clones of an entity start unobserved.
#[derive(Default)]
pub struct Augmentation {
	hook: Option<AugmentationHook>,
}

impl Augmentation {
	pub fn set<F>(&mut self, hook: F)
	where
		F: Fn(EntityEvent) + Send + Sync + 'static,
	{
		self.hook = Some(Arc::new(hook));
	}

	pub fn reset(&mut self) {
		self.hook = None;
	}

	pub fn is_set(&self) -> bool {
		self.hook.is_some()
	}

	pub fn notify(&self, event: EntityEvent) {
		if let Some(hook) = &self.hook {
			hook(event);
		}
	}
}

impl Clone for Augmentation {
	fn clone(&self) -> Self {
		Augmentation { hook: None }
	}
}

impl fmt::Debug for Augmentation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Augmentation({})", if self.hook.is_some() { "set" } else { "unset" })
	}
}


// vim: ts=4
