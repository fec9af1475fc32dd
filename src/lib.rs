//! # bepsync - Block Exchange Protocol synchronization core
//!
//! The core of a peer-to-peer file synchronization agent speaking BEP.
//! Devices holding a shared folder converge on the same contents by
//! exchanging content-addressed block metadata, gossiping index updates and
//! fetching missing blocks over mutually-authenticated connections.
//!
//! The crate covers the cluster data model and its diff pipeline, the local
//! scan and hash engine, the content-addressed block store, conflict
//! resolution, the persistence bridge and the cooperative runtime the scan
//! engine runs on. Transport framing, TLS, discovery and the UI shells are
//! external collaborators consumed through the types in [`proto`].

#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod daemon;
pub mod db;
pub mod diff;
pub mod error;
pub mod identity;
pub mod logging;
pub mod model;
pub mod proto;
pub mod runtime;
pub mod scan;
pub mod sequencer;
pub mod stream;

// Re-export commonly used types
pub use diff::advance::{resolve, AdvanceAction};
pub use diff::{ClusterVisitor, ContactVisitor, Diff, DiffKind};
pub use error::{ConfigError, DbError, ModelError, ScanError, SyncError};
pub use identity::{hash_block, DeviceId};
pub use model::{Cluster, Device, FileInfo, Folder, FolderInfo, VersionVector};
pub use sequencer::Sequencer;
pub use stream::UpdatesStreamer;

// vim: ts=4
