//! The diff pipeline
//!
//! Every mutation of the cluster is a typed diff. Diffs compose into a tree:
//! an optional child (a prerequisite, applied first) and an optional sibling
//! (an independent follow-up, applied after). Applying the root applies the
//! whole tree left-first depth-first, aborting on the first error; a failed
//! diff leaves the cluster tainted.
//!
//! Two families share the composition shape: cluster diffs mutate the model
//! and are observed by [`ClusterVisitor`] implementations (persistence, UI);
//! contact diffs carry transport-level events for the networking layer and
//! are observed by [`ContactVisitor`].

pub mod advance;
pub mod contact;
pub mod load;
pub mod local;
pub mod modify;
pub mod peer;

use crate::error::{ModelError, SyncError};
use crate::model::Cluster;

/// Kind-specific application, implemented by both diff families
pub trait DiffApply {
	fn apply_impl(&self, cluster: &mut Cluster) -> Result<(), ModelError>;
}

/// A diff node: a kind plus the child/sibling composition links
#[derive(Debug)]
pub struct Tree<K> {
	pub kind: K,
	pub child: Option<Box<Tree<K>>>,
	pub sibling: Option<Box<Tree<K>>>,
}

impl<K: DiffApply> Tree<K> {
	pub fn new(kind: K) -> Self {
		Tree { kind, child: None, sibling: None }
	}

	/// Attach a prerequisite. The slot must be empty.
	pub fn assign_child(&mut self, child: Tree<K>) -> &mut Tree<K> {
		assert!(self.child.is_none(), "child slot already assigned");
		self.child = Some(Box::new(child));
		self.child.as_mut().unwrap()
	}

	/// Append a follow-up at the end of the sibling chain; returns the new
	/// tail so callers can keep appending.
	pub fn assign_sibling(&mut self, sibling: Tree<K>) -> &mut Tree<K> {
		let mut node = self;
		while node.sibling.is_some() {
			node = node.sibling.as_mut().unwrap();
		}
		node.sibling = Some(Box::new(sibling));
		node.sibling.as_mut().unwrap()
	}

	/// Apply the whole tree. On error the cluster is marked tainted and the
	/// error is returned. A tainted cluster refuses further applications.
	pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		let mut controller = DirectController;
		self.apply_controlled(cluster, &mut controller)
	}

	/// Apply with an interposed controller: the controller sees every child
	/// and sibling node and may wrap progress reporting or batching around
	/// selected kinds.
	pub fn apply_controlled(
		&self,
		cluster: &mut Cluster,
		controller: &mut dyn ApplyController<K>,
	) -> Result<(), ModelError> {
		if cluster.is_tainted() {
			return Err(ModelError::ClusterTainted);
		}
		let r = self.apply_node(cluster, controller);
		if r.is_err() {
			cluster.mark_tainted();
		}
		r
	}

	/// One node: child first, own mutation, then the sibling chain
	pub fn apply_node(
		&self,
		cluster: &mut Cluster,
		controller: &mut dyn ApplyController<K>,
	) -> Result<(), ModelError> {
		if let Some(child) = &self.child {
			controller.apply(child, cluster)?;
		}
		self.kind.apply_impl(cluster)?;
		if let Some(sibling) = &self.sibling {
			controller.apply(sibling, cluster)?;
		}
		Ok(())
	}
}

/// Interposition point for the loader and the UI. The default controller
/// applies nodes directly.
pub trait ApplyController<K: DiffApply> {
	fn apply(&mut self, diff: &Tree<K>, cluster: &mut Cluster) -> Result<(), ModelError>;
}

/// Controller that applies every node without interposing
pub struct DirectController;

impl<K: DiffApply> ApplyController<K> for DirectController {
	fn apply(&mut self, diff: &Tree<K>, cluster: &mut Cluster) -> Result<(), ModelError> {
		diff.apply_node(cluster, self)
	}
}

/// A cluster diff tree
pub type Diff = Tree<DiffKind>;

/// A contact diff tree
pub type ContactDiff = Tree<ContactKind>;

/// Tagged union of every cluster diff kind
#[derive(Debug)]
pub enum DiffKind {
	// load
	LoadCluster(load::LoadCluster),
	LoadBlocks(load::LoadBlocks),
	LoadFileInfos(load::LoadFileInfos),
	LoadFolders(load::LoadFolders),
	LoadPendingFolders(load::LoadPendingFolders),
	LoadDevices(load::LoadDevices),
	LoadPendingDevices(load::LoadPendingDevices),
	LoadIgnoredDevices(load::LoadIgnoredDevices),
	// modify
	CreateFolder(modify::CreateFolder),
	UpsertFolder(modify::UpsertFolder),
	UpsertFolderInfo(modify::UpsertFolderInfo),
	RemoveFolder(modify::RemoveFolder),
	ShareFolder(modify::ShareFolder),
	UnshareFolder(modify::UnshareFolder),
	UpdatePeer(modify::UpdatePeer),
	RemovePeer(modify::RemovePeer),
	AddIgnoredDevice(modify::AddIgnoredDevice),
	AddPendingDevice(modify::AddPendingDevice),
	RemovePendingDevice(modify::RemovePendingDevice),
	AddUnknownDevice(modify::AddUnknownDevice),
	RemoveUnknownDevice(modify::RemoveUnknownDevice),
	NewFile(modify::NewFile),
	LocalUpdate(modify::LocalUpdate),
	LockFile(modify::LockFile),
	MarkReachable(modify::MarkReachable),
	SuspendFolder(modify::SuspendFolder),
	AppendBlock(modify::AppendBlock),
	CloneBlock(modify::CloneBlock),
	RemoveBlocks(modify::RemoveBlocks),
	UpdateContact(modify::UpdateContact),
	// peer
	ClusterUpdate(peer::ClusterUpdate),
	UpdateFolder(peer::UpdateFolder),
	// advance
	Advance(advance::Advance),
	// local
	ScanStart(local::ScanStart),
	ScanFinish(local::ScanFinish),
	ScanRequest(local::ScanRequest),
	FileAvailability(local::FileAvailability),
	BlocksAvailability(local::BlocksAvailability),
	IoFailure(local::IoFailure),
	// aggregate
	Aggregate(Vec<Diff>),
}

impl DiffApply for DiffKind {
	fn apply_impl(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		match self {
			DiffKind::LoadCluster(d) => d.apply(cluster),
			DiffKind::LoadBlocks(d) => d.apply(cluster),
			DiffKind::LoadFileInfos(d) => d.apply(cluster),
			DiffKind::LoadFolders(d) => d.apply(cluster),
			DiffKind::LoadPendingFolders(d) => d.apply(cluster),
			DiffKind::LoadDevices(d) => d.apply(cluster),
			DiffKind::LoadPendingDevices(d) => d.apply(cluster),
			DiffKind::LoadIgnoredDevices(d) => d.apply(cluster),
			DiffKind::CreateFolder(d) => d.apply(cluster),
			DiffKind::UpsertFolder(d) => d.apply(cluster),
			DiffKind::UpsertFolderInfo(d) => d.apply(cluster),
			DiffKind::RemoveFolder(d) => d.apply(cluster),
			DiffKind::ShareFolder(d) => d.apply(cluster),
			DiffKind::UnshareFolder(d) => d.apply(cluster),
			DiffKind::UpdatePeer(d) => d.apply(cluster),
			DiffKind::RemovePeer(d) => d.apply(cluster),
			DiffKind::AddIgnoredDevice(d) => d.apply(cluster),
			DiffKind::AddPendingDevice(d) => d.apply(cluster),
			DiffKind::RemovePendingDevice(d) => d.apply(cluster),
			DiffKind::AddUnknownDevice(d) => d.apply(cluster),
			DiffKind::RemoveUnknownDevice(d) => d.apply(cluster),
			DiffKind::NewFile(d) => d.apply(cluster),
			DiffKind::LocalUpdate(d) => d.apply(cluster),
			DiffKind::LockFile(d) => d.apply(cluster),
			DiffKind::MarkReachable(d) => d.apply(cluster),
			DiffKind::SuspendFolder(d) => d.apply(cluster),
			DiffKind::AppendBlock(d) => d.apply(cluster),
			DiffKind::CloneBlock(d) => d.apply(cluster),
			DiffKind::RemoveBlocks(d) => d.apply(cluster),
			DiffKind::UpdateContact(d) => d.apply(cluster),
			DiffKind::ClusterUpdate(d) => d.apply(cluster),
			DiffKind::UpdateFolder(d) => d.apply(cluster),
			DiffKind::Advance(d) => d.apply(cluster),
			DiffKind::ScanStart(d) => d.apply(cluster),
			DiffKind::ScanFinish(d) => d.apply(cluster),
			DiffKind::ScanRequest(d) => d.apply(cluster),
			DiffKind::FileAvailability(d) => d.apply(cluster),
			DiffKind::BlocksAvailability(d) => d.apply(cluster),
			DiffKind::IoFailure(d) => d.apply(cluster),
			DiffKind::Aggregate(diffs) => {
				for diff in diffs {
					diff.apply(cluster)?;
				}
				Ok(())
			}
		}
	}
}

impl Diff {
	/// Wrap a sequence of diffs so they apply atomically, in order
	pub fn aggregate(diffs: Vec<Diff>) -> Diff {
		Diff::new(DiffKind::Aggregate(diffs))
	}

	/// Walk the tree in apply order, dispatching each node to the typed
	/// visitor method. An error short-circuits the traversal.
	pub fn visit(&self, visitor: &mut dyn ClusterVisitor) -> Result<(), SyncError> {
		if let Some(child) = &self.child {
			child.visit(visitor)?;
		}
		match &self.kind {
			DiffKind::LoadCluster(d) => visitor.on_load_cluster(d)?,
			DiffKind::LoadBlocks(d) => visitor.on_load_blocks(d)?,
			DiffKind::LoadFileInfos(d) => visitor.on_load_file_infos(d)?,
			DiffKind::LoadFolders(d) => visitor.on_load_folders(d)?,
			DiffKind::LoadPendingFolders(d) => visitor.on_load_pending_folders(d)?,
			DiffKind::LoadDevices(d) => visitor.on_load_devices(d)?,
			DiffKind::LoadPendingDevices(d) => visitor.on_load_pending_devices(d)?,
			DiffKind::LoadIgnoredDevices(d) => visitor.on_load_ignored_devices(d)?,
			DiffKind::CreateFolder(d) => visitor.on_create_folder(d)?,
			DiffKind::UpsertFolder(d) => visitor.on_upsert_folder(d)?,
			DiffKind::UpsertFolderInfo(d) => visitor.on_upsert_folder_info(d)?,
			DiffKind::RemoveFolder(d) => visitor.on_remove_folder(d)?,
			DiffKind::ShareFolder(d) => visitor.on_share_folder(d)?,
			DiffKind::UnshareFolder(d) => visitor.on_unshare_folder(d)?,
			DiffKind::UpdatePeer(d) => visitor.on_update_peer(d)?,
			DiffKind::RemovePeer(d) => visitor.on_remove_peer(d)?,
			DiffKind::AddIgnoredDevice(d) => visitor.on_add_ignored_device(d)?,
			DiffKind::AddPendingDevice(d) => visitor.on_add_pending_device(d)?,
			DiffKind::RemovePendingDevice(d) => visitor.on_remove_pending_device(d)?,
			DiffKind::AddUnknownDevice(d) => visitor.on_add_unknown_device(d)?,
			DiffKind::RemoveUnknownDevice(d) => visitor.on_remove_unknown_device(d)?,
			DiffKind::NewFile(d) => visitor.on_new_file(d)?,
			DiffKind::LocalUpdate(d) => visitor.on_local_update(d)?,
			DiffKind::LockFile(d) => visitor.on_lock_file(d)?,
			DiffKind::MarkReachable(d) => visitor.on_mark_reachable(d)?,
			DiffKind::SuspendFolder(d) => visitor.on_suspend_folder(d)?,
			DiffKind::AppendBlock(d) => visitor.on_append_block(d)?,
			DiffKind::CloneBlock(d) => visitor.on_clone_block(d)?,
			DiffKind::RemoveBlocks(d) => visitor.on_remove_blocks(d)?,
			DiffKind::UpdateContact(d) => visitor.on_update_contact(d)?,
			DiffKind::ClusterUpdate(d) => visitor.on_cluster_update(d)?,
			DiffKind::UpdateFolder(d) => visitor.on_update_folder(d)?,
			DiffKind::Advance(d) => visitor.on_advance(d)?,
			DiffKind::ScanStart(d) => visitor.on_scan_start(d)?,
			DiffKind::ScanFinish(d) => visitor.on_scan_finish(d)?,
			DiffKind::ScanRequest(d) => visitor.on_scan_request(d)?,
			DiffKind::FileAvailability(d) => visitor.on_file_availability(d)?,
			DiffKind::BlocksAvailability(d) => visitor.on_blocks_availability(d)?,
			DiffKind::IoFailure(d) => visitor.on_io_failure(d)?,
			DiffKind::Aggregate(diffs) => {
				for diff in diffs {
					diff.visit(visitor)?;
				}
			}
		}
		if let Some(sibling) = &self.sibling {
			sibling.visit(visitor)?;
		}
		Ok(())
	}
}

/// Observer of committed cluster diffs. Visitors see nodes in apply order;
/// every method defaults to a no-op.
#[allow(unused_variables)]
pub trait ClusterVisitor {
	fn on_load_cluster(&mut self, d: &load::LoadCluster) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_blocks(&mut self, d: &load::LoadBlocks) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_file_infos(&mut self, d: &load::LoadFileInfos) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_folders(&mut self, d: &load::LoadFolders) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_pending_folders(&mut self, d: &load::LoadPendingFolders) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_devices(&mut self, d: &load::LoadDevices) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_pending_devices(&mut self, d: &load::LoadPendingDevices) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_load_ignored_devices(&mut self, d: &load::LoadIgnoredDevices) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_create_folder(&mut self, d: &modify::CreateFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_upsert_folder(&mut self, d: &modify::UpsertFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_upsert_folder_info(&mut self, d: &modify::UpsertFolderInfo) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_remove_folder(&mut self, d: &modify::RemoveFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_share_folder(&mut self, d: &modify::ShareFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_unshare_folder(&mut self, d: &modify::UnshareFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_update_peer(&mut self, d: &modify::UpdatePeer) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_remove_peer(&mut self, d: &modify::RemovePeer) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_add_ignored_device(&mut self, d: &modify::AddIgnoredDevice) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_add_pending_device(&mut self, d: &modify::AddPendingDevice) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_remove_pending_device(
		&mut self,
		d: &modify::RemovePendingDevice,
	) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_add_unknown_device(&mut self, d: &modify::AddUnknownDevice) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_remove_unknown_device(
		&mut self,
		d: &modify::RemoveUnknownDevice,
	) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_new_file(&mut self, d: &modify::NewFile) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_local_update(&mut self, d: &modify::LocalUpdate) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_lock_file(&mut self, d: &modify::LockFile) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_mark_reachable(&mut self, d: &modify::MarkReachable) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_suspend_folder(&mut self, d: &modify::SuspendFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_append_block(&mut self, d: &modify::AppendBlock) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_clone_block(&mut self, d: &modify::CloneBlock) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_remove_blocks(&mut self, d: &modify::RemoveBlocks) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_update_contact(&mut self, d: &modify::UpdateContact) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_cluster_update(&mut self, d: &peer::ClusterUpdate) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_update_folder(&mut self, d: &peer::UpdateFolder) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_advance(&mut self, d: &advance::Advance) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_scan_start(&mut self, d: &local::ScanStart) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_scan_finish(&mut self, d: &local::ScanFinish) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_scan_request(&mut self, d: &local::ScanRequest) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_file_availability(&mut self, d: &local::FileAvailability) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_blocks_availability(&mut self, d: &local::BlocksAvailability) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_io_failure(&mut self, d: &local::IoFailure) -> Result<(), SyncError> {
		Ok(())
	}
}

/// Tagged union of transport-level event kinds
pub enum ContactKind {
	ConnectRequest(contact::ConnectRequest),
	DialRequest(contact::DialRequest),
	RelayConnectRequest(contact::RelayConnectRequest),
	PeerState(contact::PeerState),
	IgnoredConnected(contact::IgnoredConnected),
	UnknownConnected(contact::UnknownConnected),
}

impl DiffApply for ContactKind {
	fn apply_impl(&self, cluster: &mut Cluster) -> Result<(), ModelError> {
		match self {
			ContactKind::ConnectRequest(d) => d.apply(cluster),
			ContactKind::DialRequest(d) => d.apply(cluster),
			ContactKind::RelayConnectRequest(d) => d.apply(cluster),
			ContactKind::PeerState(d) => d.apply(cluster),
			ContactKind::IgnoredConnected(d) => d.apply(cluster),
			ContactKind::UnknownConnected(d) => d.apply(cluster),
		}
	}
}

impl ContactDiff {
	pub fn visit(&self, visitor: &mut dyn ContactVisitor) -> Result<(), SyncError> {
		if let Some(child) = &self.child {
			child.visit(visitor)?;
		}
		match &self.kind {
			ContactKind::ConnectRequest(d) => visitor.on_connect_request(d)?,
			ContactKind::DialRequest(d) => visitor.on_dial_request(d)?,
			ContactKind::RelayConnectRequest(d) => visitor.on_relay_connect_request(d)?,
			ContactKind::PeerState(d) => visitor.on_peer_state(d)?,
			ContactKind::IgnoredConnected(d) => visitor.on_ignored_connected(d)?,
			ContactKind::UnknownConnected(d) => visitor.on_unknown_connected(d)?,
		}
		if let Some(sibling) = &self.sibling {
			sibling.visit(visitor)?;
		}
		Ok(())
	}
}

/// Observer of contact diffs, driving the networking layer
#[allow(unused_variables)]
pub trait ContactVisitor {
	fn on_connect_request(&mut self, d: &contact::ConnectRequest) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_dial_request(&mut self, d: &contact::DialRequest) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_relay_connect_request(
		&mut self,
		d: &contact::RelayConnectRequest,
	) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_peer_state(&mut self, d: &contact::PeerState) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_ignored_connected(&mut self, d: &contact::IgnoredConnected) -> Result<(), SyncError> {
		Ok(())
	}
	fn on_unknown_connected(&mut self, d: &contact::UnknownConnected) -> Result<(), SyncError> {
		Ok(())
	}
}


// vim: ts=4
