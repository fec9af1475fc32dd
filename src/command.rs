//! Daemon commands
//!
//! Each `--command` argument is a colon-separated form executed against the
//! cluster before the daemon settles into serving. Parse errors and failed
//! executions abort startup with exit code 1.

use std::path::{Path, PathBuf};

use crate::diff::modify::{CreateFolder, ShareFolder, UpdatePeer};
use crate::error::{ModelError, SyncError};
use crate::identity::DeviceId;
use crate::logging::*;
use crate::model::folder::FolderSettings;
use crate::model::Cluster;
use crate::sequencer::Sequencer;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	/// `add_peer:<label>:<device-id>`
	AddPeer { label: String, device_id: DeviceId },
	/// `add_folder:label=<l>:id=<id>:path=<p>`; id and path are optional
	AddFolder { label: String, id: Option<String>, path: Option<PathBuf> },
	/// `share:folder=<label-or-id>:device=<short-or-name>`
	Share { folder: String, device: String },
	/// `inactivate:<seconds>`: exit after a quiet period
	Inactivate { seconds: u32 },
	/// `rescan_dirs:<seconds>`: periodic folder rescans
	RescanDirs { seconds: u32 },
}

/// Runtime directives some commands turn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
	None,
	Inactivate { seconds: u32 },
	Rescan { seconds: u32 },
}

impl Command {
	pub fn parse(input: &str) -> Result<Command, String> {
		let (name, rest) = match input.find(':') {
			Some(pos) => (&input[..pos], &input[pos + 1..]),
			None => (input, ""),
		};
		match name {
			"add_peer" => {
				let mut parts = rest.splitn(2, ':');
				let label = parts.next().unwrap_or("").to_string();
				let id = parts.next().ok_or_else(|| {
					format!("add_peer needs <label>:<device-id>, got '{}'", rest)
				})?;
				let device_id =
					DeviceId::parse(id).map_err(|e| format!("bad device id: {}", e))?;
				if label.is_empty() {
					return Err("add_peer needs a non-empty label".to_string());
				}
				Ok(Command::AddPeer { label, device_id })
			}
			"add_folder" => {
				let mut label = None;
				let mut id = None;
				let mut path = None;
				for part in rest.split(':') {
					match part.split_once('=') {
						Some(("label", v)) => label = Some(v.to_string()),
						Some(("id", v)) => id = Some(v.to_string()),
						Some(("path", v)) => path = Some(PathBuf::from(v)),
						_ => return Err(format!("unknown add_folder part '{}'", part)),
					}
				}
				let label =
					label.ok_or_else(|| "add_folder needs label=<l>".to_string())?;
				Ok(Command::AddFolder { label, id, path })
			}
			"share" => {
				let mut folder = None;
				let mut device = None;
				for part in rest.split(':') {
					match part.split_once('=') {
						Some(("folder", v)) => folder = Some(v.to_string()),
						Some(("device", v)) => device = Some(v.to_string()),
						_ => return Err(format!("unknown share part '{}'", part)),
					}
				}
				match (folder, device) {
					(Some(folder), Some(device)) => Ok(Command::Share { folder, device }),
					_ => Err("share needs folder=<label-or-id>:device=<short-or-name>".to_string()),
				}
			}
			"inactivate" => {
				let seconds: u32 =
					rest.parse().map_err(|_| format!("bad inactivate seconds '{}'", rest))?;
				if seconds == 0 {
					return Err("inactivate seconds must be positive".to_string());
				}
				Ok(Command::Inactivate { seconds })
			}
			"rescan_dirs" => {
				let seconds: u32 =
					rest.parse().map_err(|_| format!("bad rescan_dirs seconds '{}'", rest))?;
				if seconds == 0 {
					return Err("rescan_dirs seconds must be positive".to_string());
				}
				Ok(Command::RescanDirs { seconds })
			}
			_ => Err(format!("unknown command '{}'", name)),
		}
	}

	/// Execute against the cluster, applying the diffs a command implies.
	/// `observer`, when given, persists the applied diffs.
	pub fn execute(
		&self,
		cluster: &mut Cluster,
		sequencer: &mut Sequencer,
		default_location: &Path,
		mut observer: Option<&mut crate::db::DbObserver<'_>>,
	) -> Result<Directive, SyncError> {
		let mut commit = |diff: crate::diff::Diff,
		                  cluster: &mut Cluster|
		 -> Result<(), SyncError> {
			diff.apply(cluster)?;
			if let Some(observer) = observer.as_deref_mut() {
				observer.record(&diff, cluster)?;
			}
			Ok(())
		};
		match self {
			Command::AddPeer { label, device_id } => {
				if cluster.devices.contains_key(device_id) {
					return Err(ModelError::DeviceAlreadyExists {
						device_id: device_id.short(),
					}
					.into());
				}
				let diff = UpdatePeer::create(cluster, sequencer, *device_id, label);
				commit(diff, cluster)?;
				info!("added peer {} ({})", label, device_id.short());
				Ok(Directive::None)
			}
			Command::AddFolder { label, id, path } => {
				let folder_id = match id {
					Some(id) => id.clone(),
					None => {
						// generated IDs follow the conventional xxxx-xxxx shape
						let uuid = sequencer.next_uuid().simple().to_string();
						format!("{}-{}", &uuid[..4], &uuid[4..8])
					}
				};
				let folder_path = match path {
					Some(path) => path.clone(),
					None => default_location.join(label),
				};
				let settings = FolderSettings::new(&folder_id, label, folder_path);
				let diff = CreateFolder::create(sequencer, settings);
				commit(diff, cluster)?;
				info!("created folder {} ({})", label, folder_id);
				Ok(Directive::None)
			}
			Command::Share { folder, device } => {
				let folder_id = cluster
					.find_folder(folder)
					.map(|f| f.id().to_string())
					.ok_or_else(|| ModelError::NoSuchFolder { folder_id: folder.clone() })?;
				let device_id = cluster
					.find_device(device)
					.map(|d| d.id)
					.ok_or_else(|| ModelError::NoSuchDevice { device_id: device.clone() })?;
				let diff = ShareFolder::create(cluster, sequencer, &folder_id, device_id)?;
				commit(diff, cluster)?;
				info!("shared folder {} with {}", folder_id, device_id.short());
				Ok(Directive::None)
			}
			Command::Inactivate { seconds } => Ok(Directive::Inactivate { seconds: *seconds }),
			Command::RescanDirs { seconds } => Ok(Directive::Rescan { seconds: *seconds }),
		}
	}
}


// vim: ts=4
