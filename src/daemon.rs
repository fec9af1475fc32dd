//! Daemon orchestration
//!
//! Startup wires the pieces together: configuration, device identity, the
//! store, the loaded cluster, the command batch, then folder scans on the
//! scan scheduler with the hasher pool. Without networking attached, the
//! daemon serves scans and timers: `rescan_dirs` keeps folders fresh and
//! `inactivate` exits after a quiet period.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use std::time::Duration;

use crate::command::{Command, Directive};
use crate::config::Config;
use crate::db::{load_cluster_diff, loader::LoadProgress, Db, DbObserver};
use crate::error::SyncError;
use crate::identity::{generate_keypair, DeviceId};
use crate::logging::*;
use crate::model::{Cluster, Device};
use crate::runtime::Scheduler;
use crate::scan::{
	apply_model_update, local_view, peer_view, HasherPool, ScanEngine, ScanOptions, ScanStatus,
};
use crate::sequencer::Sequencer;

enum DaemonMsg {
	Rescan,
	InactivityCheck,
}

struct DaemonState<'db> {
	config: Config,
	cluster: Cluster,
	sequencer: Sequencer,
	observer: DbObserver<'db>,
	pool: HasherPool,
	/// Bumps on every applied diff; the inactivity timer watches it
	activity: u64,
	activity_at_last_check: u64,
}

/// Run the daemon. Returns the process exit code.
pub fn run(config_dir: &Path, command_args: &[String]) -> i32 {
	match run_inner(config_dir, command_args) {
		Ok(()) => 0,
		Err(e) => {
			error!("{}", e);
			1
		}
	}
}

fn run_inner(config_dir: &Path, command_args: &[String]) -> Result<(), SyncError> {
	std::fs::create_dir_all(config_dir)?;
	let config = Config::load_or_default(&config_dir.join("config.toml"))?;

	// device identity: reuse the stored certificate, generate on first run
	let cert_path = config_dir.join(&config.cert_file);
	let key_path = config_dir.join(&config.key_file);
	let cert_der = if cert_path.exists() {
		std::fs::read(&cert_path)?
	} else {
		let keys = generate_keypair(&config.device_name)?;
		std::fs::write(&cert_path, &keys.cert_der)?;
		std::fs::write(&key_path, &keys.key_der)?;
		info!("generated device certificate at {}", cert_path.display());
		keys.cert_der
	};
	let device_id = DeviceId::from_cert(&cert_der);
	info!("device {} ({})", config.device_name, device_id);

	let db = Db::open(&config_dir.join("cluster.db"))?;
	let mut sequencer = Sequencer::new();
	let mut cluster = Cluster::new(Device::new(
		sequencer.next_uuid(),
		device_id,
		&config.device_name,
	));
	let load = load_cluster_diff(&db)?;
	let mut progress = LoadProgress::new();
	load.apply_controlled(&mut cluster, &mut progress)?;
	info!(
		"cluster loaded: {} devices, {} folders, {} blocks",
		cluster.devices.len(),
		cluster.folders.len(),
		cluster.blocks.len()
	);

	let mut observer = DbObserver::new(
		&db,
		config.db.uncommitted_threshold as usize,
		config.db.upper_limit,
	);

	// the command batch runs before serving; any failure aborts startup
	let mut inactivate_after = None;
	let mut rescan_every = None;
	for arg in command_args {
		let command = Command::parse(arg).map_err(SyncError::from)?;
		let directive = command.execute(
			&mut cluster,
			&mut sequencer,
			&config.default_location,
			Some(&mut observer),
		)?;
		match directive {
			Directive::None => {}
			Directive::Inactivate { seconds } => inactivate_after = Some(seconds),
			Directive::Rescan { seconds } => rescan_every = Some(seconds),
		}
	}
	observer.flush()?;

	let mut scheduler: Scheduler<DaemonMsg> = Scheduler::new(Duration::ZERO);
	let pool = HasherPool::new(config.hasher_threads as usize, Some(scheduler.waker()));
	let mut state = DaemonState {
		config,
		cluster,
		sequencer,
		observer,
		pool,
		activity: 0,
		activity_at_last_check: 0,
	};

	state.scan_all_folders()?;
	state.observer.flush()?;

	if inactivate_after.is_none() && rescan_every.is_none() {
		info!("no serving directives; exiting after initial scan");
		return Ok(());
	}
	if let Some(seconds) = rescan_every {
		scheduler.schedule(Duration::from_secs(seconds as u64), DaemonMsg::Rescan);
	}
	if let Some(seconds) = inactivate_after {
		scheduler.schedule(Duration::from_secs(seconds as u64), DaemonMsg::InactivityCheck);
	}

	let rescan = rescan_every;
	let inactivate = inactivate_after;
	scheduler.run(&mut state, move |scheduler, state, msg| match msg {
		DaemonMsg::Rescan => {
			if let Err(e) = state.scan_all_folders() {
				error!("rescan failed: {}", e);
			}
			if let Err(e) = state.observer.flush() {
				error!("store flush failed: {}", e);
			}
			if let Some(seconds) = rescan {
				scheduler.schedule(Duration::from_secs(seconds as u64), DaemonMsg::Rescan);
			}
		}
		DaemonMsg::InactivityCheck => {
			if state.activity == state.activity_at_last_check {
				info!("no cluster activity; shutting down");
				scheduler.shutdown();
			} else {
				state.activity_at_last_check = state.activity;
				if let Some(seconds) = inactivate {
					scheduler
						.schedule(Duration::from_secs(seconds as u64), DaemonMsg::InactivityCheck);
				}
			}
		}
	});

	state.observer.flush()?;
	state.pool.shutdown();
	Ok(())
}

impl<'db> DaemonState<'db> {
	/// Scan every unsuspended, unpaused folder to completion, applying one
	/// model update per engine tick.
	fn scan_all_folders(&mut self) -> Result<(), SyncError> {
		let budget =
			Arc::new(AtomicI64::new(self.config.fs.concurrent_hashes_limit as i64));
		let folder_ids: Vec<String> = self
			.cluster
			.folders
			.values()
			.filter(|f| !f.settings.paused && !f.suspended)
			.map(|f| f.id().to_string())
			.collect();
		let device = self.cluster.self_id();

		let mut engines: BTreeMap<String, (ScanEngine, ScanStatus)> = BTreeMap::new();
		for folder_id in folder_ids {
			let folder = match self.cluster.folder(&folder_id) {
				Some(folder) => folder,
				None => continue,
			};
			let options = ScanOptions {
				files_scan_iteration_limit: self.config.fs.files_scan_iteration_limit as usize,
				bytes_scan_iteration_limit: self.config.fs.bytes_scan_iteration_limit,
				ignore_permissions: folder.settings.ignore_permissions,
				..ScanOptions::default()
			};
			let engine = ScanEngine::new(
				&folder_id,
				device,
				folder.settings.path.clone(),
				local_view(&self.cluster, &folder_id),
				peer_view(&self.cluster, &folder_id),
				options,
				budget.clone(),
			);
			engines.insert(folder_id, (engine, ScanStatus::Running));
		}

		loop {
			let mut progressed = false;
			let mut waiting = false;
			for (folder_id, (engine, status)) in engines.iter_mut() {
				if matches!(
					status,
					ScanStatus::Finished | ScanStatus::Suspended | ScanStatus::Fatal
				) {
					continue;
				}
				*status = engine.tick(&self.pool);
				let events = engine.take_events();
				if !events.is_empty() {
					let now = chrono::Utc::now().timestamp();
					let update = apply_model_update(
						&mut self.cluster,
						&mut self.sequencer,
						folder_id,
						events,
						now,
					)?;
					self.observer.record(&update, &self.cluster)?;
					self.activity += 1;
					progressed = true;
				}
				match status {
					ScanStatus::Running => progressed = true,
					ScanStatus::Waiting => waiting = true,
					_ => {}
				}
			}
			let busy: Vec<&String> = engines
				.iter()
				.filter(|(_, (_, s))| {
					!matches!(s, ScanStatus::Finished | ScanStatus::Suspended | ScanStatus::Fatal)
				})
				.map(|(id, _)| id)
				.collect();
			if busy.is_empty() {
				break;
			}
			if !progressed && waiting {
				// every engine is waiting on the hashers; block for one
				// result and route it home
				match self.pool.recv() {
					Some(result) => {
						if let Some((engine, _)) = engines.get_mut(&result.folder) {
							engine.on_hash_result(result, &self.pool);
						}
					}
					None => break,
				}
			}
		}
		Ok(())
	}
}

// vim: ts=4
