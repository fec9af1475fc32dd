//! Cross-thread wake primitive
//!
//! A scheduler sleeps in `wait` until another thread calls `wake`. On unix
//! the primitive is a self-pipe polled alongside a dirty flag: the flag is
//! set before the write and cleared after draining, so repeated wakes never
//! overflow the pipe. Elsewhere a condition variable does the same job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub struct Waker {
	inner: WakerImpl,
}

enum WakerImpl {
	#[cfg(unix)]
	Pipe(PipeWaker),
	Condvar(CondvarWaker),
}

impl Waker {
	/// Platform default: self-pipe on unix, condition variable elsewhere
	pub fn new() -> Self {
		#[cfg(unix)]
		{
			if let Some(pipe) = PipeWaker::new() {
				return Waker { inner: WakerImpl::Pipe(pipe) };
			}
		}
		Waker::condvar()
	}

	/// Portable fallback
	pub fn condvar() -> Self {
		Waker { inner: WakerImpl::Condvar(CondvarWaker::default()) }
	}

	pub fn wake(&self) {
		match &self.inner {
			#[cfg(unix)]
			WakerImpl::Pipe(pipe) => pipe.wake(),
			WakerImpl::Condvar(cv) => cv.wake(),
		}
	}

	/// Block until woken or the timeout elapses. Returns whether a wake
	/// arrived.
	pub fn wait(&self, timeout: Duration) -> bool {
		match &self.inner {
			#[cfg(unix)]
			WakerImpl::Pipe(pipe) => pipe.wait(timeout),
			WakerImpl::Condvar(cv) => cv.wait(timeout),
		}
	}
}

impl Default for Waker {
	fn default() -> Self {
		Waker::new()
	}
}

#[cfg(unix)]
struct PipeWaker {
	read_fd: libc::c_int,
	write_fd: libc::c_int,
	dirty: AtomicBool,
}

#[cfg(unix)]
#[allow(unsafe_code)] // thin wrappers around pipe/poll/read/write/close
impl PipeWaker {
	fn new() -> Option<Self> {
		let mut fds = [0 as libc::c_int; 2];
		// SAFETY: fds points at two writable ints; pipe fills them or fails
		let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
		if rc != 0 {
			return None;
		}
		Some(PipeWaker { read_fd: fds[0], write_fd: fds[1], dirty: AtomicBool::new(false) })
	}

	fn wake(&self) {
		// edge-triggered: one byte per quiet period is enough
		if !self.dirty.swap(true, Ordering::AcqRel) {
			let byte = 1u8;
			// SAFETY: write_fd stays open for the life of self
			unsafe {
				libc::write(self.write_fd, &byte as *const u8 as *const libc::c_void, 1);
			}
		}
	}

	fn wait(&self, timeout: Duration) -> bool {
		let mut pollfd =
			libc::pollfd { fd: self.read_fd, events: libc::POLLIN, revents: 0 };
		let millis = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
		// SAFETY: pollfd is a valid, writable pollfd array of length 1
		let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
		if rc > 0 && pollfd.revents & libc::POLLIN != 0 {
			let mut buf = [0u8; 16];
			// SAFETY: buf is writable and read_fd is open; short reads fine
			unsafe {
				libc::read(self.read_fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len());
			}
			self.dirty.store(false, Ordering::Release);
			return true;
		}
		false
	}
}

#[cfg(unix)]
#[allow(unsafe_code)]
impl Drop for PipeWaker {
	fn drop(&mut self) {
		// SAFETY: both descriptors belong to this waker
		unsafe {
			libc::close(self.read_fd);
			libc::close(self.write_fd);
		}
	}
}

#[derive(Default)]
struct CondvarWaker {
	flag: Mutex<bool>,
	condvar: Condvar,
}

impl CondvarWaker {
	fn wake(&self) {
		if let Ok(mut flag) = self.flag.lock() {
			*flag = true;
		}
		self.condvar.notify_one();
	}

	fn wait(&self, timeout: Duration) -> bool {
		let guard = match self.flag.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		};
		let (mut guard, _) = match self.condvar.wait_timeout_while(guard, timeout, |woken| !*woken)
		{
			Ok(result) => result,
			Err(poisoned) => poisoned.into_inner(),
		};
		let woken = *guard;
		*guard = false;
		woken
	}
}


// vim: ts=4
