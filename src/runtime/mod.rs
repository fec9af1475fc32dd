//! Single-threaded cooperative scheduler
//!
//! Each scheduler is pinned to one OS thread and owns its actors' state;
//! other threads reach it only through its mailbox. The turn loop processes
//! ready messages, drains the inbound queue, spin-waits briefly when
//! configured, then sleeps on the wake primitive until the next timer or
//! message. No preemption happens mid-message; every handler invocation is
//! a critical section with respect to its scheduler.

pub mod queue;
pub mod timer;
pub mod waker;

pub use queue::{Inbound, Mailbox};
pub use timer::{TimerId, TimerQueue};
pub use waker::Waker;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on one sleep; keeps the loop responsive to shutdown even
/// with no timers armed
const MAX_SLEEP: Duration = Duration::from_secs(60);

pub struct Scheduler<M> {
	local: VecDeque<M>,
	inbound: Arc<Inbound<M>>,
	waker: Arc<Waker>,
	timers: TimerQueue<M>,
	poll_timeout: Duration,
	shutting_down: bool,
}

impl<M> Scheduler<M> {
	/// `poll_timeout` is the spin window checked before sleeping; zero
	/// disables spinning.
	pub fn new(poll_timeout: Duration) -> Self {
		let waker = Arc::new(Waker::new());
		Scheduler {
			local: VecDeque::new(),
			inbound: Inbound::new(waker.clone()),
			waker,
			timers: TimerQueue::new(),
			poll_timeout,
			shutting_down: false,
		}
	}

	/// Sending end for other threads
	pub fn mailbox(&self) -> Mailbox<M> {
		Mailbox::new(self.inbound.clone())
	}

	/// The wake primitive; collaborators signal it when work is ready
	pub fn waker(&self) -> Arc<Waker> {
		self.waker.clone()
	}

	/// Enqueue locally; delivered in insertion order
	pub fn push(&mut self, msg: M) {
		self.local.push_back(msg);
	}

	pub fn schedule(&mut self, after: Duration, msg: M) -> TimerId {
		self.timers.schedule_after(after, msg)
	}

	pub fn cancel_timer(&mut self, id: TimerId) -> Option<M> {
		self.timers.cancel(id)
	}

	/// Cooperative shutdown: the loop exits once the current turn finishes.
	/// Pending timers are dropped; in-flight messages stay queued.
	pub fn shutdown(&mut self) {
		self.shutting_down = true;
	}

	pub fn is_shutting_down(&self) -> bool {
		self.shutting_down
	}

	/// Run until shutdown. `handle` is invoked once per message with the
	/// scheduler (for pushes, timers and shutdown) and the actor state.
	pub fn run<S>(&mut self, state: &mut S, mut handle: impl FnMut(&mut Self, &mut S, M)) {
		while !self.shutting_down {
			self.turn(state, &mut handle);
		}
	}

	/// One loop turn; exposed so tests can drive the scheduler manually
	pub fn turn<S>(&mut self, state: &mut S, handle: &mut impl FnMut(&mut Self, &mut S, M)) {
		// process ready messages
		while let Some(msg) = self.local.pop_front() {
			handle(self, state, msg);
			if self.shutting_down {
				return;
			}
		}

		self.inbound.drain_into(&mut self.local);

		if self.local.is_empty() && !self.poll_timeout.is_zero() {
			self.spin_wait();
			self.inbound.drain_into(&mut self.local);
		}

		if self.local.is_empty() {
			let budget = match self.timers.next_deadline() {
				Some(deadline) => deadline
					.saturating_duration_since(Instant::now())
					.min(MAX_SLEEP),
				None => MAX_SLEEP,
			};
			if !budget.is_zero() {
				self.waker.wait(budget);
			}
			self.inbound.drain_into(&mut self.local);
		}

		// advance the timer wheel
		for msg in self.timers.expire(Instant::now()) {
			self.local.push_back(msg);
		}
	}

	/// Busy-poll the inbound queue and timers for up to `poll_timeout`;
	/// trades a little CPU for latency on hot paths
	fn spin_wait(&mut self) {
		let start = Instant::now();
		while start.elapsed() < self.poll_timeout {
			if !self.inbound.is_empty() {
				return;
			}
			if let Some(deadline) = self.timers.next_deadline() {
				if deadline <= Instant::now() {
					return;
				}
			}
			std::hint::spin_loop();
		}
	}
}


// vim: ts=4
