//! Scheduler timers
//!
//! A sorted list of deadlines. The scheduler computes its sleep budget from
//! the nearest deadline and fires expired timers in order on wake.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(Instant, u64);

pub struct TimerQueue<M> {
	entries: BTreeMap<(Instant, u64), M>,
	counter: u64,
}

impl<M> TimerQueue<M> {
	pub fn new() -> Self {
		TimerQueue { entries: BTreeMap::new(), counter: 0 }
	}

	pub fn schedule(&mut self, deadline: Instant, msg: M) -> TimerId {
		self.counter += 1;
		let id = TimerId(deadline, self.counter);
		self.entries.insert((deadline, self.counter), msg);
		id
	}

	pub fn schedule_after(&mut self, after: Duration, msg: M) -> TimerId {
		self.schedule(Instant::now() + after, msg)
	}

	/// Cancelled timers never fire; cancelling twice is fine
	pub fn cancel(&mut self, id: TimerId) -> Option<M> {
		self.entries.remove(&(id.0, id.1))
	}

	pub fn next_deadline(&self) -> Option<Instant> {
		self.entries.keys().next().map(|(deadline, _)| *deadline)
	}

	/// Pop every timer with a deadline at or before `now`, in order
	pub fn expire(&mut self, now: Instant) -> Vec<M> {
		let mut fired = Vec::new();
		loop {
			let key = match self.entries.keys().next() {
				Some(&(deadline, seq)) if deadline <= now => (deadline, seq),
				_ => break,
			};
			if let Some(msg) = self.entries.remove(&key) {
				fired.push(msg);
			}
		}
		fired
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

impl<M> Default for TimerQueue<M> {
	fn default() -> Self {
		TimerQueue::new()
	}
}


// vim: ts=4
