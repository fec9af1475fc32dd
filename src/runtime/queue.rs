//! Cross-thread message queue
//!
//! Senders hold cloneable mailboxes; the receiving scheduler drains the
//! queue on each turn. Per-sender FIFO ordering only; no guarantee is made
//! across sender threads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::waker::Waker;

pub struct Inbound<M> {
	queue: Mutex<VecDeque<M>>,
	waker: Arc<Waker>,
}

impl<M> Inbound<M> {
	pub fn new(waker: Arc<Waker>) -> Arc<Self> {
		Arc::new(Inbound { queue: Mutex::new(VecDeque::new()), waker })
	}

	/// Move everything into `into`, preserving order
	pub fn drain_into(&self, into: &mut VecDeque<M>) {
		let mut queue = match self.queue.lock() {
			Ok(queue) => queue,
			Err(poisoned) => poisoned.into_inner(),
		};
		into.append(&mut queue);
	}

	pub fn is_empty(&self) -> bool {
		match self.queue.lock() {
			Ok(queue) => queue.is_empty(),
			Err(poisoned) => poisoned.into_inner().is_empty(),
		}
	}

	fn push(&self, msg: M) {
		{
			let mut queue = match self.queue.lock() {
				Ok(queue) => queue,
				Err(poisoned) => poisoned.into_inner(),
			};
			queue.push_back(msg);
		}
		self.waker.wake();
	}
}

/// Cloneable sending end of a scheduler's inbound queue
pub struct Mailbox<M> {
	inbound: Arc<Inbound<M>>,
}

impl<M> Mailbox<M> {
	pub fn new(inbound: Arc<Inbound<M>>) -> Self {
		Mailbox { inbound }
	}

	pub fn send(&self, msg: M) {
		self.inbound.push(msg);
	}
}

impl<M> Clone for Mailbox<M> {
	fn clone(&self) -> Self {
		Mailbox { inbound: self.inbound.clone() }
	}
}


// vim: ts=4
