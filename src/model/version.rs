//! Version vectors
//!
//! A version vector maps device IDs to monotonic edit counters. The partial
//! order over vectors decides whether a peer update is newer, older, equal or
//! concurrent with the local record.

use serde::{Deserialize, Serialize};

use crate::identity::DeviceId;

/// One `(device, counter)` entry of a version vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
	pub id: DeviceId,
	pub value: u64,
}

/// Outcome of comparing two version vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrder {
	Equal,
	/// Left strictly dominates right
	Dominates,
	/// Right strictly dominates left
	Dominated,
	/// Concurrent edits, neither dominates
	Concurrent,
}

/// Version vector: at most one counter per device ID
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionVector {
	counters: Vec<Counter>,
}

impl VersionVector {
	pub fn new() -> Self {
		VersionVector { counters: Vec::new() }
	}

	/// Vector with a single counter, the common starting point
	pub fn single(id: DeviceId, value: u64) -> Self {
		VersionVector { counters: vec![Counter { id, value }] }
	}

	pub fn counters(&self) -> &[Counter] {
		&self.counters
	}

	pub fn is_empty(&self) -> bool {
		self.counters.is_empty()
	}

	pub fn get(&self, id: &DeviceId) -> u64 {
		self.counters.iter().find(|c| &c.id == id).map(|c| c.value).unwrap_or(0)
	}

	/// Set the counter for a device, replacing any previous entry
	pub fn set(&mut self, id: DeviceId, value: u64) {
		match self.counters.iter_mut().find(|c| c.id == id) {
			Some(c) => c.value = value,
			None => self.counters.push(Counter { id, value }),
		}
	}

	/// The entry with the highest counter value
	pub fn best(&self) -> Option<&Counter> {
		self.counters.iter().max_by_key(|c| c.value)
	}

	/// Bump the counter of `id` to one above the current maximum of the
	/// whole vector. Used when a device records a new local edit.
	pub fn bump(&mut self, id: DeviceId) {
		let next = self.counters.iter().map(|c| c.value).max().unwrap_or(0) + 1;
		self.set(id, next);
	}

	/// Partial order: `self >= other` iff every counter in `other` has a
	/// greater-or-equal counterpart in `self`.
	pub fn compare(&self, other: &VersionVector) -> VersionOrder {
		let mut self_greater = false;
		let mut other_greater = false;

		for c in &self.counters {
			let o = other.get(&c.id);
			if c.value > o {
				self_greater = true;
			} else if c.value < o {
				other_greater = true;
			}
		}
		for c in &other.counters {
			if self.get(&c.id) < c.value {
				other_greater = true;
			}
		}

		match (self_greater, other_greater) {
			(false, false) => VersionOrder::Equal,
			(true, false) => VersionOrder::Dominates,
			(false, true) => VersionOrder::Dominated,
			(true, true) => VersionOrder::Concurrent,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dev(n: u8) -> DeviceId {
		DeviceId::from_bytes([n; 32])
	}

	#[test]
	fn test_empty_vectors_are_equal() {
		let a = VersionVector::new();
		let b = VersionVector::new();
		assert_eq!(a.compare(&b), VersionOrder::Equal);
	}

	#[test]
	fn test_dominates() {
		let mut a = VersionVector::new();
		a.set(dev(1), 2);
		let b = VersionVector::single(dev(1), 1);
		assert_eq!(a.compare(&b), VersionOrder::Dominates);
		assert_eq!(b.compare(&a), VersionOrder::Dominated);
	}

	#[test]
	fn test_superset_dominates() {
		let mut a = VersionVector::single(dev(1), 1);
		a.set(dev(2), 1);
		let b = VersionVector::single(dev(1), 1);
		assert_eq!(a.compare(&b), VersionOrder::Dominates);
	}

	#[test]
	fn test_concurrent() {
		let a = VersionVector::single(dev(1), 1);
		let b = VersionVector::single(dev(2), 1);
		assert_eq!(a.compare(&b), VersionOrder::Concurrent);
		assert_eq!(b.compare(&a), VersionOrder::Concurrent);
	}

	#[test]
	fn test_bump_goes_above_global_max() {
		let mut v = VersionVector::single(dev(1), 5);
		v.set(dev(2), 9);
		v.bump(dev(1));
		assert_eq!(v.get(&dev(1)), 10);
	}

	#[test]
	fn test_set_keeps_one_counter_per_device() {
		let mut v = VersionVector::new();
		v.set(dev(1), 1);
		v.set(dev(1), 3);
		assert_eq!(v.counters().len(), 1);
		assert_eq!(v.get(&dev(1)), 3);
	}

	#[test]
	fn test_best() {
		let mut v = VersionVector::single(dev(1), 2);
		v.set(dev(2), 7);
		assert_eq!(v.best().unwrap().id, dev(2));
	}
}

// vim: ts=4
