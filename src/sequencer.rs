//! Deterministic generator for entity keys and index IDs
//!
//! Seeded at startup from the OS; tests inject a fixed seed so generated
//! UUIDs and counters are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use uuid::Uuid;

pub struct Sequencer {
	rng: StdRng,
}

impl Sequencer {
	/// Sequencer seeded from the operating system
	pub fn new() -> Self {
		Sequencer { rng: StdRng::from_entropy() }
	}

	/// Sequencer with an injected seed, for reproducible tests
	pub fn with_seed(seed: u64) -> Self {
		Sequencer { rng: StdRng::seed_from_u64(seed) }
	}

	/// Fresh v4 UUID
	pub fn next_uuid(&mut self) -> Uuid {
		let bytes: [u8; 16] = self.rng.gen();
		uuid::Builder::from_random_bytes(bytes).into_uuid()
	}

	/// Fresh 64-bit value (index IDs)
	pub fn next_u64(&mut self) -> u64 {
		self.rng.next_u64()
	}
}

impl Default for Sequencer {
	fn default() -> Self {
		Sequencer::new()
	}
}


// vim: ts=4
