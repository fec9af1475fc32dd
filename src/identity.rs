//! Device identity and block digests
//!
//! A device is identified by the SHA-256 of its X.509 certificate. The ID is
//! rendered as base-32 in four dash-separated groups, each carrying a check
//! character, e.g. `KHQNO2S-...`. Block digests are plain SHA-256 over the
//! raw block bytes; the weak hash is a rolling checksum over the same bytes.

use rollsum::Engine;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ModelError;

/// Strong digest of one block: SHA-256 over the block bytes
pub type BlockHash = [u8; 32];

/// Base-32 alphabet used for device IDs (RFC 4648, no padding)
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Data characters per dash-separated group
const GROUP_LEN: usize = 13;

/// Characters of the short device-ID form
pub const SHORT_ID_LEN: usize = 7;

/// Device identifier: SHA-256 of the device certificate (DER)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct DeviceId(pub [u8; 32]);

impl DeviceId {
	/// Derive the device ID from a DER-encoded certificate
	pub fn from_cert(cert_der: &[u8]) -> Self {
		let mut hasher = Sha256::new();
		hasher.update(cert_der);
		DeviceId(hasher.finalize().into())
	}

	/// Construct from raw digest bytes (tests, storage)
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		DeviceId(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	/// Short form: the first characters of the base-32 rendering
	pub fn short(&self) -> String {
		let full = base32_encode(&self.0);
		full[..SHORT_ID_LEN].to_string()
	}

	/// Full form: four dash-separated groups, check character per group
	pub fn full(&self) -> String {
		let data = base32_encode(&self.0);
		let mut out = String::with_capacity(data.len() + 4 + 3);
		for (i, group) in data.as_bytes().chunks(GROUP_LEN).enumerate() {
			if i > 0 {
				out.push('-');
			}
			let group = std::str::from_utf8(group).unwrap_or("");
			out.push_str(group);
			out.push(luhn32_check_char(group));
		}
		out
	}

	/// Parse the full rendered form, verifying the per-group check characters.
	/// Dashes and spaces are ignored; lower case is accepted.
	pub fn parse(input: &str) -> Result<Self, ModelError> {
		let cleaned: String =
			input.chars().filter(|c| *c != '-' && *c != ' ').map(|c| c.to_ascii_uppercase()).collect();
		let invalid = || ModelError::InvalidDeviceId { input: input.to_string() };

		let data = match cleaned.len() {
			// full form with check characters
			56 => {
				let mut data = String::with_capacity(52);
				for group in cleaned.as_bytes().chunks(GROUP_LEN + 1) {
					let group = std::str::from_utf8(group).map_err(|_| invalid())?;
					let (body, check) = group.split_at(GROUP_LEN);
					if luhn32_check_char(body) != check.chars().next().unwrap_or('\0') {
						return Err(invalid());
					}
					data.push_str(body);
				}
				data
			}
			// bare base-32 digest, no check characters
			52 => cleaned,
			_ => return Err(invalid()),
		};

		let bytes = base32_decode(&data).ok_or_else(invalid)?;
		Ok(DeviceId(bytes))
	}

	/// Does `prefix` match this device (short form or a longer prefix)?
	pub fn matches_short(&self, prefix: &str) -> bool {
		if prefix.len() < SHORT_ID_LEN {
			return false;
		}
		let full = base32_encode(&self.0);
		full.starts_with(&prefix.to_ascii_uppercase())
	}
}

impl fmt::Display for DeviceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.full())
	}
}

impl fmt::Debug for DeviceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "DeviceId({})", self.short())
	}
}

/// A freshly generated device certificate and private key, both DER
pub struct DeviceKeys {
	pub cert_der: Vec<u8>,
	pub key_der: Vec<u8>,
}

/// Generate a long-lived self-signed certificate for this device.
/// The SHA-256 of the certificate is the canonical device ID.
pub fn generate_keypair(issuer: &str) -> Result<DeviceKeys, String> {
	let mut params = rcgen::CertificateParams::new(vec![issuer.to_string()]);
	params.distinguished_name.push(rcgen::DnType::CommonName, issuer);
	let cert = rcgen::Certificate::from_params(params)
		.map_err(|e| format!("certificate generation failed: {}", e))?;
	let cert_der =
		cert.serialize_der().map_err(|e| format!("certificate serialization failed: {}", e))?;
	let key_der = cert.serialize_private_key_der();
	Ok(DeviceKeys { cert_der, key_der })
}

/// SHA-256 over the raw block bytes
pub fn hash_block(buf: &[u8]) -> BlockHash {
	let mut hasher = Sha256::new();
	hasher.update(buf);
	hasher.finalize().into()
}

/// Weak rolling checksum over the raw block bytes
pub fn weak_hash(buf: &[u8]) -> u32 {
	let mut engine = rollsum::Bup::new();
	engine.roll(buf);
	engine.digest()
}

/// Render a digest for logs (base64, the compact form)
pub fn render_digest(hash: &BlockHash) -> String {
	use base64::engine::Engine as _;
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
}

fn base32_encode(bytes: &[u8; 32]) -> String {
	let mut out = String::with_capacity(52);
	let mut acc: u32 = 0;
	let mut bits = 0u32;
	for &b in bytes.iter() {
		acc = (acc << 8) | b as u32;
		bits += 8;
		while bits >= 5 {
			bits -= 5;
			out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
		}
	}
	if bits > 0 {
		out.push(ALPHABET[((acc << (5 - bits)) & 0x1f) as usize] as char);
	}
	out
}

fn base32_decode(data: &str) -> Option<[u8; 32]> {
	let mut out = Vec::with_capacity(32);
	let mut acc: u32 = 0;
	let mut bits = 0u32;
	for c in data.bytes() {
		let v = ALPHABET.iter().position(|&a| a == c)? as u32;
		acc = (acc << 5) | v;
		bits += 5;
		if bits >= 8 {
			bits -= 8;
			out.push(((acc >> bits) & 0xff) as u8);
		}
	}
	if out.len() != 32 {
		return None;
	}
	let mut bytes = [0u8; 32];
	bytes.copy_from_slice(&out);
	Some(bytes)
}

/// Luhn mod-32 check character over one group of data characters
fn luhn32_check_char(group: &str) -> char {
	let n = ALPHABET.len() as u32;
	let mut factor = 1u32;
	let mut sum = 0u32;
	for c in group.bytes() {
		let code = ALPHABET.iter().position(|&a| a == c).unwrap_or(0) as u32;
		let mut addend = factor * code;
		factor = if factor == 2 { 1 } else { 2 };
		addend = (addend / n) + (addend % n);
		sum += addend;
	}
	let remainder = sum % n;
	let check = (n - remainder) % n;
	ALPHABET[check as usize] as char
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_device_id_from_digest() {
		let id = DeviceId::from_bytes([0xab; 32]);
		let full = id.full();
		assert_eq!(full.len(), 52 + 4 + 3);
		assert_eq!(full.matches('-').count(), 3);
		assert_eq!(id.short().len(), SHORT_ID_LEN);
		assert!(full.starts_with(&id.short()));
	}

	#[test]
	fn test_device_id_roundtrip() {
		let id = DeviceId::from_bytes([0x5a; 32]);
		let parsed = DeviceId::parse(&id.full()).unwrap();
		assert_eq!(parsed, id);
	}

	#[test]
	fn test_device_id_roundtrip_lowercase_and_spaces() {
		let id = DeviceId::from_bytes([0x17; 32]);
		let rendered = id.full().to_ascii_lowercase().replace('-', " ");
		assert_eq!(DeviceId::parse(&rendered).unwrap(), id);
	}

	#[test]
	fn test_device_id_rejects_corrupted_check_char() {
		let id = DeviceId::from_bytes([0x42; 32]);
		let mut full = id.full();
		// flip the first check character (position 13 of the first group)
		let replacement = if full.as_bytes()[13] == b'A' { 'B' } else { 'A' };
		full.replace_range(13..14, &replacement.to_string());
		assert!(DeviceId::parse(&full).is_err());
	}

	#[test]
	fn test_device_id_rejects_garbage() {
		assert!(DeviceId::parse("").is_err());
		assert!(DeviceId::parse("NOT-A-DEVICE-ID").is_err());
		assert!(DeviceId::parse(&"1".repeat(56)).is_err());
	}

	#[test]
	fn test_short_prefix_match() {
		let id = DeviceId::from_bytes([0x99; 32]);
		let short = id.short();
		assert!(id.matches_short(&short));
		assert!(id.matches_short(&short.to_ascii_lowercase()));
		assert!(!id.matches_short("A"));
	}

	#[test]
	fn test_hash_block_deterministic() {
		let h1 = hash_block(b"12345");
		let h2 = hash_block(b"12345");
		assert_eq!(h1, h2);
		assert_ne!(h1, hash_block(b"12346"));
	}

	#[test]
	fn test_keypair_produces_stable_device_id() {
		let keys = generate_keypair("bepsync test").unwrap();
		let id1 = DeviceId::from_cert(&keys.cert_der);
		let id2 = DeviceId::from_cert(&keys.cert_der);
		assert_eq!(id1, id2);
		assert_eq!(id1.full().len(), 59);
	}

	#[test]
	fn test_weak_hash_differs() {
		assert_ne!(weak_hash(b"aaaaaaaa"), weak_hash(b"bbbbbbbb"));
	}
}

// vim: ts=4
