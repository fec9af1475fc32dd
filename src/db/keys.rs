//! Store key schema
//!
//! Keys are a one-byte entity prefix followed by the entity's 16-byte UUID,
//! or its natural key for naturally-keyed entities (device ID, folder ID,
//! their combination).

use uuid::Uuid;

use crate::identity::{BlockHash, DeviceId};

pub const PREFIX_FOLDER: u8 = 0x01;
pub const PREFIX_DEVICE: u8 = 0x02;
pub const PREFIX_FOLDER_INFO: u8 = 0x03;
pub const PREFIX_FILE_INFO: u8 = 0x04;
pub const PREFIX_BLOCK_INFO: u8 = 0x05;
pub const PREFIX_PENDING_DEVICE: u8 = 0x06;
pub const PREFIX_IGNORED_DEVICE: u8 = 0x07;
pub const PREFIX_PENDING_FOLDER: u8 = 0x08;

pub fn folder_key(folder_id: &str) -> Vec<u8> {
	natural(PREFIX_FOLDER, folder_id.as_bytes())
}

pub fn device_key(device: &DeviceId) -> Vec<u8> {
	natural(PREFIX_DEVICE, device.as_bytes())
}

/// Folder infos are naturally keyed by (device, folder)
pub fn folder_info_key(folder_id: &str, device: &DeviceId) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + 32 + folder_id.len());
	key.push(PREFIX_FOLDER_INFO);
	key.extend_from_slice(device.as_bytes());
	key.extend_from_slice(folder_id.as_bytes());
	key
}

pub fn file_info_key(file: &Uuid) -> Vec<u8> {
	natural(PREFIX_FILE_INFO, file.as_bytes())
}

pub fn block_key(hash: &BlockHash) -> Vec<u8> {
	natural(PREFIX_BLOCK_INFO, hash)
}

pub fn pending_device_key(device: &DeviceId) -> Vec<u8> {
	natural(PREFIX_PENDING_DEVICE, device.as_bytes())
}

pub fn ignored_device_key(device: &DeviceId) -> Vec<u8> {
	natural(PREFIX_IGNORED_DEVICE, device.as_bytes())
}

pub fn pending_folder_key(folder_id: &str, device: &DeviceId) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + 32 + folder_id.len());
	key.push(PREFIX_PENDING_FOLDER);
	key.extend_from_slice(device.as_bytes());
	key.extend_from_slice(folder_id.as_bytes());
	key
}

pub fn prefix_of(key: &[u8]) -> Option<u8> {
	key.first().copied()
}

fn natural(prefix: u8, body: &[u8]) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + body.len());
	key.push(prefix);
	key.extend_from_slice(body);
	key
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefixes_are_distinct() {
		let device = DeviceId::from_bytes([1; 32]);
		let keys = vec![
			folder_key("f"),
			device_key(&device),
			folder_info_key("f", &device),
			file_info_key(&Uuid::nil()),
			block_key(&[0; 32]),
			pending_device_key(&device),
			ignored_device_key(&device),
			pending_folder_key("f", &device),
		];
		for (i, a) in keys.iter().enumerate() {
			for (j, b) in keys.iter().enumerate() {
				if i != j {
					assert_ne!(a, b);
				}
			}
		}
	}

	#[test]
	fn test_prefix_extraction() {
		assert_eq!(prefix_of(&folder_key("x")), Some(PREFIX_FOLDER));
		assert_eq!(prefix_of(&block_key(&[7; 32])), Some(PREFIX_BLOCK_INFO));
		assert_eq!(prefix_of(&[]), None);
	}
}

// vim: ts=4
