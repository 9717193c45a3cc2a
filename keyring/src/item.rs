//! [`Item`]: a typed secret and its self-describing sealed persisted form.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sigchain_codec::{CanonicalObject, CanonicalParser};

use crate::error::KeyringError;

/// Fixed 4-byte magic prefixing every sealed item, distinguishing it from
/// foreign bytes a store might also hold.
pub const MAGIC: &[u8; 4] = b"\x01kr\x01";
const NONCE_LEN: usize = 24;

const FIELDS: &[&str] = &["created", "data", "id", "modified", "type"];

/// A typed secret held in a [`crate::Keyring`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
	pub id: String,
	pub r#type: String,
	pub data: Vec<u8>,
	pub created: Option<u64>,
	pub modified: Option<u64>,
}

impl Item {
	pub fn new(id: impl Into<String>, r#type: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			id: id.into(),
			r#type: r#type.into(),
			data,
			created: None,
			modified: None,
		}
	}

	fn to_canonical_bytes(&self) -> Vec<u8> {
		CanonicalObject::new()
			.uint("created", self.created)
			.bytes("data", Some(&self.data))
			.str("id", Some(&self.id))
			.uint("modified", self.modified)
			.str("type", Some(&self.r#type))
			.finish()
	}

	fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, KeyringError> {
		let parsed =
			CanonicalParser::parse(bytes).map_err(|_| KeyringError::NotAnItem)?;
		parsed
			.deny_unknown_fields(FIELDS)
			.map_err(|_| KeyringError::NotAnItem)?;
		let id = parsed
			.get_str("id")
			.map_err(|_| KeyringError::NotAnItem)?
			.ok_or(KeyringError::NotAnItem)?;
		let r#type = parsed
			.get_str("type")
			.map_err(|_| KeyringError::NotAnItem)?
			.unwrap_or_default();
		let data = parsed
			.get_bytes("data")
			.map_err(|_| KeyringError::NotAnItem)?
			.unwrap_or_default();
		let created = parsed.get_uint("created").map_err(|_| KeyringError::NotAnItem)?;
		let modified =
			parsed.get_uint("modified").map_err(|_| KeyringError::NotAnItem)?;
		Ok(Self {
			id,
			r#type,
			data,
			created,
			modified,
		})
	}

	/// Seals `self` under `key`: `MAGIC || nonce || ciphertext`. The nonce
	/// is fresh random bytes on every call, so sealing the same item twice
	/// never produces the same bytes.
	pub fn seal(&self, key: &[u8; 32]) -> Vec<u8> {
		let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
		let mut nonce_bytes = [0u8; NONCE_LEN];
		rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
		let nonce = XNonce::from_slice(&nonce_bytes);
		let plaintext = self.to_canonical_bytes();
		let ciphertext = cipher
			.encrypt(nonce, plaintext.as_slice())
			.expect("encryption with a fixed-size key/nonce cannot fail");

		let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
		out.extend_from_slice(MAGIC);
		out.extend_from_slice(&nonce_bytes);
		out.extend_from_slice(&ciphertext);
		out
	}

	/// Reverses [`Item::seal`]. Fails with [`KeyringError::NotAnItem`] when
	/// `bytes` doesn't start with [`MAGIC`], or [`KeyringError::Aead`] when
	/// the ciphertext doesn't authenticate under `key`.
	pub fn open(bytes: &[u8], key: &[u8; 32]) -> Result<Self, KeyringError> {
		if !is_item(bytes) {
			return Err(KeyringError::NotAnItem);
		}
		let rest = &bytes[MAGIC.len()..];
		if rest.len() < NONCE_LEN {
			return Err(KeyringError::NotAnItem);
		}
		let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
		let nonce = XNonce::from_slice(nonce_bytes);
		let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
		let plaintext = cipher
			.decrypt(nonce, ciphertext)
			.map_err(|_| KeyringError::Aead)?;
		Self::from_canonical_bytes(&plaintext)
	}
}

/// Reports whether `bytes` begins with the sealed-item magic prefix.
pub fn is_item(bytes: &[u8]) -> bool {
	bytes.starts_with(MAGIC)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn seal_then_open_round_trips() {
		let key = [0x09u8; 32];
		let item = Item::new("x", "secret", b"hunter2".to_vec());
		let sealed = item.seal(&key);
		assert!(is_item(&sealed));
		let opened = Item::open(&sealed, &key).unwrap();
		assert_eq!(opened, item);
	}

	#[test]
	fn open_rejects_wrong_key() {
		let item = Item::new("x", "secret", b"hunter2".to_vec());
		let sealed = item.seal(&[0x01u8; 32]);
		assert_eq!(Item::open(&sealed, &[0x02u8; 32]).unwrap_err(), KeyringError::Aead);
	}

	#[test]
	fn open_rejects_missing_magic() {
		assert_eq!(
			Item::open(b"not an item", &[0x01u8; 32]).unwrap_err(),
			KeyringError::NotAnItem
		);
	}

	#[test]
	fn two_seals_of_the_same_item_differ() {
		let key = [0x01u8; 32];
		let item = Item::new("x", "secret", b"hunter2".to_vec());
		assert_ne!(item.seal(&key), item.seal(&key));
	}
}
