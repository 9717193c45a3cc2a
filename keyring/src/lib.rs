//! A store-backed, authenticated encrypted container for typed secret
//! items, namespaced by a service name.
//!
//! [`Keyring`] turns an untrusted byte-level [`Store`] into an
//! authenticated, encrypted-at-rest item store with a well-defined
//! unlock/lock lifecycle and reserved/hidden namespace discipline. The
//! unlock key never leaves process memory, and the keyring verifies a
//! caller's passphrase-derived key against a self-sealed `#auth` item
//! rather than a separate password hash, so the AEAD tag check doubles as
//! the auth check.

mod error;
mod item;
pub mod store;

use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroize;

pub use error::{KeyringError, StoreError};
pub use item::{is_item, Item, MAGIC};
pub use store::Store;

/// Reserved item-id prefix: internal items (`#auth`, `#salt`). Public
/// [`Keyring::get`]/[`Keyring::set`] reject ids with this prefix.
pub const RESERVED_PREFIX: &str = "#";
/// Hidden item-id prefix: excluded from [`Keyring::list`]/[`Keyring::ids`]
/// by default.
pub const HIDDEN_PREFIX: &str = ".";

const AUTH_ID: &str = "#auth";
const SALT_ID: &str = "#salt";
const AUTH_ITEM_TYPE: &str = "auth";
const SALT_ITEM_TYPE: &str = "salt";
const SEALED_ITEM_TYPE: &str = "item";

fn is_reserved(id: &str) -> bool {
	id.starts_with(RESERVED_PREFIX)
}

/// The symmetric key derived from caller-supplied auth (typically a
/// passphrase run through a KDF the caller owns). Zeroized on drop.
pub struct UnlockKey([u8; 32]);

impl UnlockKey {
	pub fn new(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}
}

impl Drop for UnlockKey {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

/// Optional filter for [`Keyring::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
	pub r#type: Option<String>,
}

/// A per-service, authenticated encrypted container for typed items.
///
/// Locked means [`Keyring::unlock`] has not yet succeeded (or
/// [`Keyring::lock`] was called since); unlock-requiring operations return
/// [`KeyringError::Locked`] while locked.
pub struct Keyring<S> {
	store: S,
	service: String,
	unlock_key: Option<UnlockKey>,
}

impl<S: Store> Keyring<S> {
	pub fn new(store: S, service: impl Into<String>) -> Self {
		Self {
			store,
			service: service.into(),
			unlock_key: None,
		}
	}

	fn require_unlock(&self) -> Result<&UnlockKey, KeyringError> {
		self.unlock_key.as_ref().ok_or(KeyringError::Locked)
	}

	/// Fetches and decrypts the item at `id`. Requires unlock; rejects
	/// reserved ids.
	pub fn get(&self, id: &str) -> Result<Option<Item>, KeyringError> {
		let key = self.require_unlock()?;
		if is_reserved(id) {
			return Err(KeyringError::ReservedId(id.to_string()));
		}
		match self.store.get(&self.service, id)? {
			None => Ok(None),
			Some(bytes) => Item::open(&bytes, key.as_bytes()).map(Some),
		}
	}

	/// Seals and stores `item`. Requires unlock; rejects an empty id and
	/// reserved ids.
	pub fn set(&self, item: &Item) -> Result<(), KeyringError> {
		let key = self.require_unlock()?;
		if item.id.is_empty() {
			return Err(KeyringError::EmptyId);
		}
		if is_reserved(&item.id) {
			return Err(KeyringError::ReservedId(item.id.clone()));
		}
		let sealed = item.seal(key.as_bytes());
		self.store
			.set(&self.service, &item.id, &sealed, SEALED_ITEM_TYPE)?;
		debug!(service = %self.service, id = %item.id, "set keyring item");
		Ok(())
	}

	/// Removes `id`. Does not require unlock; works on any id, including
	/// reserved ones.
	pub fn delete(&self, id: &str) -> Result<bool, KeyringError> {
		Ok(self.store.remove(&self.service, id)?)
	}

	/// Lists items, excluding reserved and hidden ids by default, sorted
	/// by id ascending, optionally filtered to one `r#type`. Requires
	/// unlock (listing decrypts each item to read its `type`).
	pub fn list(&self, opts: &ListOptions) -> Result<Vec<Item>, KeyringError> {
		let key = self.require_unlock()?;
		let ids = self.store.ids(&self.service, "", false, false)?;
		let mut items = Vec::with_capacity(ids.len());
		for id in ids {
			let Some(bytes) = self.store.get(&self.service, &id)? else {
				continue;
			};
			let item = Item::open(&bytes, key.as_bytes())?;
			if opts
				.r#type
				.as_deref()
				.is_none_or(|t| t == item.r#type)
			{
				items.push(item);
			}
		}
		items.sort_by(|a, b| a.id.cmp(&b.id));
		Ok(items)
	}

	/// Lists raw ids under `prefix`, excluding reserved and hidden ids.
	/// Does not require unlock.
	pub fn ids(&self, prefix: &str) -> Result<Vec<String>, KeyringError> {
		Ok(self.store.ids(&self.service, prefix, false, false)?)
	}

	/// Reports whether `id` exists. Does not require unlock.
	pub fn exists(&self, id: &str) -> Result<bool, KeyringError> {
		Ok(self.store.exists(&self.service, id)?)
	}

	/// Reports whether this service has ever been unlocked (a `#auth`
	/// item exists). Does not require unlock.
	pub fn authed(&self) -> Result<bool, KeyringError> {
		Ok(self.store.exists(&self.service, AUTH_ID)?)
	}

	/// Returns the persisted salt, generating and persisting 32 fresh
	/// random bytes on first call. The salt is non-secret (stored
	/// plaintext) and is meant to drive the caller's own passphrase KDF.
	/// Does not require unlock.
	pub fn salt(&self) -> Result<[u8; 32], KeyringError> {
		if let Some(bytes) = self.store.get(&self.service, SALT_ID)? {
			let len = bytes.len();
			return <[u8; 32]>::try_from(bytes)
				.map_err(|_| KeyringError::Store(StoreError::new(BadSaltLength(len))));
		}
		let mut salt = [0u8; 32];
		rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
		self.store
			.set(&self.service, SALT_ID, &salt, SALT_ITEM_TYPE)?;
		Ok(salt)
	}

	/// Unlock protocol: on first use for this service, seals `key` itself
	/// as the `#auth` item and accepts it. On subsequent calls, decrypts
	/// the persisted `#auth` item and compares it to `key` in constant
	/// time, rejecting with [`KeyringError::InvalidAuth`] on mismatch and
	/// leaving any prior unlock state untouched.
	pub fn unlock(&mut self, key: UnlockKey) -> Result<(), KeyringError> {
		match self.store.get(&self.service, AUTH_ID)? {
			None => {
				let auth_item = Item::new(AUTH_ID, AUTH_ITEM_TYPE, key.as_bytes().to_vec());
				let sealed = auth_item.seal(key.as_bytes());
				self.store.set(&self.service, AUTH_ID, &sealed, AUTH_ITEM_TYPE)?;
				debug!(service = %self.service, "unlocked (first use, persisted #auth)");
				self.unlock_key = Some(key);
				Ok(())
			}
			Some(bytes) => {
				let decrypted = match Item::open(&bytes, key.as_bytes()) {
					Ok(item) => item,
					Err(_) => {
						warn!(service = %self.service, "unlock rejected: auth did not decrypt");
						return Err(KeyringError::InvalidAuth);
					}
				};
				if decrypted.data.ct_eq(key.as_bytes().as_slice()).unwrap_u8() != 1 {
					warn!(service = %self.service, "unlock rejected: auth mismatch");
					return Err(KeyringError::InvalidAuth);
				}
				debug!(service = %self.service, "unlocked");
				self.unlock_key = Some(key);
				Ok(())
			}
		}
	}

	/// Clears the in-memory unlock key.
	pub fn lock(&mut self) {
		if self.unlock_key.take().is_some() {
			debug!(service = %self.service, "locked");
		}
	}

	/// Removes every item under this service, including reserved and
	/// hidden ones, then locks. Does not require unlock.
	pub fn reset(&mut self) -> Result<(), KeyringError> {
		let ids = self.store.ids(&self.service, "", true, true)?;
		for id in ids {
			self.store.remove(&self.service, &id)?;
		}
		self.lock();
		debug!(service = %self.service, "reset");
		Ok(())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("persisted salt was {0} bytes, expected 32")]
struct BadSaltLength(usize);

#[cfg(test)]
mod test {
	use super::*;
	use store::memory::MemoryStore;

	fn keyring() -> Keyring<MemoryStore> {
		Keyring::new(MemoryStore::new(), "svc")
	}

	#[test]
	fn unlock_round_trip_and_wrong_passphrase() {
		let mut kr = keyring();
		assert!(!kr.authed().unwrap());
		kr.unlock(UnlockKey::new([0x01; 32])).unwrap();
		assert!(kr.authed().unwrap());

		let mut kr2 = Keyring::new(kr.store, "svc");
		kr2.unlock(UnlockKey::new([0x01; 32])).unwrap();
		assert_eq!(
			kr2.unlock(UnlockKey::new([0x02; 32])).unwrap_err(),
			KeyringError::InvalidAuth
		);
	}

	#[test]
	fn set_get_and_reserved_rejection() {
		let mut kr = keyring();
		kr.unlock(UnlockKey::new([0x01; 32])).unwrap();

		let item = Item::new("x", "secret", b"hunter2".to_vec());
		kr.set(&item).unwrap();
		let got = kr.get("x").unwrap().unwrap();
		assert_eq!(got.data, b"hunter2");

		let reserved = Item::new("#foo", "secret", vec![]);
		assert_eq!(
			kr.set(&reserved).unwrap_err(),
			KeyringError::ReservedId("#foo".to_string())
		);
		assert_eq!(
			kr.get("#auth").unwrap_err(),
			KeyringError::ReservedId("#auth".to_string())
		);
	}

	#[test]
	fn locked_operations_reject() {
		let kr = keyring();
		let item = Item::new("x", "secret", vec![]);
		assert_eq!(kr.set(&item).unwrap_err(), KeyringError::Locked);
		assert_eq!(kr.get("x").unwrap_err(), KeyringError::Locked);
		assert_eq!(kr.list(&ListOptions::default()).unwrap_err(), KeyringError::Locked);
	}

	#[test]
	fn list_excludes_reserved_and_hidden_and_supports_type_filter() {
		let mut kr = keyring();
		kr.unlock(UnlockKey::new([0x01; 32])).unwrap();
		kr.set(&Item::new("a", "note", vec![])).unwrap();
		kr.set(&Item::new("b", "secret", vec![])).unwrap();
		kr.set(&Item::new(".hidden", "secret", vec![])).unwrap();

		let all = kr.list(&ListOptions::default()).unwrap();
		assert_eq!(all.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
		assert!(!kr.ids("").unwrap().contains(&"#auth".to_string()));

		let secrets = kr
			.list(&ListOptions {
				r#type: Some("secret".to_string()),
			})
			.unwrap();
		assert_eq!(secrets.len(), 1);
		assert_eq!(secrets[0].id, "b");
	}

	#[test]
	fn reset_removes_everything_and_locks() {
		let mut kr = keyring();
		kr.unlock(UnlockKey::new([0x01; 32])).unwrap();
		kr.set(&Item::new("a", "note", vec![])).unwrap();
		kr.reset().unwrap();

		assert!(!kr.authed().unwrap());
		assert!(kr.ids("").unwrap().is_empty());
		assert_eq!(kr.set(&Item::new("a", "note", vec![])).unwrap_err(), KeyringError::Locked);
	}

	#[test]
	fn salt_is_generated_once_and_then_stable() {
		let kr = keyring();
		let first = kr.salt().unwrap();
		let second = kr.salt().unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn delete_does_not_require_unlock_and_allows_reserved_ids() {
		let mut kr = keyring();
		kr.unlock(UnlockKey::new([0x01; 32])).unwrap();
		kr.lock();
		assert!(kr.delete("#auth").unwrap());
		assert!(!kr.authed().unwrap());
	}
}
