//! [`Store`]: the thin byte-level interface the keyring drives.
//!
//! Multiple backends (OS keychains, filesystem vaults, in-memory mocks) may
//! implement this trait; this crate only ships [`memory::MemoryStore`] as a
//! reference implementation for its own tests.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

use crate::error::StoreError;

/// Byte-level operations, namespaced by `(service, id)`.
///
/// `get` on a missing key returns `Ok(None)`, never an error. `set`
/// overwrites unconditionally. `remove` reports whether something was
/// actually removed. `ids` is sorted ascending.
pub trait Store {
	/// Fetches the raw bytes stored at `(service, id)`, or `None` if absent.
	fn get(&self, service: &str, id: &str) -> Result<Option<Vec<u8>>, StoreError>;

	/// Stores `bytes` at `(service, id)`, overwriting any prior value.
	/// `item_type` is a backend bookkeeping tag (e.g. for an OS keychain
	/// that wants to label entries), distinct from a keyring [`crate::Item`]'s
	/// own `type` field.
	fn set(
		&self,
		service: &str,
		id: &str,
		bytes: &[u8],
		item_type: &str,
	) -> Result<(), StoreError>;

	/// Removes `(service, id)`, returning whether anything was removed.
	fn remove(&self, service: &str, id: &str) -> Result<bool, StoreError>;

	/// Lists ids under `service` starting with `prefix`, ascending.
	/// `show_hidden`/`show_reserved` control whether ids under the hidden
	/// (`.`) and reserved (`#`) prefixes are included.
	fn ids(
		&self,
		service: &str,
		prefix: &str,
		show_hidden: bool,
		show_reserved: bool,
	) -> Result<Vec<String>, StoreError>;

	/// Reports whether `(service, id)` exists.
	fn exists(&self, service: &str, id: &str) -> Result<bool, StoreError>;
}
