//! An in-memory [`Store`] for tests and demos. Never a production backend —
//! see the crate's top-level docs for where a real one (OS keychain,
//! filesystem vault) plugs in instead.

use std::collections::HashMap;
use std::sync::Mutex;

use super::Store;
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
	entries: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

fn is_hidden(id: &str) -> bool {
	id.starts_with('.')
}

fn is_reserved(id: &str) -> bool {
	id.starts_with('#')
}

impl Store for MemoryStore {
	fn get(&self, service: &str, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
		let entries = self.entries.lock().expect("memory store mutex poisoned");
		Ok(entries
			.get(&(service.to_string(), id.to_string()))
			.map(|(bytes, _)| bytes.clone()))
	}

	fn set(
		&self,
		service: &str,
		id: &str,
		bytes: &[u8],
		item_type: &str,
	) -> Result<(), StoreError> {
		let mut entries = self.entries.lock().expect("memory store mutex poisoned");
		entries.insert(
			(service.to_string(), id.to_string()),
			(bytes.to_vec(), item_type.to_string()),
		);
		Ok(())
	}

	fn remove(&self, service: &str, id: &str) -> Result<bool, StoreError> {
		let mut entries = self.entries.lock().expect("memory store mutex poisoned");
		Ok(entries.remove(&(service.to_string(), id.to_string())).is_some())
	}

	fn ids(
		&self,
		service: &str,
		prefix: &str,
		show_hidden: bool,
		show_reserved: bool,
	) -> Result<Vec<String>, StoreError> {
		let entries = self.entries.lock().expect("memory store mutex poisoned");
		let mut ids: Vec<String> = entries
			.keys()
			.filter(|(svc, id)| svc == service && id.starts_with(prefix))
			.filter(|(_, id)| show_hidden || !is_hidden(id))
			.filter(|(_, id)| show_reserved || !is_reserved(id))
			.map(|(_, id)| id.clone())
			.collect();
		ids.sort();
		Ok(ids)
	}

	fn exists(&self, service: &str, id: &str) -> Result<bool, StoreError> {
		let entries = self.entries.lock().expect("memory store mutex poisoned");
		Ok(entries.contains_key(&(service.to_string(), id.to_string())))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn set_then_get_round_trips() {
		let store = MemoryStore::new();
		store.set("svc", "x", b"hello", "secret").unwrap();
		assert_eq!(store.get("svc", "x").unwrap(), Some(b"hello".to_vec()));
	}

	#[test]
	fn get_missing_is_none_not_error() {
		let store = MemoryStore::new();
		assert_eq!(store.get("svc", "missing").unwrap(), None);
	}

	#[test]
	fn ids_filters_hidden_and_reserved_by_default() {
		let store = MemoryStore::new();
		store.set("svc", "a", b"1", "t").unwrap();
		store.set("svc", ".hidden", b"2", "t").unwrap();
		store.set("svc", "#reserved", b"3", "t").unwrap();
		assert_eq!(store.ids("svc", "", false, false).unwrap(), vec!["a"]);
		assert_eq!(
			store.ids("svc", "", true, true).unwrap(),
			vec!["#reserved", ".hidden", "a"]
		);
	}

	#[test]
	fn remove_reports_whether_anything_was_removed() {
		let store = MemoryStore::new();
		store.set("svc", "x", b"1", "t").unwrap();
		assert!(store.remove("svc", "x").unwrap());
		assert!(!store.remove("svc", "x").unwrap());
	}

	#[test]
	fn namespaces_are_isolated_by_service() {
		let store = MemoryStore::new();
		store.set("svc-a", "x", b"1", "t").unwrap();
		assert_eq!(store.get("svc-b", "x").unwrap(), None);
	}
}
