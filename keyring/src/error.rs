//! Error types for the keyring and its store interface.

/// Opaque wrapper around a backend-supplied error. The keyring never
/// inspects a store failure's cause, only propagates it.
#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(#[from] Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
	pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self(Box::new(err))
	}
}

/// Failure from any public [`crate::Keyring`] operation.
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
	/// The keyring must be unlocked before this operation is permitted.
	#[error("keyring is locked")]
	Locked,
	#[error("invalid auth")]
	InvalidAuth,
	#[error("no id")]
	EmptyId,
	#[error("keyring id prefix reserved {0}")]
	ReservedId(String),
	#[error("not an encoded keyring item")]
	NotAnItem,
	#[error("aead operation failed")]
	Aead,
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl PartialEq for KeyringError {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Locked, Self::Locked)
			| (Self::InvalidAuth, Self::InvalidAuth)
			| (Self::EmptyId, Self::EmptyId)
			| (Self::NotAnItem, Self::NotAnItem)
			| (Self::Aead, Self::Aead) => true,
			(Self::ReservedId(a), Self::ReservedId(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for KeyringError {}
