//! Ed25519 signing keys for sigchains, plus their stable textual identifier
//! (the "KID").
//!
//! A KID is a bech32 encoding of a 32-byte Ed25519 public key, human-readable
//! part `kse` ("key, sigchain, ed25519"). Equality of KIDs implies equality
//! of public keys: decode/encode is the identity, so a KID can stand in for
//! the public key anywhere a chain owner needs to be named.

use core::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use ed25519_dalek::{Signature, Signer, SigningKey as DalekSigningKey, Verifier};
use zeroize::Zeroize;

/// Human-readable part of every KID minted by this crate.
pub const KID_HRP: &str = "kse";

/// Errors minting or parsing a [`Kid`].
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum KidError {
	#[error("not valid bech32: {0}")]
	Bech32(String),
	#[error("kid had human-readable part {found:?}, expected {KID_HRP:?}")]
	WrongHrp { found: String },
	#[error("kid payload was {len} bytes, expected 32")]
	WrongLength { len: usize },
}

/// A stable, bech32-encoded textual identifier for an Ed25519 public key.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Kid([u8; 32]);

impl Kid {
	pub fn from_public_key_bytes(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	pub fn matches_public_key(&self, key: &ed25519_dalek::VerifyingKey) -> bool {
		self.0 == *key.as_bytes()
	}
}

impl fmt::Debug for Kid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Kid({self})")
	}
}

impl fmt::Display for Kid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let hrp = Hrp::parse(KID_HRP).expect("KID_HRP is a valid hrp");
		let encoded =
			bech32::encode::<Bech32>(hrp, &self.0).expect("32 bytes always encodes");
		f.write_str(&encoded)
	}
}

impl FromStr for Kid {
	type Err = KidError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (hrp, data) =
			bech32::decode(s).map_err(|e| KidError::Bech32(e.to_string()))?;
		if hrp.as_str() != KID_HRP {
			return Err(KidError::WrongHrp {
				found: hrp.to_string(),
			});
		}
		let len = data.len();
		let bytes: [u8; 32] = data
			.try_into()
			.map_err(|_| KidError::WrongLength { len })?;
		Ok(Self(bytes))
	}
}

#[cfg(feature = "serde")]
mod serde_impls {
	use super::*;
	use serde::{Deserialize, Serialize};

	impl Serialize for Kid {
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: serde::Serializer,
		{
			serializer.serialize_str(&self.to_string())
		}
	}

	impl<'de> Deserialize<'de> for Kid {
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: serde::Deserializer<'de>,
		{
			let s = String::deserialize(deserializer)?;
			s.parse().map_err(serde::de::Error::custom)
		}
	}
}

/// Errors constructing or using a [`SigningKey`].
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum KeyError {
	#[error("signature did not verify")]
	InvalidSignature,
}

/// An Ed25519 signer/verifier pair with a stable [`Kid`].
///
/// Seeds are taken directly as the Ed25519 private scalar input, with no KDF
/// stretching — stretching a human passphrase or recovery phrase into a seed
/// is the caller's concern (see e.g. BIP39/SLIP-10 derivation elsewhere in
/// the ecosystem), not this crate's.
pub struct SigningKey(DalekSigningKey);

impl SigningKey {
	/// Deterministically derives a key pair from a 32-byte seed.
	pub fn from_seed(seed: [u8; 32]) -> Self {
		Self(DalekSigningKey::from_bytes(&seed))
	}

	/// Generates a fresh random key pair.
	pub fn generate<R: rand_core::CryptoRngCore>(rng: &mut R) -> Self {
		Self(DalekSigningKey::generate(rng))
	}

	pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
		self.0.sign(msg).to_bytes()
	}

	pub fn verifying_key(&self) -> VerifyingKey {
		VerifyingKey(self.0.verifying_key())
	}

	pub fn kid(&self) -> Kid {
		self.verifying_key().kid()
	}
}

impl Drop for SigningKey {
	fn drop(&mut self) {
		// ed25519_dalek::SigningKey already zeroizes its internal bytes on
		// drop, but being explicit here means this invariant doesn't
		// silently regress if the wrapped type ever changes.
		let mut scratch = self.0.to_bytes();
		scratch.zeroize();
	}
}

/// An Ed25519 public key, wrapped so callers of this crate never need to
/// depend on `ed25519-dalek` types directly.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl VerifyingKey {
	pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
		ed25519_dalek::VerifyingKey::from_bytes(&bytes)
			.map(Self)
			.map_err(|_| KeyError::InvalidSignature)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		self.0.as_bytes()
	}

	pub fn kid(&self) -> Kid {
		Kid::from_public_key_bytes(*self.0.as_bytes())
	}

	pub fn verify(&self, msg: &[u8], sig: &[u8; 64]) -> Result<(), KeyError> {
		let sig = Signature::from_bytes(sig);
		self.0
			.verify(msg, &sig)
			.map_err(|_| KeyError::InvalidSignature)
	}
}

impl fmt::Debug for VerifyingKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "VerifyingKey({})", self.kid())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn known_seed_produces_known_kid() {
		let seed = hex!("0101010101010101010101010101010101010101010101010101010101010101");
		let key = SigningKey::from_seed(seed);
		assert_eq!(
			key.kid().to_string(),
			"kse132yw8ht5p8cetl2jmvknewjawt9xwzdlrk2pyxlnwjyqrdq0dawquwc7vw"
		);
	}

	#[test]
	fn kid_round_trips_through_display_and_from_str() {
		let key = SigningKey::from_seed([0x42; 32]);
		let kid = key.kid();
		let reparsed: Kid = kid.to_string().parse().unwrap();
		assert_eq!(kid, reparsed);
	}

	#[test]
	fn generated_key_signs_and_verifies() {
		let mut rng = rand_core::OsRng;
		let key = SigningKey::generate(&mut rng);
		let msg = b"hello sigchain";
		let sig = key.sign(msg);
		assert!(key.verifying_key().verify(msg, &sig).is_ok());
	}

	#[test]
	fn sign_and_verify_round_trip() {
		let key = SigningKey::from_seed([0x07; 32]);
		let msg = b"hello sigchain";
		let sig = key.sign(msg);
		assert!(key.verifying_key().verify(msg, &sig).is_ok());
	}

	#[test]
	fn verify_rejects_tampered_message() {
		let key = SigningKey::from_seed([0x07; 32]);
		let sig = key.sign(b"hello sigchain");
		assert!(key.verifying_key().verify(b"hello sigchaim", &sig).is_err());
	}

	#[test]
	fn kid_rejects_wrong_hrp() {
		let hrp = Hrp::parse("xyz").unwrap();
		let encoded = bech32::encode::<Bech32>(hrp, &[0u8; 32]).unwrap();
		assert_eq!(
			encoded.parse::<Kid>(),
			Err(KidError::WrongHrp {
				found: "xyz".to_string()
			})
		);
	}

	#[test]
	fn kid_rejects_wrong_length() {
		let hrp = Hrp::parse(KID_HRP).unwrap();
		let encoded = bech32::encode::<Bech32>(hrp, &[0u8; 16]).unwrap();
		assert_eq!(
			encoded.parse::<Kid>(),
			Err(KidError::WrongLength { len: 16 })
		);
	}
}
