//! [`Statement`]: the atomic, signed unit appended to a [`crate::Sigchain`].

use sha2::{Digest, Sha256};
use sigchain_codec::{CanonicalObject, CanonicalParser};
use sigchain_key::{Kid, SigningKey, VerifyingKey};

use crate::chain::Sigchain;
use crate::error::{CodecError, SigchainError, StatementError};

/// The reserved `type` value marking a statement as a revocation.
pub const REVOKE_TYPE: &str = "revoke";

const FIELDS: &[&str] = &[".sig", "data", "kid", "prev", "revoke", "seq", "ts", "type"];

/// One signed slot in a sigchain.
///
/// Statements are immutable once constructed: every field is set at
/// [`Statement::generate`] / [`Statement::generate_revoke`] time and never
/// mutated afterwards. [`Sigchain::add`] is what decides whether a given
/// statement is acceptable; this type only knows how to build and (de)serialize
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
	seq: u32,
	kid: Kid,
	prev: Option<[u8; 32]>,
	data: Option<Vec<u8>>,
	r#type: Option<String>,
	revoke: Option<u32>,
	ts: Option<u64>,
	sig: [u8; 64],
}

impl Statement {
	pub fn seq(&self) -> u32 {
		self.seq
	}

	pub fn kid(&self) -> Kid {
		self.kid
	}

	pub fn prev(&self) -> Option<&[u8; 32]> {
		self.prev.as_ref()
	}

	pub fn data(&self) -> Option<&[u8]> {
		self.data.as_deref()
	}

	pub fn r#type(&self) -> Option<&str> {
		self.r#type.as_deref()
	}

	pub fn revoke_target(&self) -> Option<u32> {
		self.revoke
	}

	pub fn ts(&self) -> Option<u64> {
		self.ts
	}

	pub fn sig(&self) -> &[u8; 64] {
		&self.sig
	}

	pub fn is_revocation(&self) -> bool {
		self.r#type.as_deref() == Some(REVOKE_TYPE)
	}

	/// The SHA-256 digest of [`Statement::to_bytes`], used as the next
	/// statement's `prev` link.
	pub fn hash(&self) -> [u8; 32] {
		Sha256::digest(self.to_bytes()).into()
	}

	fn canonical_bytes(&self, include_sig: bool) -> Vec<u8> {
		let kid_str = self.kid.to_string();
		let obj = CanonicalObject::new()
			.bytes("data", self.data.as_deref())
			.str("kid", Some(kid_str.as_str()))
			.bytes("prev", self.prev.as_ref().map(|p| p.as_slice()))
			.uint("revoke", self.revoke.map(u64::from))
			.uint("seq", Some(u64::from(self.seq)))
			.uint("ts", self.ts)
			.str("type", self.r#type.as_deref());
		let obj = if include_sig {
			obj.bytes(".sig", Some(&self.sig))
		} else {
			obj
		};
		obj.finish()
	}

	/// Canonical bytes signed over: the object with `.sig` omitted.
	pub fn signable_bytes(&self) -> Vec<u8> {
		self.canonical_bytes(false)
	}

	/// Canonical persisted/wire bytes: the object with `.sig` present.
	pub fn to_bytes(&self) -> Vec<u8> {
		self.canonical_bytes(true)
	}

	/// Parses a single statement. Rejects unknown fields. Does **not** verify
	/// the signature — per the chaining contract, verification only happens
	/// when the statement is handed to [`Sigchain::add`].
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
		let parsed = CanonicalParser::parse(bytes)?;
		parsed.deny_unknown_fields(FIELDS)?;

		let seq = parsed
			.get_uint("seq")?
			.ok_or(CodecError::MissingField("seq"))? as u32;
		let kid_str = parsed
			.get_str("kid")?
			.ok_or(CodecError::MissingField("kid"))?;
		let kid: Kid = kid_str.parse()?;
		let prev = match parsed.get_bytes("prev")? {
			None => None,
			Some(v) => Some(
				<[u8; 32]>::try_from(v.as_slice())
					.map_err(|_| CodecError::WrongByteLength("prev", v.len(), 32))?,
			),
		};
		let data = parsed.get_bytes("data")?;
		let r#type = parsed.get_str("type")?;
		let revoke = parsed.get_uint("revoke")?.map(|v| v as u32);
		let ts = parsed.get_uint("ts")?;
		let sig_vec = parsed
			.get_bytes(".sig")?
			.ok_or(CodecError::MissingField(".sig"))?;
		let sig_len = sig_vec.len();
		let sig: [u8; 64] = sig_vec
			.try_into()
			.map_err(|_| CodecError::WrongByteLength(".sig", sig_len, 64))?;

		Ok(Self {
			seq,
			kid,
			prev,
			data,
			r#type,
			revoke,
			ts,
			sig,
		})
	}

	/// Builds, signs, and returns the next statement for `chain`.
	///
	/// Fails with [`StatementError::NoData`] when both `data` and `r#type`
	/// are absent/empty, and with [`StatementError::WrongSigner`] when
	/// `signer`'s KID does not match the chain's owner.
	pub fn generate(
		chain: &Sigchain,
		data: Option<&[u8]>,
		signer: &SigningKey,
		r#type: Option<&str>,
		ts: u64,
	) -> Result<Self, StatementError> {
		let data = data.filter(|d| !d.is_empty());
		let r#type = r#type.filter(|t| !t.is_empty());
		if data.is_none() && r#type.is_none() {
			return Err(StatementError::NoData);
		}
		if signer.kid() != chain.kid() {
			return Err(StatementError::WrongSigner);
		}

		let seq = chain.last_seq() + 1;
		let prev = chain.last().map(Statement::hash);

		let mut unsigned = Self {
			seq,
			kid: signer.kid(),
			prev,
			data: data.map(|d| d.to_vec()),
			r#type: r#type.map(|t| t.to_string()),
			revoke: None,
			ts: Some(ts),
			sig: [0u8; 64],
		};
		unsigned.sig = signer.sign(&unsigned.signable_bytes());
		Ok(unsigned)
	}

	/// Builds, signs, and returns a revocation of `revoke_seq` within `chain`.
	///
	/// Validation of `revoke_seq` (existence, not-already-a-revocation,
	/// not-already-revoked) is the caller's job — see
	/// [`Sigchain::validate_revoke_target`] — so that [`Sigchain::revoke`] can
	/// present one coherent error without this constructor needing a mutable
	/// view of the chain.
	pub fn generate_revoke(
		chain: &Sigchain,
		revoke_seq: u32,
		signer: &SigningKey,
	) -> Result<Self, SigchainError> {
		chain.validate_revoke_target(revoke_seq)?;
		if signer.kid() != chain.kid() {
			return Err(SigchainError::WrongSigner);
		}

		let seq = chain.last_seq() + 1;
		let prev = chain.last().map(Statement::hash);

		let mut unsigned = Self {
			seq,
			kid: signer.kid(),
			prev,
			data: None,
			r#type: Some(REVOKE_TYPE.to_string()),
			revoke: Some(revoke_seq),
			ts: None,
			sig: [0u8; 64],
		};
		unsigned.sig = signer.sign(&unsigned.signable_bytes());
		Ok(unsigned)
	}

	/// Verifies `sig` over [`Statement::signable_bytes`] under `key`.
	pub fn verify_signature(&self, key: &VerifyingKey) -> bool {
		key.verify(&self.signable_bytes(), &self.sig).is_ok()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use sigchain_key::SigningKey;

	fn signer() -> SigningKey {
		SigningKey::from_seed([0x01; 32])
	}

	#[test]
	fn first_statement_matches_golden_bytes() {
		let chain = Sigchain::new(signer().verifying_key());
		let st = Statement::generate(&chain, Some(&[0x01; 16]), &signer(), None, 1234567890001)
			.unwrap();
		assert_eq!(
			st.to_bytes(),
			br#"{".sig":"SPKxMlhPU7wiPGsszrQN3ljWdkTbKFWxqbTqtoFp/ZrV0jd1WsMxMltiyHc4/N0mUWga1zshztXQFkEcamvECg==","data":"AQEBAQEBAQEBAQEBAQEBAQ==","kid":"kse132yw8ht5p8cetl2jmvknewjawt9xwzdlrk2pyxlnwjyqrdq0dawquwc7vw","seq":1,"ts":1234567890001}"#
		);
	}

	#[test]
	fn empty_data_and_type_is_rejected() {
		let chain = Sigchain::new(signer().verifying_key());
		let err = Statement::generate(&chain, None, &signer(), None, 1).unwrap_err();
		assert_eq!(err, StatementError::NoData);
	}

	#[test]
	fn foreign_signer_is_rejected() {
		let chain = Sigchain::new(signer().verifying_key());
		let foreign = SigningKey::from_seed([0x99; 32]);
		let err =
			Statement::generate(&chain, Some(b"x"), &foreign, None, 1).unwrap_err();
		assert_eq!(err, StatementError::WrongSigner);
	}

	#[test]
	fn round_trip_bytes_is_exact() {
		let chain = Sigchain::new(signer().verifying_key());
		let st = Statement::generate(&chain, Some(&[0x01; 16]), &signer(), Some("test"), 1)
			.unwrap();
		let bytes = st.to_bytes();
		let reparsed = Statement::from_bytes(&bytes).unwrap();
		assert_eq!(reparsed.to_bytes(), bytes);
	}

	#[test]
	fn from_bytes_rejects_unknown_field() {
		let bytes = br#"{".sig":"AA==","kid":"kse132yw8ht5p8cetl2jmvknewjawt9xwzdlrk2pyxlnwjyqrdq0dawquwc7vw","seq":1,"bogus":1}"#;
		assert!(Statement::from_bytes(bytes).is_err());
	}
}
