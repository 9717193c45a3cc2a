//! Error types for every public operation in this crate.
//!
//! Each variant's `Display` text is, where the specification pins a literal
//! error string, byte-identical to that string — callers matching on the
//! rendered text (as the golden scenarios do) see exactly what they expect,
//! while callers that `match` on the enum get a structured cause.

use sigchain_codec::CanonicalDecodeError;
use sigchain_key::KidError;

/// Failure decoding the canonical bytes of a statement or keyring item.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
	#[error(transparent)]
	Canonical(#[from] CanonicalDecodeError),
	#[error("missing required field {0:?}")]
	MissingField(&'static str),
	#[error("field {0:?} was {actual} bytes, expected {expected}", actual = .1, expected = .2)]
	WrongByteLength(&'static str, usize, usize),
	#[error("kid was malformed: {0}")]
	Kid(#[from] KidError),
}

/// Failure constructing a [`crate::Statement`] via [`crate::Statement::generate`].
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum StatementError {
	#[error("no data")]
	NoData,
	#[error("invalid sigchain sign public key")]
	WrongSigner,
}

/// Failure appending to or revoking from a [`crate::Sigchain`].
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum SigchainError {
	#[error("no data")]
	NoData,
	#[error("invalid sigchain sign public key")]
	WrongSigner,
	#[error("sequence number {actual} did not follow {expected}", expected = .expected_prev + 1)]
	SeqMismatch { expected_prev: u32, actual: u32 },
	#[error("prev hash did not match the previous statement's canonical bytes")]
	PrevMismatch,
	#[error("statement with seq 1 must not carry a prev hash")]
	UnexpectedPrev,
	#[error("signature did not verify")]
	BadSignature,
	#[error("invalid revoke seq {0}")]
	InvalidRevokeSeq(u32),
	#[error("already revoked")]
	AlreadyRevoked,
	#[error("timestamp {ts} is earlier than the previous statement's {prev}")]
	TsNotMonotonic { prev: u64, ts: u64 },
}

/// Failure constructing or chaining a [`crate::User`] binding.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum UserError {
	#[error("unknown service {0:?}")]
	UnknownService(String),
	#[error("invalid name {name:?} for service {service:?}")]
	InvalidName { service: String, name: String },
	#[error("invalid url {0:?}")]
	InvalidUrl(String),
	#[error("seq must be at least 1")]
	InvalidSeq,
	#[error("user seq mismatch")]
	SeqMismatch,
	#[error(transparent)]
	Statement(#[from] StatementError),
	#[error(transparent)]
	Sigchain(#[from] SigchainError),
}
