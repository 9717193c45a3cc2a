//! [`Sigchain`]: an append-only, signature-linked sequence of statements
//! owned by one signing key.

use std::collections::HashSet;

use sigchain_key::{Kid, VerifyingKey};
use tracing::{debug, warn};

use crate::error::SigchainError;
use crate::statement::Statement;
use crate::user::User;

/// An append-only, in-memory sequence of statements for a single signing
/// key.
///
/// `Sigchain` enforces link, signature, ordering, and revocation invariants
/// on every [`Sigchain::add`]. There is no way to remove or mutate a
/// statement once accepted; the only thing that changes about a past slot is
/// whether it has since been marked revoked.
pub struct Sigchain {
	owner: VerifyingKey,
	statements: Vec<Statement>,
	revoked: HashSet<u32>,
	last_ts: Option<u64>,
}

impl Sigchain {
	/// Starts a new, empty chain owned by `owner`.
	pub fn new(owner: VerifyingKey) -> Self {
		Self {
			owner,
			statements: Vec::new(),
			revoked: HashSet::new(),
			last_ts: None,
		}
	}

	pub fn kid(&self) -> Kid {
		self.owner.kid()
	}

	pub fn owner(&self) -> &VerifyingKey {
		&self.owner
	}

	/// Number of statements currently in the chain.
	pub fn len(&self) -> usize {
		self.statements.len()
	}

	pub fn is_empty(&self) -> bool {
		self.statements.is_empty()
	}

	/// Seq of the last statement, or 0 when empty.
	pub fn last_seq(&self) -> u32 {
		self.statements.last().map_or(0, Statement::seq)
	}

	pub fn last(&self) -> Option<&Statement> {
		self.statements.last()
	}

	/// Validates that `seq` is an acceptable revocation target, without
	/// mutating anything. Shared by [`Statement::generate_revoke`] and
	/// [`Sigchain::add`] so both paths reject the same inputs the same way.
	pub fn validate_revoke_target(&self, seq: u32) -> Result<(), SigchainError> {
		if seq == 0 || seq >= self.last_seq() + 1 {
			return Err(SigchainError::InvalidRevokeSeq(seq));
		}
		let target = &self.statements[(seq - 1) as usize];
		if target.is_revocation() {
			return Err(SigchainError::InvalidRevokeSeq(seq));
		}
		if self.revoked.contains(&seq) {
			return Err(SigchainError::AlreadyRevoked);
		}
		Ok(())
	}

	/// Accepts `st` iff it passes every invariant check; otherwise rejects
	/// with a specific error and leaves the chain's state completely
	/// unchanged.
	pub fn add(&mut self, st: Statement) -> Result<(), SigchainError> {
		if st.kid() != self.kid() {
			warn!(seq = st.seq(), "rejecting statement: kid does not match chain owner");
			return Err(SigchainError::WrongSigner);
		}

		let expected_seq = self.last_seq() + 1;
		if st.seq() != expected_seq {
			return Err(SigchainError::SeqMismatch {
				expected_prev: self.last_seq(),
				actual: st.seq(),
			});
		}

		match (st.seq() > 1, st.prev()) {
			(true, Some(prev)) => {
				let expected = self.last().expect("seq > 1 implies a last statement").hash();
				if *prev != expected {
					return Err(SigchainError::PrevMismatch);
				}
			}
			(true, None) => return Err(SigchainError::PrevMismatch),
			(false, Some(_)) => return Err(SigchainError::UnexpectedPrev),
			(false, None) => {}
		}

		if !st.verify_signature(&self.owner) {
			warn!(seq = st.seq(), "rejecting statement: signature did not verify");
			return Err(SigchainError::BadSignature);
		}

		if st.is_revocation() {
			self.validate_revoke_target(st.revoke_target().unwrap_or(0))?;
		} else if st.data().is_none() && st.r#type().is_none() {
			return Err(SigchainError::NoData);
		}

		if let (Some(prev), Some(ts)) = (self.last_ts, st.ts()) {
			if ts < prev {
				return Err(SigchainError::TsNotMonotonic { prev, ts });
			}
		}

		// Every check above passed; commit. No partial mutation happens
		// before this point.
		let seq = st.seq();
		if let Some(target) = st.revoke_target() {
			self.revoked.insert(target);
		}
		if let Some(ts) = st.ts() {
			self.last_ts = Some(ts);
		}
		self.statements.push(st);
		debug!(seq, kid = %self.kid(), "appended statement");
		Ok(())
	}

	/// Generates and appends a revocation of `seq` in one step.
	pub fn revoke(
		&mut self,
		seq: u32,
		signer: &sigchain_key::SigningKey,
	) -> Result<Statement, SigchainError> {
		let st = Statement::generate_revoke(self, seq, signer)?;
		self.add(st.clone())?;
		Ok(st)
	}

	pub fn is_revoked(&self, seq: u32) -> bool {
		self.revoked.contains(&seq)
	}

	/// The highest-seq, non-revoked, non-revocation statement matching
	/// `r#type`. `r#type == None` matches untyped statements only.
	pub fn find_last(&self, r#type: Option<&str>) -> Option<&Statement> {
		self.statements
			.iter()
			.rev()
			.find(|st| !st.is_revocation() && !self.is_revoked(st.seq()) && st.r#type() == r#type)
	}

	/// All non-revoked statements of `r#type`, ascending by seq. `r#type ==
	/// None` selects untyped statements only.
	pub fn find_all(&self, r#type: Option<&str>) -> Vec<&Statement> {
		self.statements
			.iter()
			.filter(|st| !self.is_revoked(st.seq()) && st.r#type() == r#type)
			.collect()
	}

	/// The full ordered list, including revocations and revoked statements.
	pub fn statements(&self) -> &[Statement] {
		&self.statements
	}

	/// The latest non-revoked user binding, if any. The sigchain tail is
	/// authoritative: a later binding always supersedes an earlier one, and
	/// a binding that was itself revoked stops counting immediately.
	pub fn user(&self) -> Option<User> {
		self.statements
			.iter()
			.rev()
			.find(|st| {
				!st.is_revocation()
					&& !self.is_revoked(st.seq())
					&& st.r#type() == Some(User::STATEMENT_TYPE)
			})
			.and_then(|st| User::from_statement_data(st.data()?).ok())
	}

	/// A stable, human-readable dump of every statement, for snapshot
	/// testing. Each block is a `/sigchain/<kid>/<seq>` header line followed
	/// by the canonical JSON object pretty-printed with two-space indent,
	/// terminated by a blank line.
	pub fn spew(&self) -> String {
		let mut out = String::new();
		for st in &self.statements {
			out.push_str(&format!("/sigchain/{}/{}\n", self.kid(), st.seq()));
			out.push_str(&pretty_print(&st.to_bytes()));
			out.push('\n');
			out.push('\n');
		}
		out
	}
}

/// Re-indents the flat canonical bytes with two-space indentation, one
/// `"key":value` pair per line. This is purely cosmetic (the signed/wire
/// form stays compact); it exists only to make [`Sigchain::spew`] readable.
fn pretty_print(compact: &[u8]) -> String {
	let s = std::str::from_utf8(compact).expect("canonical bytes are valid utf-8");
	let mut out = String::new();
	let mut indent = 0usize;
	let mut in_string = false;
	let mut chars = s.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'"' if !in_string => {
				in_string = true;
				out.push(c);
			}
			'"' => {
				in_string = false;
				out.push(c);
			}
			'\\' if in_string => {
				out.push(c);
				if let Some(escaped) = chars.next() {
					out.push(escaped);
				}
			}
			'{' if !in_string => {
				indent += 1;
				out.push(c);
				if chars.peek() != Some(&'}') {
					out.push('\n');
					out.push_str(&"  ".repeat(indent));
				}
			}
			'}' if !in_string => {
				indent = indent.saturating_sub(1);
				out.push(c);
			}
			',' if !in_string => {
				out.push(c);
				out.push('\n');
				out.push_str(&"  ".repeat(indent));
			}
			':' if !in_string => {
				out.push(c);
				out.push(' ');
			}
			c => out.push(c),
		}
	}
	out
}
