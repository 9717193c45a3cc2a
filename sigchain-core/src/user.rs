//! [`User`]: a statement sub-shape binding a sigchain identity to a
//! third-party profile ("github", "twitter", ...).

use sigchain_codec::{CanonicalObject, CanonicalParser};
use sigchain_key::SigningKey;
use url::Url;

use crate::chain::Sigchain;
use crate::error::UserError;
use crate::statement::Statement;

const FIELDS: &[&str] = &["name", "seq", "service", "url"];

/// The closed set of third-party services a [`User`] binding may claim.
///
/// Historical service names (`Github`/`Twitter`) are kept exactly as the
/// golden scenarios in the spec name them; `Mastodon`/`Hackernews`/`Reddit`
/// round out the set for everything else a binding workflow plausibly wants
/// to claim.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum UserService {
	Github,
	Twitter,
	Mastodon,
	Hackernews,
	Reddit,
}

impl UserService {
	fn as_str(self) -> &'static str {
		match self {
			Self::Github => "github",
			Self::Twitter => "twitter",
			Self::Mastodon => "mastodon",
			Self::Hackernews => "hackernews",
			Self::Reddit => "reddit",
		}
	}

	fn parse(s: &str) -> Result<Self, UserError> {
		match s {
			"github" => Ok(Self::Github),
			"twitter" => Ok(Self::Twitter),
			"mastodon" => Ok(Self::Mastodon),
			"hackernews" => Ok(Self::Hackernews),
			"reddit" => Ok(Self::Reddit),
			other => Err(UserError::UnknownService(other.to_string())),
		}
	}

	/// Checks `name` matches this service's handle syntax, after the
	/// caller has already lowercased it.
	fn validate_name(self, name: &str) -> bool {
		if name.is_empty() || name.len() > 39 {
			return false;
		}
		match self {
			Self::Github => {
				name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
					&& !name.starts_with('-')
					&& !name.ends_with('-')
					&& !name.contains("--")
			}
			Self::Twitter | Self::Hackernews | Self::Reddit => {
				name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
			}
			Self::Mastodon => name
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '@'),
		}
	}

	/// Checks `url` is a well-formed proof URL for `name` on this service.
	fn validate_url(self, url: &Url, name: &str) -> bool {
		let Some(host) = url.host_str() else {
			return false;
		};
		let path = url.path();
		match self {
			Self::Github => {
				host == "gist.github.com"
					&& path
						.trim_matches('/')
						.split('/')
						.next()
						.is_some_and(|owner| owner.eq_ignore_ascii_case(name))
			}
			Self::Twitter => host == "twitter.com" || host == "x.com",
			Self::Mastodon => true,
			Self::Hackernews => host == "news.ycombinator.com",
			Self::Reddit => host == "www.reddit.com" || host == "reddit.com",
		}
	}
}

/// A candidate or decoded binding from the sigchain identity to a
/// third-party profile.
///
/// [`User::new`] validates `service`/`name`/`url` up front; the `seq` field
/// is only checked against the chain at [`User::generate_statement`] time,
/// since that is the earliest point a chain position is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
	service: UserService,
	name: String,
	url: String,
	seq: u32,
}

impl User {
	pub const STATEMENT_TYPE: &'static str = "user";

	pub fn new(service: &str, name: &str, url: &str, seq: u32) -> Result<Self, UserError> {
		let service = UserService::parse(service)?;
		let name = name.to_lowercase();
		if !service.validate_name(&name) {
			return Err(UserError::InvalidName {
				service: service.as_str().to_string(),
				name,
			});
		}
		let parsed_url =
			Url::parse(url).map_err(|_| UserError::InvalidUrl(url.to_string()))?;
		if parsed_url.scheme() != "https" || !service.validate_url(&parsed_url, &name) {
			return Err(UserError::InvalidUrl(url.to_string()));
		}
		if seq == 0 {
			return Err(UserError::InvalidSeq);
		}
		Ok(Self {
			service,
			name,
			url: url.to_string(),
			seq,
		})
	}

	pub fn service(&self) -> &'static str {
		self.service.as_str()
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn seq(&self) -> u32 {
		self.seq
	}

	fn to_canonical_bytes(&self) -> Vec<u8> {
		CanonicalObject::new()
			.str("name", Some(&self.name))
			.uint("seq", Some(u64::from(self.seq)))
			.str("service", Some(self.service.as_str()))
			.str("url", Some(&self.url))
			.finish()
	}

	/// Decodes a `User` from a statement's `data` field. Used by
	/// [`Sigchain::user`](crate::Sigchain::user) to reconstruct the latest
	/// binding; never re-validates name/URL syntax, since a previously
	/// chained statement was already validated at the time it was signed.
	pub(crate) fn from_statement_data(data: &[u8]) -> Result<Self, UserError> {
		let parsed = CanonicalParser::parse(data)
			.map_err(|_| UserError::InvalidUrl(String::new()))?;
		parsed
			.deny_unknown_fields(FIELDS)
			.map_err(|_| UserError::InvalidUrl(String::new()))?;
		let name = parsed
			.get_str("name")
			.ok()
			.flatten()
			.ok_or(UserError::InvalidName {
				service: String::new(),
				name: String::new(),
			})?;
		let seq = parsed
			.get_uint("seq")
			.ok()
			.flatten()
			.ok_or(UserError::SeqMismatch)? as u32;
		let service_str = parsed
			.get_str("service")
			.ok()
			.flatten()
			.ok_or(UserError::UnknownService(String::new()))?;
		let url = parsed
			.get_str("url")
			.ok()
			.flatten()
			.ok_or(UserError::InvalidUrl(String::new()))?;
		let service = UserService::parse(&service_str)?;
		Ok(Self {
			service,
			name,
			url,
			seq,
		})
	}

	/// Emits a statement binding `self` into `chain`, failing
	/// [`UserError::SeqMismatch`] ("user seq mismatch") when `self.seq`
	/// does not equal the chain position the statement would actually
	/// occupy. This forces callers to commit to a slot up front, so a
	/// binding copied to a different position is detectably wrong.
	pub fn generate_statement(
		&self,
		chain: &Sigchain,
		signer: &SigningKey,
		ts: u64,
	) -> Result<Statement, UserError> {
		let next_seq = chain.last_seq() + 1;
		if self.seq != next_seq {
			return Err(UserError::SeqMismatch);
		}
		let data = self.to_canonical_bytes();
		Statement::generate(chain, Some(&data), signer, Some(Self::STATEMENT_TYPE), ts)
			.map_err(UserError::Statement)
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
	fn github_binding_round_trips_through_chain() {
		let mut chain = Sigchain::new(signer().verifying_key());
		let user = User::new(
			"github",
			"alice",
			"https://gist.github.com/alice/deadbeef",
			1,
		)
		.unwrap();
		let st = user.generate_statement(&chain, &signer(), 1234567890001).unwrap();
		chain.add(st).unwrap();

		let bound = chain.user().unwrap();
		assert_eq!(bound.name(), "alice");
		assert_eq!(bound.seq(), 1);

		chain.revoke(1, &signer()).unwrap();
		assert!(chain.user().is_none());
	}

	#[test]
	fn seq_mismatch_is_rejected() {
		let user = User::new(
			"github",
			"alice",
			"https://gist.github.com/alice/deadbeef",
			1,
		)
		.unwrap();
		// Chain already has two statements, so last_seq()+1 == 3, but the
		// binding above committed to seq 1.
		let mut chain = Sigchain::new(signer().verifying_key());
		chain
			.add(Statement::generate(&chain, Some(b"x"), &signer(), None, 1).unwrap())
			.unwrap();
		chain
			.add(Statement::generate(&chain, Some(b"y"), &signer(), None, 2).unwrap())
			.unwrap();
		assert_eq!(chain.last_seq() + 1, 3);

		let err = user.generate_statement(&chain, &signer(), 3).unwrap_err();
		assert_eq!(err, UserError::SeqMismatch);
	}

	#[test]
	fn invalid_name_is_rejected() {
		let err = User::new(
			"github",
			"-bad-",
			"https://gist.github.com/bad/deadbeef",
			1,
		)
		.unwrap_err();
		assert!(matches!(err, UserError::InvalidName { .. }));
	}

	#[test]
	fn url_must_match_claimed_handle() {
		let err = User::new(
			"github",
			"alice",
			"https://gist.github.com/mallory/deadbeef",
			1,
		)
		.unwrap_err();
		assert!(matches!(err, UserError::InvalidUrl(_)));
	}

	#[test]
	fn unknown_service_is_rejected() {
		let err =
			User::new("friendster", "alice", "https://friendster.com/alice", 1)
				.unwrap_err();
		assert_eq!(err, UserError::UnknownService("friendster".to_string()));
	}

	#[test]
	fn zero_seq_is_rejected() {
		let err = User::new(
			"github",
			"alice",
			"https://gist.github.com/alice/deadbeef",
			0,
		)
		.unwrap_err();
		assert_eq!(err, UserError::InvalidSeq);
	}
}
