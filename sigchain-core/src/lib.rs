//! The append-only, signer-linked sigchain and its statement/user-binding
//! types.
//!
//! A [`Sigchain`] is an ordered, in-memory sequence of [`Statement`]s for one
//! signing key, chained by hash and verified by signature. Higher layers
//! (a keyring, a CLI, a server) drive this crate but never need to reach
//! into `sigchain-codec` or `sigchain-key` directly — those are re-exported
//! at the points where callers actually need them.

#[cfg(feature = "config")]
pub mod config;
mod chain;
pub mod error;
mod statement;
mod user;

pub use chain::Sigchain;
pub use sigchain_key::{Kid, KidError, SigningKey, VerifyingKey};
pub use statement::{Statement, REVOKE_TYPE};
pub use user::{User, UserService};
