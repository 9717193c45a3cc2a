//! Deserialized config for the handful of things this crate lets a
//! deployment tune: the KID human-readable prefix (for test/alt-network
//! deployments that want a distinguishable namespace) and the keyring's
//! reserved/hidden ID prefixes.
//!
//! Business logic — sigchain validation, keyring sealing — never reads this
//! module; it exists so a caller embedding this crate has somewhere
//! conventional to put deployment-specific overrides, following the
//! teacher's `identity-server::config` shape (`deny_unknown_fields`,
//! per-section `Default`, a `FromStr` that goes through `toml`).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The compiled-in default config, byte-identical to what [`Config::default`]
/// produces when parsed. Ships as a file so a deployment has something
/// concrete to copy into its own config rather than reverse-engineering the
/// defaults from source.
pub const DEFAULT_CONFIG_CONTENTS: &str = include_str!("../default-config.toml");

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct KidConfig {
	/// Human-readable bech32 prefix for KIDs minted by this deployment.
	#[serde(default = "KidConfig::default_hrp")]
	pub hrp: String,
}

impl KidConfig {
	fn default_hrp() -> String {
		sigchain_key::KID_HRP.to_string()
	}
}

impl Default for KidConfig {
	fn default() -> Self {
		Self {
			hrp: Self::default_hrp(),
		}
	}
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct KeyringConfig {
	#[serde(default = "KeyringConfig::default_reserved_prefix")]
	pub reserved_prefix: String,
	#[serde(default = "KeyringConfig::default_hidden_prefix")]
	pub hidden_prefix: String,
}

impl KeyringConfig {
	fn default_reserved_prefix() -> String {
		"#".to_string()
	}

	fn default_hidden_prefix() -> String {
		".".to_string()
	}
}

impl Default for KeyringConfig {
	fn default() -> Self {
		Self {
			reserved_prefix: Self::default_reserved_prefix(),
			hidden_prefix: Self::default_hidden_prefix(),
		}
	}
}

/// The full config this crate understands. Embedding applications are
/// expected to nest this under their own config struct rather than require
/// a standalone file; [`Config::from_str`] exists mainly so this crate's own
/// tests (and a demo CLI) have something to exercise.
#[derive(Serialize, Deserialize, Eq, PartialEq, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
	#[serde(default)]
	pub kid: KidConfig,
	#[serde(default)]
	pub keyring: KeyringConfig,
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum ConfigError {
	#[error("error deserializing toml: {0}")]
	Toml(#[from] toml::de::Error),
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Self = toml::from_str(s)?;
		Ok(config)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn empty_config_deserializes_to_default() {
		let config = Config::from_str("").unwrap();
		assert_eq!(config, Config::default());
		assert_eq!(config.kid.hrp, "kse");
		assert_eq!(config.keyring.reserved_prefix, "#");
		assert_eq!(config.keyring.hidden_prefix, ".");
	}

	#[test]
	fn overriding_hrp_keeps_other_defaults() {
		let config = Config::from_str(r#"kid.hrp = "ksx""#).unwrap();
		assert_eq!(
			config,
			Config {
				kid: KidConfig {
					hrp: "ksx".to_string()
				},
				..Config::default()
			}
		);
	}

	#[test]
	fn unknown_field_is_rejected() {
		assert!(Config::from_str("bogus = 1").is_err());
	}

	#[test]
	fn default_config_file_matches_default_impl() {
		let config = Config::from_str(DEFAULT_CONFIG_CONTENTS).unwrap();
		assert_eq!(config, Config::default());
	}
}
