use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ble::{ATT_DEFAULT_MTU, ATT_MAX_MTU};

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Failed to read config {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid config JSON: {0}")]
	Parse(#[from] serde_json::Error),

	#[error("{field} must not be empty")]
	EmptyChannel { field: &'static str },

	#[error("{field} '{name}' may only contain ASCII letters, digits, and underscores")]
	InvalidChannel { field: &'static str, name: String },

	#[error("OAuth and BLE channels must differ, both are '{0}'")]
	DuplicateChannel(String),

	#[error("maxMtu {0} is outside 23..=517")]
	MtuOutOfRange(u16),
}

/// Settings for one [`ConnectSession`](crate::ConnectSession).
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
	/// Channel name the OAuth service is exposed under.
	pub oauth_channel: String,
	/// Channel name the BLE service is exposed under.
	pub ble_channel: String,
	/// Redirect URI recognised by `receive_redirect`.
	pub redirect_uri: Option<String>,
	/// When set, the capture surface only browses this host.
	pub allowed_host: Option<String>,
	/// MTU requested on connect.
	pub max_mtu: u16,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			oauth_channel: "LinkBridge".to_string(),
			ble_channel: "LinkBridgeBLE".to_string(),
			redirect_uri: None,
			allowed_host: None,
			max_mtu: ATT_MAX_MTU,
		}
	}
}

impl BridgeConfig {
	pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_json_str(&text)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		validate_channel("oauthChannel", &self.oauth_channel)?;
		validate_channel("bleChannel", &self.ble_channel)?;
		if self.oauth_channel == self.ble_channel {
			return Err(ConfigError::DuplicateChannel(self.oauth_channel.clone()));
		}
		if !(ATT_DEFAULT_MTU..=ATT_MAX_MTU).contains(&self.max_mtu) {
			return Err(ConfigError::MtuOutOfRange(self.max_mtu));
		}
		Ok(())
	}
}

// Channel names are spliced into the dispatch script as JS identifiers.
fn validate_channel(field: &'static str, name: &str) -> Result<(), ConfigError> {
	if name.is_empty() {
		return Err(ConfigError::EmptyChannel { field });
	}
	if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
		return Err(ConfigError::InvalidChannel {
			field,
			name: name.to_string(),
		});
	}
	Ok(())
}
