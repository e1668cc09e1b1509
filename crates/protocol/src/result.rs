//! Result payloads, discriminated by `type`.

use serde::{Deserialize, Serialize};

/// Closed set of successful outcomes across all services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RpcResult {
	#[serde(rename_all = "camelCase")]
	OAuthResult { return_uri: String },
	SuccessResult,
	ConnectResult {
		mtu: u16,
		services: Vec<GattServiceInfo>,
	},
	ReadCharacteristicResult {
		/// Hex-encoded characteristic value.
		value: String,
	},
}

impl RpcResult {
	pub fn type_name(&self) -> &'static str {
		match self {
			RpcResult::OAuthResult { .. } => "OAuthResult",
			RpcResult::SuccessResult => "SuccessResult",
			RpcResult::ConnectResult { .. } => "ConnectResult",
			RpcResult::ReadCharacteristicResult { .. } => "ReadCharacteristicResult",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattServiceInfo {
	pub uuid: String,
	pub characteristics: Vec<GattCharacteristicInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattCharacteristicInfo {
	pub uuid: String,
	/// Standard GATT property bit mask.
	pub properties: u8,
}
