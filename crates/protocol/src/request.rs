//! Request enums, one closed set per service.
//!
//! Each enum is adjacently tagged by `method`/`params`, so an unknown method
//! can never reach a handler: the codec rejects it before deserialization.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::header::HeaderRule;

/// Closed request set served on one channel.
pub trait RpcRequest: DeserializeOwned + Send + 'static {
	/// Every `method` value this set accepts.
	const METHODS: &'static [&'static str];

	/// Wire name of this request's method.
	fn method(&self) -> &'static str;
}

/// Params object for methods that take none. Extra fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyParams {}

/// Requests served by the OAuth capture channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum OAuthRequest {
	#[serde(rename = "oauth")]
	OAuth(OAuthParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthParams {
	#[serde(rename = "authorizeURL")]
	pub authorize_url: String,
	/// Navigation to any URL starting with this prefix ends the capture.
	pub intercept_prefix: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub header_config: Option<Vec<HeaderRule>>,
}

impl RpcRequest for OAuthRequest {
	const METHODS: &'static [&'static str] = &["oauth"];

	fn method(&self) -> &'static str {
		match self {
			OAuthRequest::OAuth(_) => "oauth",
		}
	}
}

/// Requests served by the BLE channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum BleRequest {
	StartScan(EmptyParams),
	StopScan(EmptyParams),
	#[serde(rename = "connectGATT")]
	ConnectGatt(AddressParams),
	#[serde(rename = "disconnectGATT")]
	DisconnectGatt(AddressParams),
	ReadCharacteristic(CharacteristicParams),
	WriteCharacteristic(WriteCharacteristicParams),
	StartNotifications(CharacteristicParams),
	StopNotifications(CharacteristicParams),
}

impl RpcRequest for BleRequest {
	const METHODS: &'static [&'static str] = &[
		"startScan",
		"stopScan",
		"connectGATT",
		"disconnectGATT",
		"readCharacteristic",
		"writeCharacteristic",
		"startNotifications",
		"stopNotifications",
	];

	fn method(&self) -> &'static str {
		match self {
			BleRequest::StartScan(_) => "startScan",
			BleRequest::StopScan(_) => "stopScan",
			BleRequest::ConnectGatt(_) => "connectGATT",
			BleRequest::DisconnectGatt(_) => "disconnectGATT",
			BleRequest::ReadCharacteristic(_) => "readCharacteristic",
			BleRequest::WriteCharacteristic(_) => "writeCharacteristic",
			BleRequest::StartNotifications(_) => "startNotifications",
			BleRequest::StopNotifications(_) => "stopNotifications",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParams {
	pub address: String,
}

/// Addresses one characteristic on one peripheral.
///
/// UUIDs stay strings on the wire; the BLE service parses them and answers
/// with invalid-params when they are malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicParams {
	pub address: String,
	#[serde(rename = "serviceUUID")]
	pub service_uuid: String,
	#[serde(rename = "characteristicUUID")]
	pub characteristic_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCharacteristicParams {
	pub address: String,
	#[serde(rename = "serviceUUID")]
	pub service_uuid: String,
	#[serde(rename = "characteristicUUID")]
	pub characteristic_uuid: String,
	/// Hex-encoded payload.
	pub value: String,
}

impl WriteCharacteristicParams {
	pub fn characteristic(&self) -> CharacteristicParams {
		CharacteristicParams {
			address: self.address.clone(),
			service_uuid: self.service_uuid.clone(),
			characteristic_uuid: self.characteristic_uuid.clone(),
		}
	}
}
