//! Unsolicited events pushed by the BLE service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum BleEvent {
	/// One advertisement seen while scanning.
	DeviceInfo(DeviceInfoParams),
	/// One value from a characteristic subscription.
	Notify(NotifyParams),
}

impl BleEvent {
	pub fn method(&self) -> &'static str {
		match self {
			BleEvent::DeviceInfo(_) => "deviceInfo",
			BleEvent::Notify(_) => "notify",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoParams {
	/// Advertised local name, empty when the device sent none.
	pub name: String,
	pub address: String,
	pub rssi: i16,
	/// Service UUID to hex-encoded service data.
	#[serde(default)]
	pub service_data: BTreeMap<String, String>,
	/// Company identifier to hex-encoded manufacturer data.
	#[serde(default)]
	pub manufacturer_data: BTreeMap<u16, String>,
	#[serde(rename = "advertisedServiceUUIDs", default)]
	pub advertised_service_uuids: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_bonded: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyParams {
	pub address: String,
	#[serde(rename = "serviceUUID")]
	pub service_uuid: String,
	#[serde(rename = "characteristicUUID")]
	pub characteristic_uuid: String,
	/// Hex-encoded characteristic value.
	pub value: String,
}
