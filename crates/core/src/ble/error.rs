use linkbridge_protocol::ErrorCode;
use linkbridge_runtime::HandlerError;
use thiserror::Error;

use super::platform::{Availability, PlatformError};

/// Declared failures of the BLE service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BleError {
	#[error("Bluetooth permission not granted")]
	PermissionDenied,

	#[error("Bluetooth is turned off")]
	BluetoothOff,

	#[error("Bluetooth is unavailable")]
	Unavailable,

	#[error("Location services are disabled")]
	LocationServicesDisabled,

	#[error("Scan already in progress")]
	ScanInProgress,

	#[error("Peripheral not found for address: {address}")]
	PeripheralNotFound { address: String },

	#[error("Peripheral not connected")]
	NotConnected { address: String },

	#[error("Pairing with {address} is no longer valid")]
	PairingInvalidated { address: String },

	#[error("Notifications already started for {address} {service}/{characteristic}")]
	NotificationsAlreadyStarted {
		address: String,
		service: String,
		characteristic: String,
	},

	#[error("Invalid UUID: {uuid}")]
	InvalidUuid { uuid: String },

	#[error("Invalid hex value: {reason}")]
	InvalidHex { reason: String },

	#[error(transparent)]
	Platform(#[from] PlatformError),
}

impl BleError {
	/// Precondition failure for scanning, if any.
	pub fn from_availability(availability: Availability) -> Option<Self> {
		match availability {
			Availability::Available => None,
			Availability::PermissionDenied => Some(BleError::PermissionDenied),
			Availability::BluetoothOff => Some(BleError::BluetoothOff),
			Availability::LocationServicesDisabled => Some(BleError::LocationServicesDisabled),
			Availability::Unknown => Some(BleError::Unavailable),
		}
	}

	pub fn error_code(&self) -> ErrorCode {
		match self {
			BleError::PermissionDenied => ErrorCode::PermissionDenied,
			BleError::BluetoothOff => ErrorCode::BluetoothOff,
			BleError::Unavailable => ErrorCode::BluetoothUnavailable,
			BleError::LocationServicesDisabled => ErrorCode::LocationServicesDisabled,
			BleError::ScanInProgress => ErrorCode::ScanInProgress,
			BleError::PairingInvalidated { .. } => ErrorCode::PairingInvalidated,
			BleError::InvalidUuid { .. } | BleError::InvalidHex { .. } => ErrorCode::InvalidParams,
			BleError::PeripheralNotFound { .. }
			| BleError::NotConnected { .. }
			| BleError::NotificationsAlreadyStarted { .. }
			| BleError::Platform(_) => ErrorCode::Internal,
		}
	}
}

impl From<BleError> for HandlerError {
	fn from(err: BleError) -> Self {
		HandlerError::declared(err.error_code(), err.to_string())
	}
}
