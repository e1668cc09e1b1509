//! Numeric error codes carried in error envelopes.
//!
//! The values are shared with the web content, which branches on them, so
//! they must stay stable and distinct.

use std::fmt;

/// Closed set of error codes the bridge emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
	/// The user or system dismissed the OAuth capture surface.
	OAuthCancelled,
	/// The Bluetooth radio is powered off.
	BluetoothOff,
	/// The app lacks Bluetooth permission.
	PermissionDenied,
	/// The platform reports Bluetooth as unknown or unsupported.
	BluetoothUnavailable,
	/// Location services are off on platforms that need them for scanning.
	LocationServicesDisabled,
	/// The remote device forgot its pairing with this host.
	PairingInvalidated,
	/// A scan is already running on this service.
	ScanInProgress,
	/// The request method is not served on this channel.
	MethodNotFound,
	/// The request params were well-formed JSON but semantically invalid.
	InvalidParams,
	/// Catch-all for everything else, including unexpected failures.
	Internal,
}

impl ErrorCode {
	pub const fn code(self) -> i32 {
		match self {
			ErrorCode::OAuthCancelled => -32000,
			ErrorCode::BluetoothOff => -32011,
			ErrorCode::PermissionDenied => -32012,
			ErrorCode::BluetoothUnavailable => -32013,
			ErrorCode::LocationServicesDisabled => -32014,
			ErrorCode::PairingInvalidated => -32015,
			ErrorCode::ScanInProgress => -32016,
			ErrorCode::MethodNotFound => -32601,
			ErrorCode::InvalidParams => -32602,
			ErrorCode::Internal => -32099,
		}
	}

	pub fn from_code(code: i32) -> Option<Self> {
		Self::ALL.into_iter().find(|c| c.code() == code)
	}

	pub const ALL: [ErrorCode; 10] = [
		ErrorCode::OAuthCancelled,
		ErrorCode::BluetoothOff,
		ErrorCode::PermissionDenied,
		ErrorCode::BluetoothUnavailable,
		ErrorCode::LocationServicesDisabled,
		ErrorCode::PairingInvalidated,
		ErrorCode::ScanInProgress,
		ErrorCode::MethodNotFound,
		ErrorCode::InvalidParams,
		ErrorCode::Internal,
	];
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.code())
	}
}

impl From<ErrorCode> for i32 {
	fn from(code: ErrorCode) -> Self {
		code.code()
	}
}
