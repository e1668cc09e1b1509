//! The BLE radio stack, as the session service sees it.
//!
//! Hosts implement [`BlePlatform`] and [`BlePeripheral`] over their native
//! stack. Streams returned from `scan` and `observe` own the underlying
//! platform operation: dropping the stream ends it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use linkbridge_protocol::DeviceInfoParams;
use thiserror::Error;
use uuid::Uuid;

/// ATT default MTU, reported when the platform cannot negotiate.
pub const ATT_DEFAULT_MTU: u16 = 23;

/// Largest MTU the ATT protocol allows.
pub const ATT_MAX_MTU: u16 = 517;

/// Whether scanning can start right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
	Available,
	PermissionDenied,
	BluetoothOff,
	/// Only reported by platforms that need location services to scan.
	LocationServicesDisabled,
	Unknown,
}

/// Failure reported by the platform stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
	/// The remote device discarded its bond with this host.
	#[error("Remote device removed its pairing information")]
	PeerRemovedPairing,

	#[error("Service {0} not found")]
	ServiceNotFound(Uuid),

	#[error("Characteristic {0} not found")]
	CharacteristicNotFound(Uuid),

	#[error("{0}")]
	Other(String),
}

impl PlatformError {
	pub fn other(err: impl fmt::Display) -> Self {
		PlatformError::Other(err.to_string())
	}
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Bit mask of standard GATT characteristic properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CharacteristicProperties(pub u8);

impl CharacteristicProperties {
	pub const BROADCAST: u8 = 0x01;
	pub const READ: u8 = 0x02;
	pub const WRITE_WITHOUT_RESPONSE: u8 = 0x04;
	pub const WRITE: u8 = 0x08;
	pub const NOTIFY: u8 = 0x10;
	pub const INDICATE: u8 = 0x20;
	pub const AUTHENTICATED_SIGNED_WRITES: u8 = 0x40;
	pub const EXTENDED_PROPERTIES: u8 = 0x80;

	pub fn contains(self, flag: u8) -> bool {
		self.0 & flag == flag
	}

	pub fn bits(self) -> u8 {
		self.0
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
	pub uuid: Uuid,
	pub properties: CharacteristicProperties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
	pub uuid: Uuid,
	pub characteristics: Vec<GattCharacteristic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
	WithResponse,
	WithoutResponse,
}

/// One advertisement sighting.
pub struct Advertisement {
	pub peripheral: Arc<dyn BlePeripheral>,
	pub name: Option<String>,
	pub rssi: i16,
	pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
	pub service_data: BTreeMap<Uuid, Vec<u8>>,
	pub services: Vec<Uuid>,
	/// Bond state, when the platform knows it.
	pub bonded: Option<bool>,
}

impl Advertisement {
	pub fn address(&self) -> String {
		self.peripheral.address()
	}

	pub fn to_device_info(&self) -> DeviceInfoParams {
		DeviceInfoParams {
			name: self.name.clone().unwrap_or_default(),
			address: self.address(),
			rssi: self.rssi,
			service_data: self
				.service_data
				.iter()
				.map(|(uuid, data)| (uuid.to_string(), hex::encode(data)))
				.collect(),
			manufacturer_data: self
				.manufacturer_data
				.iter()
				.map(|(company, data)| (*company, hex::encode(data)))
				.collect(),
			advertised_service_uuids: self.services.iter().map(Uuid::to_string).collect(),
			is_bonded: self.bonded,
		}
	}
}

impl fmt::Debug for Advertisement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Advertisement")
			.field("address", &self.address())
			.field("name", &self.name)
			.field("rssi", &self.rssi)
			.finish_non_exhaustive()
	}
}

/// The host's BLE stack.
#[async_trait]
pub trait BlePlatform: Send + Sync + 'static {
	async fn availability(&self) -> Availability;

	/// Starts scanning. The scan runs until the returned stream is dropped.
	async fn scan(&self) -> PlatformResult<BoxStream<'static, Advertisement>>;

	/// Looks up a peripheral the service has not seen advertise.
	async fn resolve(&self, _address: &str) -> PlatformResult<Option<Arc<dyn BlePeripheral>>> {
		Ok(None)
	}
}

/// One remote device.
#[async_trait]
pub trait BlePeripheral: Send + Sync + 'static {
	/// Platform address, the registry key.
	fn address(&self) -> String;

	async fn connect(&self) -> PlatformResult<()>;

	/// Negotiates the MTU. `None` when the platform does not support it.
	async fn request_mtu(&self, _mtu: u16) -> PlatformResult<Option<u16>> {
		Ok(None)
	}

	/// Discovered services. Valid after `connect`.
	async fn services(&self) -> PlatformResult<Vec<GattService>>;

	async fn read(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<Vec<u8>>;

	async fn write(&self, service: Uuid, characteristic: Uuid, value: &[u8], write_type: WriteType)
	-> PlatformResult<()>;

	/// Subscribes to a characteristic. Returns once the platform confirms the
	/// subscription; the stream then yields every value until dropped.
	async fn observe(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<BoxStream<'static, Vec<u8>>>;

	/// Called after an observation stream is cancelled.
	async fn stop_observing(&self, _service: Uuid, _characteristic: Uuid) -> PlatformResult<()> {
		Ok(())
	}

	async fn disconnect(&self) -> PlatformResult<()>;
}
