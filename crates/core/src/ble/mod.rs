//! BLE session service and the platform contract it drives.

#[cfg(feature = "btleplug")]
pub mod desktop;
pub mod error;
pub mod platform;
pub mod registry;
pub mod service;

pub use error::BleError;
pub use platform::{
	ATT_DEFAULT_MTU, ATT_MAX_MTU, Advertisement, Availability, BlePeripheral, BlePlatform, CharacteristicProperties,
	GattCharacteristic, GattService, PlatformError, PlatformResult, WriteType,
};
pub use registry::{NotificationKey, PeripheralRegistry, ScanSlot, SubscriptionRegistry};
pub use service::BleService;
