//! [`BlePlatform`] over btleplug, for hosts with a desktop Bluetooth stack.
//!
//! Desktop stacks have no runtime permission prompt and no MTU negotiation,
//! so availability follows the adapter's power state and `request_mtu` keeps
//! its default.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, CentralState, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tracing::{debug, warn};
use uuid::Uuid;

use super::platform::{
	Advertisement, Availability, BlePeripheral, BlePlatform, CharacteristicProperties, GattCharacteristic,
	GattService, PlatformError, PlatformResult, WriteType,
};

/// Drives the first adapter btleplug reports.
pub struct DesktopPlatform {
	adapter: Adapter,
}

impl DesktopPlatform {
	pub async fn new() -> PlatformResult<Self> {
		let manager = Manager::new().await.map_err(PlatformError::other)?;
		let adapter = manager
			.adapters()
			.await
			.map_err(PlatformError::other)?
			.into_iter()
			.next()
			.ok_or_else(|| PlatformError::Other("No Bluetooth adapter found".to_string()))?;
		Ok(Self { adapter })
	}

	pub fn with_adapter(adapter: Adapter) -> Self {
		Self { adapter }
	}
}

/// Stops the adapter scan when the advertisement stream is dropped.
struct ScanGuard {
	adapter: Adapter,
}

impl Drop for ScanGuard {
	fn drop(&mut self) {
		let adapter = self.adapter.clone();
		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			handle.spawn(async move {
				if let Err(e) = adapter.stop_scan().await {
					warn!(error = %e, "failed to stop adapter scan");
				}
			});
		}
	}
}

#[async_trait]
impl BlePlatform for DesktopPlatform {
	async fn availability(&self) -> Availability {
		match self.adapter.adapter_state().await {
			Ok(state) => availability_from_state(state),
			Err(e) => {
				debug!(error = %e, "adapter unavailable");
				Availability::Unknown
			}
		}
	}

	async fn scan(&self) -> PlatformResult<BoxStream<'static, Advertisement>> {
		let events = self.adapter.events().await.map_err(PlatformError::other)?;
		self.adapter
			.start_scan(ScanFilter::default())
			.await
			.map_err(PlatformError::other)?;

		let guard = ScanGuard {
			adapter: self.adapter.clone(),
		};
		let adapter = self.adapter.clone();

		let advertisements = stream::unfold((events, adapter, guard), |(mut events, adapter, guard)| async move {
			loop {
				let id = match events.next().await? {
					CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
					_ => continue,
				};
				let Ok(peripheral) = adapter.peripheral(&id).await else {
					continue;
				};
				if let Some(advertisement) = advertisement(peripheral).await {
					return Some((advertisement, (events, adapter, guard)));
				}
			}
		});

		Ok(advertisements.boxed())
	}

	async fn resolve(&self, address: &str) -> PlatformResult<Option<Arc<dyn BlePeripheral>>> {
		let peripherals = self.adapter.peripherals().await.map_err(PlatformError::other)?;
		Ok(peripherals
			.into_iter()
			.find(|p| p.address().to_string().eq_ignore_ascii_case(address))
			.map(|p| Arc::new(DesktopPeripheral { peripheral: p }) as Arc<dyn BlePeripheral>))
	}
}

fn availability_from_state(state: CentralState) -> Availability {
	match state {
		CentralState::PoweredOn => Availability::Available,
		CentralState::PoweredOff => Availability::BluetoothOff,
		_ => Availability::Unknown,
	}
}

async fn advertisement(peripheral: Peripheral) -> Option<Advertisement> {
	let properties = peripheral.properties().await.ok()??;
	Some(Advertisement {
		name: properties.local_name,
		rssi: properties.rssi.unwrap_or_default(),
		manufacturer_data: properties.manufacturer_data.into_iter().collect(),
		service_data: properties.service_data.into_iter().collect::<BTreeMap<_, _>>(),
		services: properties.services,
		bonded: None,
		peripheral: Arc::new(DesktopPeripheral { peripheral }),
	})
}

pub struct DesktopPeripheral {
	peripheral: Peripheral,
}

impl DesktopPeripheral {
	fn characteristic(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<Characteristic> {
		let services = self.peripheral.services();
		let found = services
			.iter()
			.find(|s| s.uuid == service)
			.ok_or(PlatformError::ServiceNotFound(service))?;
		found
			.characteristics
			.iter()
			.find(|c| c.uuid == characteristic)
			.cloned()
			.ok_or(PlatformError::CharacteristicNotFound(characteristic))
	}
}

#[async_trait]
impl BlePeripheral for DesktopPeripheral {
	fn address(&self) -> String {
		self.peripheral.address().to_string()
	}

	async fn connect(&self) -> PlatformResult<()> {
		if !self.peripheral.is_connected().await.unwrap_or(false) {
			self.peripheral.connect().await.map_err(PlatformError::other)?;
		}
		self.peripheral.discover_services().await.map_err(PlatformError::other)
	}

	async fn services(&self) -> PlatformResult<Vec<GattService>> {
		Ok(self
			.peripheral
			.services()
			.into_iter()
			.map(|s| GattService {
				uuid: s.uuid,
				characteristics: s
					.characteristics
					.iter()
					.map(|c| GattCharacteristic {
						uuid: c.uuid,
						properties: CharacteristicProperties(c.properties.bits()),
					})
					.collect(),
			})
			.collect())
	}

	async fn read(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<Vec<u8>> {
		let characteristic = self.characteristic(service, characteristic)?;
		self.peripheral.read(&characteristic).await.map_err(PlatformError::other)
	}

	async fn write(
		&self,
		service: Uuid,
		characteristic: Uuid,
		value: &[u8],
		write_type: WriteType,
	) -> PlatformResult<()> {
		let characteristic = self.characteristic(service, characteristic)?;
		let write_type = match write_type {
			WriteType::WithResponse => btleplug::api::WriteType::WithResponse,
			WriteType::WithoutResponse => btleplug::api::WriteType::WithoutResponse,
		};
		self.peripheral
			.write(&characteristic, value, write_type)
			.await
			.map_err(PlatformError::other)
	}

	async fn observe(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<BoxStream<'static, Vec<u8>>> {
		let target = self.characteristic(service, characteristic)?;
		let notifications = self.peripheral.notifications().await.map_err(PlatformError::other)?;
		self.peripheral.subscribe(&target).await.map_err(PlatformError::other)?;

		let uuid = target.uuid;
		Ok(notifications
			.filter_map(move |n| async move { (n.uuid == uuid).then_some(n.value) })
			.boxed())
	}

	async fn stop_observing(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<()> {
		let target = self.characteristic(service, characteristic)?;
		self.peripheral.unsubscribe(&target).await.map_err(PlatformError::other)
	}

	async fn disconnect(&self) -> PlatformResult<()> {
		self.peripheral.disconnect().await.map_err(PlatformError::other)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_adapter_power_state_maps_to_availability() {
		assert_eq!(availability_from_state(CentralState::PoweredOn), Availability::Available);
		assert_eq!(availability_from_state(CentralState::PoweredOff), Availability::BluetoothOff);
		assert_eq!(availability_from_state(CentralState::Unknown), Availability::Unknown);
	}
}
