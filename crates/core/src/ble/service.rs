//! BLE session service: scan lifecycle, GATT operations, and notification
//! subscriptions.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use linkbridge_protocol::{
	AddressParams, BleEvent, BleRequest, CharacteristicParams, GattCharacteristicInfo, GattServiceInfo, NotifyParams,
	RpcResult, WriteCharacteristicParams,
};
use linkbridge_runtime::{HandlerError, Outbound, RpcService};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::error::BleError;
use super::platform::{ATT_DEFAULT_MTU, BlePeripheral, BlePlatform, GattService, PlatformError, WriteType};
use super::registry::{NotificationKey, PeripheralRegistry, ScanHandle, ScanSlot, SubscriptionRegistry, parse_uuid};

type BleResult<T> = std::result::Result<T, BleError>;

pub struct BleService {
	platform: Arc<dyn BlePlatform>,
	outbound: Outbound,
	peripherals: Arc<PeripheralRegistry>,
	subscriptions: Arc<SubscriptionRegistry>,
	scan: Arc<ScanSlot>,
	tasks: TaskTracker,
	max_mtu: u16,
}

impl BleService {
	/// `outbound` must be the gate of the dispatcher serving this service, so
	/// that disposal silences events together with responses.
	pub fn new(platform: Arc<dyn BlePlatform>, outbound: Outbound, max_mtu: u16) -> Self {
		Self {
			platform,
			outbound,
			peripherals: Arc::default(),
			subscriptions: Arc::default(),
			scan: Arc::default(),
			tasks: TaskTracker::new(),
			max_mtu,
		}
	}

	pub fn peripherals(&self) -> &PeripheralRegistry {
		&self.peripherals
	}

	pub fn subscriptions(&self) -> &SubscriptionRegistry {
		&self.subscriptions
	}

	pub fn is_scanning(&self) -> bool {
		self.scan.is_scanning()
	}

	async fn start_scan(&self) -> BleResult<RpcResult> {
		if let Some(err) = BleError::from_availability(self.platform.availability().await) {
			return Err(err);
		}

		let handle = ScanHandle::new(self.outbound.child_token());
		let generation = self.scan.begin(handle.clone()).ok_or(BleError::ScanInProgress)?;
		let finished = handle.finished.clone().drop_guard();

		let mut advertisements = match self.platform.scan().await {
			Ok(stream) => stream,
			Err(e) => {
				self.scan.finish(generation);
				return Err(e.into());
			}
		};

		let outbound = self.outbound.clone();
		let peripherals = Arc::clone(&self.peripherals);
		let scan = Arc::clone(&self.scan);
		let token = handle.token;

		self.tasks.spawn(async move {
			let _finished = finished;
			loop {
				tokio::select! {
					biased;
					_ = token.cancelled() => break,
					next = advertisements.next() => match next {
						Some(advertisement) => {
							debug!(address = %advertisement.address(), name = ?advertisement.name, "found device");
							outbound.send_event(BleEvent::DeviceInfo(advertisement.to_device_info()));
							peripherals.track_if_absent(advertisement.peripheral);
						}
						None => break,
					},
				}
			}
			drop(advertisements);
			scan.finish(generation);
			debug!("scan ended");
		});

		info!("scan started");
		Ok(RpcResult::SuccessResult)
	}

	async fn stop_scan(&self) -> BleResult<RpcResult> {
		if let Some(handle) = self.scan.stop() {
			handle.finished.cancelled().await;
			info!("scan stopped");
		}
		Ok(RpcResult::SuccessResult)
	}

	async fn lookup(&self, address: &str) -> BleResult<Arc<dyn BlePeripheral>> {
		if let Some(peripheral) = self.peripherals.get(address) {
			return Ok(peripheral);
		}
		match self.platform.resolve(address).await? {
			Some(peripheral) => Ok(self.peripherals.track_if_absent(peripheral)),
			None => Err(BleError::PeripheralNotFound {
				address: address.to_string(),
			}),
		}
	}

	async fn connect_gatt(&self, params: AddressParams) -> BleResult<RpcResult> {
		let peripheral = self.lookup(&params.address).await?;
		// The registry keys on the platform's spelling of the address.
		let address = peripheral.address();

		peripheral.connect().await.map_err(|e| match e {
			PlatformError::PeerRemovedPairing => BleError::PairingInvalidated {
				address: address.clone(),
			},
			other => other.into(),
		})?;
		self.peripherals.set_connected(&address, true);

		let mtu = match peripheral.request_mtu(self.max_mtu).await {
			Ok(Some(mtu)) => mtu,
			Ok(None) => ATT_DEFAULT_MTU,
			Err(e) => {
				warn!(%address, error = %e, "MTU negotiation failed");
				ATT_DEFAULT_MTU
			}
		};

		let services = peripheral.services().await?;
		info!(%address, mtu, services = services.len(), "connected");

		Ok(RpcResult::ConnectResult {
			mtu,
			services: services.iter().map(service_info).collect(),
		})
	}

	async fn disconnect_gatt(&self, params: AddressParams) -> BleResult<RpcResult> {
		let address = params.address;
		let peripheral = self.peripherals.connected(&address)?;

		let cancelled = self.subscriptions.cancel_address(&address);
		let result = peripheral.disconnect().await;
		self.peripherals.remove(&address);
		result?;

		info!(%address, cancelled, "disconnected");
		Ok(RpcResult::SuccessResult)
	}

	async fn read_characteristic(&self, params: CharacteristicParams) -> BleResult<RpcResult> {
		let peripheral = self.peripherals.connected(&params.address)?;
		let service = parse_uuid(&params.service_uuid)?;
		let characteristic = parse_uuid(&params.characteristic_uuid)?;

		let value = peripheral.read(service, characteristic).await?;
		Ok(RpcResult::ReadCharacteristicResult {
			value: hex::encode(value),
		})
	}

	async fn write_characteristic(&self, params: WriteCharacteristicParams) -> BleResult<RpcResult> {
		let peripheral = self.peripherals.connected(&params.address)?;
		let service = parse_uuid(&params.service_uuid)?;
		let characteristic = parse_uuid(&params.characteristic_uuid)?;
		let value = hex::decode(&params.value).map_err(|e| BleError::InvalidHex { reason: e.to_string() })?;

		peripheral
			.write(service, characteristic, &value, WriteType::WithResponse)
			.await?;
		Ok(RpcResult::SuccessResult)
	}

	async fn start_notifications(&self, params: CharacteristicParams) -> BleResult<RpcResult> {
		let peripheral = self.peripherals.connected(&params.address)?;
		let key = NotificationKey::parse(&params.address, &params.service_uuid, &params.characteristic_uuid)?;

		let token = self.outbound.child_token();
		let generation = self
			.subscriptions
			.reserve(key.clone(), token.clone())
			.ok_or_else(|| BleError::NotificationsAlreadyStarted {
				address: params.address.clone(),
				service: params.service_uuid.clone(),
				characteristic: params.characteristic_uuid.clone(),
			})?;

		let mut values = match peripheral.observe(key.service, key.characteristic).await {
			Ok(stream) => stream,
			Err(e) => {
				self.subscriptions.release(&key, generation);
				return Err(e.into());
			}
		};

		let outbound = self.outbound.clone();
		let subscriptions = Arc::clone(&self.subscriptions);

		self.tasks.spawn(async move {
			let cancelled = loop {
				tokio::select! {
					biased;
					_ = token.cancelled() => break true,
					next = values.next() => match next {
						Some(value) => outbound.send_event(BleEvent::Notify(NotifyParams {
							address: params.address.clone(),
							service_uuid: params.service_uuid.clone(),
							characteristic_uuid: params.characteristic_uuid.clone(),
							value: hex::encode(value),
						})),
						None => break false,
					},
				}
			};
			drop(values);

			if cancelled {
				if let Err(e) = peripheral.stop_observing(key.service, key.characteristic).await {
					warn!(address = %key.address, characteristic = %key.characteristic, error = %e, "failed to stop notifications");
				}
			}
			subscriptions.release(&key, generation);
			debug!(address = %key.address, characteristic = %key.characteristic, "notifications ended");
		});

		Ok(RpcResult::SuccessResult)
	}

	async fn stop_notifications(&self, params: CharacteristicParams) -> BleResult<RpcResult> {
		let key = NotificationKey::parse(&params.address, &params.service_uuid, &params.characteristic_uuid)?;
		if self.subscriptions.cancel(&key) {
			debug!(address = %key.address, characteristic = %key.characteristic, "notifications stopped");
		}
		Ok(RpcResult::SuccessResult)
	}
}

fn service_info(service: &GattService) -> GattServiceInfo {
	GattServiceInfo {
		uuid: service.uuid.to_string(),
		characteristics: service
			.characteristics
			.iter()
			.map(|c| GattCharacteristicInfo {
				uuid: c.uuid.to_string(),
				properties: c.properties.bits(),
			})
			.collect(),
	}
}

#[async_trait]
impl RpcService for BleService {
	type Request = BleRequest;

	fn name(&self) -> &'static str {
		"ble"
	}

	async fn handle(&self, request: BleRequest) -> Result<RpcResult, HandlerError> {
		let result = match request {
			BleRequest::StartScan(_) => self.start_scan().await,
			BleRequest::StopScan(_) => self.stop_scan().await,
			BleRequest::ConnectGatt(params) => self.connect_gatt(params).await,
			BleRequest::DisconnectGatt(params) => self.disconnect_gatt(params).await,
			BleRequest::ReadCharacteristic(params) => self.read_characteristic(params).await,
			BleRequest::WriteCharacteristic(params) => self.write_characteristic(params).await,
			BleRequest::StartNotifications(params) => self.start_notifications(params).await,
			BleRequest::StopNotifications(params) => self.stop_notifications(params).await,
		};
		result.map_err(HandlerError::from)
	}

	async fn dispose(&self) {
		if let Some(handle) = self.scan.stop() {
			handle.finished.cancelled().await;
		}
		let cancelled = self.subscriptions.cancel_all();

		self.tasks.close();
		self.tasks.wait().await;

		let peripherals = self.peripherals.drain();
		let count = peripherals.len();
		for peripheral in peripherals {
			if let Err(e) = peripheral.disconnect().await {
				warn!(address = %peripheral.address(), error = %e, "disconnect during dispose failed");
			}
		}

		info!(subscriptions = cancelled, peripherals = count, "ble service disposed");
	}
}
