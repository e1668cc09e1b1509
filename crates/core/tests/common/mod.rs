#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use linkbridge::ble::{
	Advertisement, Availability, BlePeripheral, BlePlatform, BleService, CharacteristicProperties, GattCharacteristic,
	GattService, PlatformError, PlatformResult, WriteType,
};
use linkbridge::oauth::{CaptureSurface, LoadRequest, NavigationAction, NavigationPolicy};
use linkbridge::runtime::{Dispatcher, MemoryTransport, Outbound, PeerHandle};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;
use uuid::Uuid;

pub const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
pub const BATTERY_LEVEL: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);
pub const CONTROL_POINT: Uuid = Uuid::from_u128(0x00002a9f_0000_1000_8000_00805f9b34fb);

pub const ADDRESS: &str = "AA:BB:CC:DD:EE:01";

/// Scripted peripheral. Values pushed with [`FakePeripheral::notify`] reach
/// whoever is observing that characteristic.
pub struct FakePeripheral {
	address: String,
	pub mtu: Mutex<Option<u16>>,
	pub requested_mtu: Mutex<Option<u16>>,
	pub connect_error: Mutex<Option<PlatformError>>,
	pub connect_gate: Mutex<Option<Arc<Notify>>>,
	pub observe_error: Mutex<Option<PlatformError>>,
	pub observe_gate: Mutex<Option<Arc<Notify>>>,
	pub disconnect_error: Mutex<Option<PlatformError>>,
	pub values: Mutex<HashMap<Uuid, Vec<u8>>>,
	pub writes: Mutex<Vec<(Uuid, Uuid, Vec<u8>, WriteType)>>,
	observers: Mutex<HashMap<Uuid, mpsc::UnboundedSender<Vec<u8>>>>,
	pub connects: AtomicUsize,
	pub disconnects: AtomicUsize,
	pub stop_observing_calls: AtomicUsize,
}

impl FakePeripheral {
	pub fn new(address: &str) -> Arc<Self> {
		Arc::new(Self {
			address: address.to_string(),
			mtu: Mutex::new(Some(247)),
			requested_mtu: Mutex::new(None),
			connect_error: Mutex::new(None),
			connect_gate: Mutex::new(None),
			observe_error: Mutex::new(None),
			observe_gate: Mutex::new(None),
			disconnect_error: Mutex::new(None),
			values: Mutex::new(HashMap::from([(BATTERY_LEVEL, vec![0x64])])),
			writes: Mutex::new(Vec::new()),
			observers: Mutex::new(HashMap::new()),
			connects: AtomicUsize::new(0),
			disconnects: AtomicUsize::new(0),
			stop_observing_calls: AtomicUsize::new(0),
		})
	}

	/// Pushes a value to the observer of `characteristic`. `false` when no
	/// live observer exists.
	pub fn notify(&self, characteristic: Uuid, value: &[u8]) -> bool {
		match self.observers.lock().get(&characteristic) {
			Some(tx) => tx.unbounded_send(value.to_vec()).is_ok(),
			None => false,
		}
	}

	pub fn is_observed(&self, characteristic: Uuid) -> bool {
		self.observers
			.lock()
			.get(&characteristic)
			.is_some_and(|tx| !tx.is_closed())
	}

	pub fn connect_count(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}

	pub fn disconnect_count(&self) -> usize {
		self.disconnects.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl BlePeripheral for FakePeripheral {
	fn address(&self) -> String {
		self.address.clone()
	}

	async fn connect(&self) -> PlatformResult<()> {
		let gate = self.connect_gate.lock().clone();
		if let Some(gate) = gate {
			gate.notified().await;
		}
		self.connects.fetch_add(1, Ordering::SeqCst);
		match self.connect_error.lock().clone() {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	async fn request_mtu(&self, mtu: u16) -> PlatformResult<Option<u16>> {
		*self.requested_mtu.lock() = Some(mtu);
		Ok(*self.mtu.lock())
	}

	async fn services(&self) -> PlatformResult<Vec<GattService>> {
		Ok(vec![GattService {
			uuid: BATTERY_SERVICE,
			characteristics: vec![
				GattCharacteristic {
					uuid: BATTERY_LEVEL,
					properties: CharacteristicProperties(
						CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
					),
				},
				GattCharacteristic {
					uuid: CONTROL_POINT,
					properties: CharacteristicProperties(CharacteristicProperties::WRITE),
				},
			],
		}])
	}

	async fn read(&self, service: Uuid, characteristic: Uuid) -> PlatformResult<Vec<u8>> {
		if service != BATTERY_SERVICE {
			return Err(PlatformError::ServiceNotFound(service));
		}
		self.values
			.lock()
			.get(&characteristic)
			.cloned()
			.ok_or(PlatformError::CharacteristicNotFound(characteristic))
	}

	async fn write(&self, service: Uuid, characteristic: Uuid, value: &[u8], write_type: WriteType) -> PlatformResult<()> {
		self.writes.lock().push((service, characteristic, value.to_vec(), write_type));
		Ok(())
	}

	async fn observe(&self, _service: Uuid, characteristic: Uuid) -> PlatformResult<BoxStream<'static, Vec<u8>>> {
		let gate = self.observe_gate.lock().clone();
		if let Some(gate) = gate {
			gate.notified().await;
		}
		if let Some(err) = self.observe_error.lock().clone() {
			return Err(err);
		}
		let (tx, rx) = mpsc::unbounded();
		self.observers.lock().insert(characteristic, tx);
		Ok(rx.boxed())
	}

	async fn stop_observing(&self, _service: Uuid, _characteristic: Uuid) -> PlatformResult<()> {
		self.stop_observing_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn disconnect(&self) -> PlatformResult<()> {
		self.disconnects.fetch_add(1, Ordering::SeqCst);
		match self.disconnect_error.lock().clone() {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

/// Scripted radio stack.
pub struct FakePlatform {
	pub availability: Mutex<Availability>,
	/// Peripherals `resolve` can find without a scan.
	pub known: Mutex<HashMap<String, Arc<FakePeripheral>>>,
	scan: Mutex<Option<mpsc::UnboundedSender<Advertisement>>>,
	pub scans_started: AtomicUsize,
}

impl FakePlatform {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			availability: Mutex::new(Availability::Available),
			known: Mutex::new(HashMap::new()),
			scan: Mutex::new(None),
			scans_started: AtomicUsize::new(0),
		})
	}

	pub fn set_availability(&self, availability: Availability) {
		*self.availability.lock() = availability;
	}

	pub fn make_known(&self, peripheral: &Arc<FakePeripheral>) {
		self.known.lock().insert(peripheral.address(), Arc::clone(peripheral));
	}

	/// Delivers an advertisement to the running scan.
	pub fn advertise(&self, advertisement: Advertisement) -> bool {
		match self.scan.lock().as_ref() {
			Some(tx) => tx.unbounded_send(advertisement).is_ok(),
			None => false,
		}
	}

	pub fn scan_active(&self) -> bool {
		self.scan.lock().as_ref().is_some_and(|tx| !tx.is_closed())
	}

	pub fn scans_started(&self) -> usize {
		self.scans_started.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl BlePlatform for FakePlatform {
	async fn availability(&self) -> Availability {
		*self.availability.lock()
	}

	async fn scan(&self) -> PlatformResult<BoxStream<'static, Advertisement>> {
		self.scans_started.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = mpsc::unbounded();
		*self.scan.lock() = Some(tx);
		Ok(rx.boxed())
	}

	async fn resolve(&self, address: &str) -> PlatformResult<Option<Arc<dyn BlePeripheral>>> {
		// Desktop stacks match addresses regardless of case.
		Ok(self
			.known
			.lock()
			.values()
			.find(|p| p.address().eq_ignore_ascii_case(address))
			.map(|p| Arc::clone(p) as Arc<dyn BlePeripheral>))
	}
}

pub fn advertisement(peripheral: &Arc<FakePeripheral>) -> Advertisement {
	Advertisement {
		peripheral: Arc::clone(peripheral) as Arc<dyn BlePeripheral>,
		name: Some("Vehicle Key".to_string()),
		rssi: -58,
		manufacturer_data: BTreeMap::from([(0x004c, vec![0x02, 0x15])]),
		service_data: BTreeMap::from([(BATTERY_SERVICE, vec![0x64])]),
		services: vec![BATTERY_SERVICE],
		bonded: Some(false),
	}
}

/// Capture surface that walks a scripted list of navigations through the
/// policy it is handed.
pub struct FakeSurface {
	navigations: Mutex<Vec<String>>,
	failure: Mutex<Option<String>>,
	hang: AtomicBool,
	pub loads: Mutex<Vec<LoadRequest>>,
	pub actions: Mutex<Vec<NavigationAction>>,
	pub clears: AtomicUsize,
}

impl FakeSurface {
	pub fn navigating(urls: &[&str]) -> Arc<Self> {
		Arc::new(Self {
			navigations: Mutex::new(urls.iter().map(|u| u.to_string()).collect()),
			failure: Mutex::new(None),
			hang: AtomicBool::new(false),
			loads: Mutex::new(Vec::new()),
			actions: Mutex::new(Vec::new()),
			clears: AtomicUsize::new(0),
		})
	}

	pub fn failing(message: &str) -> Arc<Self> {
		let surface = Self::navigating(&[]);
		*surface.failure.lock() = Some(message.to_string());
		surface
	}

	/// A surface whose capture never resolves.
	pub fn hanging() -> Arc<Self> {
		let surface = Self::navigating(&[]);
		surface.hang.store(true, Ordering::SeqCst);
		surface
	}

	pub fn clear_count(&self) -> usize {
		self.clears.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl CaptureSurface for FakeSurface {
	async fn clear_storage(&self) -> anyhow::Result<()> {
		self.clears.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn capture(&self, load: LoadRequest, policy: Arc<NavigationPolicy>) -> anyhow::Result<Option<String>> {
		self.loads.lock().push(load);
		if let Some(message) = self.failure.lock().clone() {
			anyhow::bail!(message);
		}
		if self.hang.load(Ordering::SeqCst) {
			futures::future::pending::<()>().await;
		}
		let navigations = self.navigations.lock().clone();
		for url in navigations {
			match policy.decide(&url) {
				NavigationAction::Intercept(uri) => return Ok(Some(uri)),
				action => self.actions.lock().push(action),
			}
		}
		Ok(None)
	}
}

/// Web-content side of one channel.
pub struct Peer {
	pub handle: PeerHandle,
	events: VecDeque<Value>,
	next_id: i64,
}

impl Peer {
	pub fn new(handle: PeerHandle) -> Self {
		Self {
			handle,
			events: VecDeque::new(),
			next_id: 1,
		}
	}

	pub fn send(&mut self, method: &str, params: Value) -> i64 {
		let id = self.next_id;
		self.next_id += 1;
		self.handle
			.post(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string());
		id
	}

	async fn next_message(&mut self) -> Value {
		let text = tokio::time::timeout(Duration::from_secs(5), self.handle.recv())
			.await
			.expect("timed out waiting for a message")
			.expect("transport closed");
		serde_json::from_str(&text).expect("message is JSON")
	}

	/// Waits for the response to `id`, buffering events seen on the way.
	pub async fn response(&mut self, id: i64) -> Value {
		loop {
			let message = self.next_message().await;
			if message.get("id").and_then(Value::as_i64) == Some(id) {
				return message;
			}
			assert!(message.get("id").is_none(), "unexpected response {message}");
			self.events.push_back(message);
		}
	}

	pub async fn call(&mut self, method: &str, params: Value) -> Value {
		let id = self.send(method, params);
		self.response(id).await
	}

	pub async fn next_event(&mut self) -> Value {
		if let Some(event) = self.events.pop_front() {
			return event;
		}
		let message = self.next_message().await;
		assert!(message.get("id").is_none(), "expected an event, got {message}");
		message
	}

	/// Lets pending tasks run, then asserts nothing was sent.
	pub async fn assert_quiet(&mut self) {
		for _ in 0..20 {
			tokio::task::yield_now().await;
		}
		assert!(self.events.is_empty(), "buffered events: {:?}", self.events);
		if let Some(message) = self.handle.try_recv() {
			panic!("unexpected message {message}");
		}
	}
}

pub struct BleHarness {
	pub dispatcher: Arc<Dispatcher<BleService>>,
	pub platform: Arc<FakePlatform>,
	pub peer: Peer,
}

pub fn ble_harness() -> BleHarness {
	let (transport, handle) = MemoryTransport::pair();
	let outbound = Outbound::new(transport);
	let platform = FakePlatform::new();
	let service = BleService::new(platform.clone(), outbound.clone(), 517);
	let dispatcher = Dispatcher::new(outbound, Arc::new(service)).expect("inside a runtime");
	dispatcher.start().expect("fresh dispatcher");
	BleHarness {
		dispatcher,
		platform,
		peer: Peer::new(handle),
	}
}

pub fn characteristic_params(characteristic: Uuid) -> Value {
	json!({
		"address": ADDRESS,
		"serviceUUID": BATTERY_SERVICE.to_string(),
		"characteristicUUID": characteristic.to_string(),
	})
}

pub fn assert_error(response: &Value, code: i64, message: &str) {
	assert_eq!(response["error"]["code"], code, "{response}");
	assert_eq!(response["error"]["message"], message, "{response}");
	assert!(response.get("result").is_none());
}

pub fn assert_success(response: &Value) {
	assert_eq!(response["result"], json!({"type": "SuccessResult"}), "{response}");
}
