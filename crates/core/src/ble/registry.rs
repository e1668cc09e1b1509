//! Shared state of the BLE service: known peripherals, live subscriptions,
//! and the scan slot.
//!
//! All three are guarded by plain mutexes. No lock is held across an await.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::BleError;
use super::platform::BlePeripheral;

struct PeripheralEntry {
	peripheral: Arc<dyn BlePeripheral>,
	connected: bool,
}

/// Peripherals keyed by platform address.
#[derive(Default)]
pub struct PeripheralRegistry {
	entries: Mutex<HashMap<String, PeripheralEntry>>,
}

impl PeripheralRegistry {
	/// Registers a peripheral unless its address is already tracked.
	///
	/// Returns the tracked handle, which is the existing one if present.
	pub fn track_if_absent(&self, peripheral: Arc<dyn BlePeripheral>) -> Arc<dyn BlePeripheral> {
		let address = peripheral.address();
		let mut entries = self.entries.lock();
		let entry = entries.entry(address).or_insert(PeripheralEntry {
			peripheral,
			connected: false,
		});
		Arc::clone(&entry.peripheral)
	}

	pub fn get(&self, address: &str) -> Option<Arc<dyn BlePeripheral>> {
		self.entries.lock().get(address).map(|e| Arc::clone(&e.peripheral))
	}

	/// The tracked handle, failing unless it is connected.
	pub fn connected(&self, address: &str) -> Result<Arc<dyn BlePeripheral>, BleError> {
		let entries = self.entries.lock();
		match entries.get(address) {
			Some(entry) if entry.connected => Ok(Arc::clone(&entry.peripheral)),
			Some(_) => Err(BleError::NotConnected {
				address: address.to_string(),
			}),
			None => Err(BleError::PeripheralNotFound {
				address: address.to_string(),
			}),
		}
	}

	pub fn is_connected(&self, address: &str) -> bool {
		self.entries.lock().get(address).is_some_and(|e| e.connected)
	}

	pub fn set_connected(&self, address: &str, connected: bool) {
		if let Some(entry) = self.entries.lock().get_mut(address) {
			entry.connected = connected;
		}
	}

	pub fn remove(&self, address: &str) -> Option<Arc<dyn BlePeripheral>> {
		self.entries.lock().remove(address).map(|e| e.peripheral)
	}

	/// Empties the registry, returning every handle it held.
	pub fn drain(&self) -> Vec<Arc<dyn BlePeripheral>> {
		self.entries.lock().drain().map(|(_, e)| e.peripheral).collect()
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

/// Identity of one characteristic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey {
	pub address: String,
	pub service: Uuid,
	pub characteristic: Uuid,
}

impl NotificationKey {
	pub fn parse(address: &str, service: &str, characteristic: &str) -> Result<Self, BleError> {
		Ok(Self {
			address: address.to_string(),
			service: parse_uuid(service)?,
			characteristic: parse_uuid(characteristic)?,
		})
	}
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, BleError> {
	Uuid::parse_str(raw).map_err(|_| BleError::InvalidUuid { uuid: raw.to_string() })
}

#[derive(Default)]
struct SubscriptionState {
	next_generation: u64,
	entries: HashMap<NotificationKey, (u64, CancellationToken)>,
}

/// At most one live subscription per key.
///
/// Each reservation carries a generation so a finishing stream task only
/// removes its own entry, never a newer one under the same key.
#[derive(Default)]
pub struct SubscriptionRegistry {
	state: Mutex<SubscriptionState>,
}

impl SubscriptionRegistry {
	/// Claims `key`. `None` if a subscription already holds it.
	pub fn reserve(&self, key: NotificationKey, token: CancellationToken) -> Option<u64> {
		let mut state = self.state.lock();
		if state.entries.contains_key(&key) {
			return None;
		}
		state.next_generation += 1;
		let generation = state.next_generation;
		state.entries.insert(key, (generation, token));
		Some(generation)
	}

	/// Drops the entry for `key` if it is still `generation`.
	pub fn release(&self, key: &NotificationKey, generation: u64) -> bool {
		let mut state = self.state.lock();
		match state.entries.get(key) {
			Some((current, _)) if *current == generation => {
				state.entries.remove(key);
				true
			}
			_ => false,
		}
	}

	/// Cancels and removes the subscription for `key`.
	pub fn cancel(&self, key: &NotificationKey) -> bool {
		let removed = self.state.lock().entries.remove(key);
		match removed {
			Some((_, token)) => {
				token.cancel();
				true
			}
			None => false,
		}
	}

	/// Cancels every subscription on one peripheral.
	pub fn cancel_address(&self, address: &str) -> usize {
		let removed: Vec<CancellationToken> = {
			let mut state = self.state.lock();
			let keys: Vec<NotificationKey> = state.entries.keys().filter(|k| k.address == address).cloned().collect();
			keys.iter()
				.filter_map(|k| state.entries.remove(k))
				.map(|(_, token)| token)
				.collect()
		};
		removed.iter().for_each(CancellationToken::cancel);
		removed.len()
	}

	pub fn cancel_all(&self) -> usize {
		let removed: Vec<_> = self.state.lock().entries.drain().collect();
		for (_, (_, token)) in &removed {
			token.cancel();
		}
		removed.len()
	}

	pub fn contains(&self, key: &NotificationKey) -> bool {
		self.state.lock().entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.state.lock().entries.is_empty()
	}
}

/// Handle to one running scan.
#[derive(Clone)]
pub struct ScanHandle {
	/// Cancel to stop the scan.
	pub token: CancellationToken,
	/// Cancelled once the scan task has released the platform scan.
	pub finished: CancellationToken,
}

impl ScanHandle {
	pub fn new(token: CancellationToken) -> Self {
		Self {
			token,
			finished: CancellationToken::new(),
		}
	}
}

#[derive(Default)]
struct ScanState {
	generation: u64,
	current: Option<(u64, ScanHandle)>,
}

/// Holds at most one scan.
#[derive(Default)]
pub struct ScanSlot {
	state: Mutex<ScanState>,
}

impl ScanSlot {
	/// Occupies the slot. `None` if a scan is already running.
	pub fn begin(&self, handle: ScanHandle) -> Option<u64> {
		let mut state = self.state.lock();
		if state.current.is_some() {
			return None;
		}
		state.generation += 1;
		let generation = state.generation;
		state.current = Some((generation, handle));
		Some(generation)
	}

	/// Frees the slot if it still holds `generation`.
	pub fn finish(&self, generation: u64) {
		let mut state = self.state.lock();
		if matches!(state.current, Some((current, _)) if current == generation) {
			state.current = None;
		}
	}

	/// Cancels the running scan, if any, and frees the slot.
	pub fn stop(&self) -> Option<ScanHandle> {
		let (_, handle) = self.state.lock().current.take()?;
		handle.token.cancel();
		Some(handle)
	}

	pub fn is_scanning(&self) -> bool {
		self.state.lock().current.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key(address: &str, characteristic: u128) -> NotificationKey {
		NotificationKey {
			address: address.to_string(),
			service: Uuid::from_u128(0x180f),
			characteristic: Uuid::from_u128(characteristic),
		}
	}

	#[test]
	fn subscription_reserve_is_exclusive() {
		let registry = SubscriptionRegistry::default();
		assert!(registry.reserve(key("AA", 1), CancellationToken::new()).is_some());
		assert!(registry.reserve(key("AA", 1), CancellationToken::new()).is_none());
		assert!(registry.reserve(key("AA", 2), CancellationToken::new()).is_some());
		assert_eq!(registry.len(), 2);
	}

	#[test]
	fn stale_release_keeps_newer_subscription() {
		let registry = SubscriptionRegistry::default();
		let old = registry.reserve(key("AA", 1), CancellationToken::new()).unwrap();
		assert!(registry.cancel(&key("AA", 1)));

		let new = registry.reserve(key("AA", 1), CancellationToken::new()).unwrap();
		assert!(!registry.release(&key("AA", 1), old));
		assert!(registry.contains(&key("AA", 1)));

		assert!(registry.release(&key("AA", 1), new));
		assert!(registry.is_empty());
	}

	#[test]
	fn cancel_address_only_touches_that_peripheral() {
		let registry = SubscriptionRegistry::default();
		let a1 = CancellationToken::new();
		let a2 = CancellationToken::new();
		let b1 = CancellationToken::new();
		registry.reserve(key("AA", 1), a1.clone());
		registry.reserve(key("AA", 2), a2.clone());
		registry.reserve(key("BB", 1), b1.clone());

		assert_eq!(registry.cancel_address("AA"), 2);
		assert!(a1.is_cancelled() && a2.is_cancelled());
		assert!(!b1.is_cancelled());
		assert_eq!(registry.len(), 1);

		assert_eq!(registry.cancel_all(), 1);
		assert!(b1.is_cancelled());
	}

	#[test]
	fn cancel_absent_key_is_noop() {
		let registry = SubscriptionRegistry::default();
		assert!(!registry.cancel(&key("AA", 1)));
	}

	#[test]
	fn key_parse_rejects_bad_uuid() {
		let err = NotificationKey::parse("AA", "not-a-uuid", "00002a19-0000-1000-8000-00805f9b34fb").unwrap_err();
		assert_eq!(
			err,
			BleError::InvalidUuid {
				uuid: "not-a-uuid".into()
			}
		);
	}

	#[test]
	fn key_parse_ignores_uuid_case() {
		let lower = NotificationKey::parse("AA", "0000180f-0000-1000-8000-00805f9b34fb", "00002a19-0000-1000-8000-00805f9b34fb");
		let upper = NotificationKey::parse("AA", "0000180F-0000-1000-8000-00805F9B34FB", "00002A19-0000-1000-8000-00805F9B34FB");
		assert_eq!(lower.unwrap(), upper.unwrap());
	}

	#[test]
	fn scan_slot_holds_one_scan() {
		let slot = ScanSlot::default();
		let first = ScanHandle::new(CancellationToken::new());
		let generation = slot.begin(first.clone()).unwrap();
		assert!(slot.begin(ScanHandle::new(CancellationToken::new())).is_none());

		let stopped = slot.stop().unwrap();
		assert!(stopped.token.is_cancelled());
		assert!(!slot.is_scanning());

		let next = slot.begin(ScanHandle::new(CancellationToken::new())).unwrap();
		slot.finish(generation);
		assert!(slot.is_scanning());
		slot.finish(next);
		assert!(!slot.is_scanning());
	}

	#[test]
	fn stop_without_scan_is_none() {
		assert!(ScanSlot::default().stop().is_none());
	}
}
