//! Point-to-point string channel between native code and web content.
//!
//! A [`Transport`] carries opaque messages both ways. It pairs nothing: one
//! inbound handler receives every message, and `send` is fire-and-forget.

use std::fmt;
use std::sync::Arc;

use linkbridge_protocol::dispatch_script;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Callback receiving every inbound message.
pub type InboundHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Bidirectional message pipe to one peer.
pub trait Transport: Send + Sync + 'static {
	/// Delivers one message to the peer. Never fails; undeliverable messages
	/// are dropped and logged.
	fn send(&self, message: String);

	/// Installs the single inbound handler, replacing any previous one.
	/// `None` stops delivery.
	fn set_inbound(&self, handler: Option<InboundHandler>);
}

/// The host web view, as seen by the bridge.
pub trait ScriptHost: Send + Sync + 'static {
	/// Evaluates a script in the page.
	fn evaluate_script(&self, script: String) -> anyhow::Result<()>;

	/// Exposes `channel` to the page; messages the page posts on it are passed
	/// to `callback`. `None` removes the exposure.
	fn set_message_callback(&self, channel: &str, callback: Option<InboundHandler>);
}

/// Transport over a web view: outbound envelopes are raised as
/// `<channel>Response` custom events in the page.
pub struct WebViewTransport {
	host: Arc<dyn ScriptHost>,
	channel: String,
}

impl WebViewTransport {
	pub fn new(host: Arc<dyn ScriptHost>, channel: impl Into<String>) -> Self {
		Self {
			host,
			channel: channel.into(),
		}
	}

	pub fn channel(&self) -> &str {
		&self.channel
	}
}

impl fmt::Debug for WebViewTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebViewTransport").field("channel", &self.channel).finish()
	}
}

impl Transport for WebViewTransport {
	fn send(&self, message: String) {
		let script = dispatch_script(&self.channel, &message);
		if let Err(e) = self.host.evaluate_script(script) {
			debug!(channel = %self.channel, error = %e, "dropping undeliverable message");
		}
	}

	fn set_inbound(&self, handler: Option<InboundHandler>) {
		self.host.set_message_callback(&self.channel, handler);
	}
}

type HandlerSlot = Arc<Mutex<Option<InboundHandler>>>;

/// In-process transport. The [`PeerHandle`] plays the web content.
pub struct MemoryTransport {
	outbound: mpsc::UnboundedSender<String>,
	inbound: HandlerSlot,
}

/// The far end of a [`MemoryTransport`].
pub struct PeerHandle {
	messages: mpsc::UnboundedReceiver<String>,
	inbound: HandlerSlot,
}

impl MemoryTransport {
	pub fn pair() -> (Arc<MemoryTransport>, PeerHandle) {
		let (tx, rx) = mpsc::unbounded_channel();
		let inbound: HandlerSlot = Arc::new(Mutex::new(None));
		let transport = Arc::new(MemoryTransport {
			outbound: tx,
			inbound: Arc::clone(&inbound),
		});
		(transport, PeerHandle { messages: rx, inbound })
	}
}

impl Transport for MemoryTransport {
	fn send(&self, message: String) {
		if self.outbound.send(message).is_err() {
			debug!("peer gone, dropping message");
		}
	}

	fn set_inbound(&self, handler: Option<InboundHandler>) {
		*self.inbound.lock() = handler;
	}
}

impl PeerHandle {
	/// Posts a message to native code. Returns `false` when no handler is
	/// installed and the message was dropped.
	pub fn post(&self, message: impl Into<String>) -> bool {
		// Clone out so the handler runs without the slot locked.
		let handler = self.inbound.lock().clone();
		match handler {
			Some(handler) => {
				handler(message.into());
				true
			}
			None => {
				debug!("no inbound handler, dropping message");
				false
			}
		}
	}

	pub fn has_handler(&self) -> bool {
		self.inbound.lock().is_some()
	}

	/// Next message sent by native code. `None` once the transport is gone.
	pub async fn recv(&mut self) -> Option<String> {
		self.messages.recv().await
	}

	pub fn try_recv(&mut self) -> Option<String> {
		self.messages.try_recv().ok()
	}
}

#[cfg(test)]
mod tests;
