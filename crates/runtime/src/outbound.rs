//! The single gate every outbound message passes through.

use std::sync::Arc;

use linkbridge_protocol::codec::{encode_error, encode_event, encode_result};
use linkbridge_protocol::{RequestId, RpcResult};
use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::Transport;

/// Cloneable sender shared by the dispatcher and the service it serves.
///
/// Once [`close`](Outbound::close) returns, nothing else reaches the
/// transport, and every token derived from this gate is cancelled.
#[derive(Clone)]
pub struct Outbound {
	transport: Arc<dyn Transport>,
	token: CancellationToken,
	open: Arc<RwLock<bool>>,
}

impl Outbound {
	pub fn new(transport: Arc<dyn Transport>) -> Self {
		Self {
			transport,
			token: CancellationToken::new(),
			open: Arc::new(RwLock::new(true)),
		}
	}

	pub fn transport(&self) -> &Arc<dyn Transport> {
		&self.transport
	}

	pub fn send_result(&self, id: Option<RequestId>, result: RpcResult) {
		self.send_raw(encode_result(id, result));
	}

	pub fn send_error(&self, id: Option<RequestId>, code: i32, message: impl Into<String>) {
		self.send_raw(encode_error(id, code, message));
	}

	pub fn send_event<E: Serialize>(&self, event: E) {
		self.send_raw(encode_event(event));
	}

	fn send_raw(&self, message: String) {
		// Held for the whole send so `close` cannot slip in between.
		let open = self.open.read();
		if !*open {
			debug!("outbound closed, dropping message");
			return;
		}
		debug!(message = %message, "send");
		self.transport.send(message);
	}

	/// Closes the gate and cancels every derived token.
	pub fn close(&self) {
		*self.open.write() = false;
		self.token.cancel();
	}

	pub fn is_closed(&self) -> bool {
		!*self.open.read()
	}

	/// Token cancelled when the gate closes. Cancelling the child leaves the
	/// gate open.
	pub fn child_token(&self) -> CancellationToken {
		self.token.child_token()
	}
}
