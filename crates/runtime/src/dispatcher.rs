//! Routes inbound requests to a service and answers each exactly once.
//!
//! Every request runs in its own task on the runtime captured at
//! construction. A task answers with one result or one error envelope,
//! unless the dispatcher is disposed first, in which case it answers
//! nothing.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use linkbridge_protocol::{ErrorCode, RequestId, RpcRequest, decode_request};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::outbound::Outbound;
use crate::service::{HandlerError, RpcService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
	Created,
	Started,
	Disposed,
}

/// Serves one [`RpcService`] over the transport behind an [`Outbound`].
pub struct Dispatcher<S: RpcService> {
	service: Arc<S>,
	outbound: Outbound,
	runtime: Handle,
	tasks: TaskTracker,
	token: CancellationToken,
	lifecycle: Mutex<Lifecycle>,
}

impl<S: RpcService> Dispatcher<S> {
	/// Creates a dispatcher bound to the current tokio runtime.
	///
	/// Fails outside a runtime context.
	pub fn new(outbound: Outbound, service: Arc<S>) -> Result<Arc<Self>> {
		let runtime = Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;
		Ok(Self::with_runtime(outbound, service, runtime))
	}

	pub fn with_runtime(outbound: Outbound, service: Arc<S>, runtime: Handle) -> Arc<Self> {
		let token = outbound.child_token();
		Arc::new(Self {
			service,
			outbound,
			runtime,
			tasks: TaskTracker::new(),
			token,
			lifecycle: Mutex::new(Lifecycle::Created),
		})
	}

	pub fn service(&self) -> &Arc<S> {
		&self.service
	}

	/// Installs the inbound handler on the transport.
	pub fn start(self: &Arc<Self>) -> Result<()> {
		{
			let mut lifecycle = self.lifecycle.lock();
			match *lifecycle {
				Lifecycle::Created => *lifecycle = Lifecycle::Started,
				Lifecycle::Started => return Err(Error::AlreadyStarted(self.service.name())),
				Lifecycle::Disposed => return Err(Error::Disposed(self.service.name())),
			}
		}

		let weak: Weak<Self> = Arc::downgrade(self);
		self.outbound.transport().set_inbound(Some(Arc::new(move |raw: String| {
			if let Some(dispatcher) = weak.upgrade() {
				dispatcher.on_message(raw);
			}
		})));

		debug!(service = self.service.name(), "dispatcher started");
		Ok(())
	}

	/// Handles one raw inbound message.
	///
	/// Decode failures are answered immediately; valid requests are handed to
	/// a new task.
	pub fn on_message(&self, raw: String) {
		if self.token.is_cancelled() {
			debug!(service = self.service.name(), "disposed, ignoring message");
			return;
		}
		debug!(service = self.service.name(), message = %raw, "recv");

		let decoded = match decode_request::<S::Request>(&raw) {
			Ok(decoded) => decoded,
			Err(err) => {
				debug!(service = self.service.name(), error = %err, "rejecting request");
				self.outbound.send_error(err.id.clone(), err.code(), err.message());
				return;
			}
		};

		let id = decoded.id;
		let request = decoded.request;
		let method = request.method();
		let service = Arc::clone(&self.service);
		let outbound = self.outbound.clone();
		let token = self.token.clone();

		self.tasks.spawn_on(
			async move {
				let outcome = tokio::select! {
					biased;
					_ = token.cancelled() => {
						debug!(service = service.name(), method, "request cancelled");
						return;
					}
					outcome = AssertUnwindSafe(service.handle(request)).catch_unwind() => outcome,
				};

				match outcome {
					Ok(Ok(result)) => outbound.send_result(id, result),
					Ok(Err(err)) => {
						report_failure(service.name(), method, id.as_ref(), &err);
						outbound.send_error(id, err.code(), err.message());
					}
					Err(panic) => {
						let message = panic_message(panic.as_ref());
						error!(service = service.name(), method, %message, "handler panicked");
						outbound.send_error(id, ErrorCode::Internal.code(), message);
					}
				}
			},
			&self.runtime,
		);
	}

	/// Number of requests still running.
	pub fn in_flight(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_disposed(&self) -> bool {
		*self.lifecycle.lock() == Lifecycle::Disposed
	}

	/// Stops the dispatcher and releases the service.
	///
	/// Closes the outbound gate, cancels every in-flight request, waits for
	/// their tasks to finish, then runs the service's own release. Idempotent.
	pub async fn dispose(&self) {
		{
			let mut lifecycle = self.lifecycle.lock();
			if *lifecycle == Lifecycle::Disposed {
				return;
			}
			*lifecycle = Lifecycle::Disposed;
		}

		self.outbound.transport().set_inbound(None);
		self.outbound.close();
		self.token.cancel();
		self.tasks.close();
		self.tasks.wait().await;
		self.service.dispose().await;

		debug!(service = self.service.name(), "dispatcher disposed");
	}
}

impl<S: RpcService> Drop for Dispatcher<S> {
	fn drop(&mut self) {
		self.token.cancel();
	}
}

fn report_failure(service: &str, method: &str, id: Option<&RequestId>, err: &HandlerError) {
	let id = id.map(ToString::to_string).unwrap_or_else(|| "null".to_string());
	match err {
		HandlerError::Declared { code, message } => {
			debug!(service, method, %id, code, %message, "request failed");
		}
		HandlerError::Internal(e) => {
			let detail = format!("{e:#}");
			error!(service, method, %id, error = %detail, "request failed");
		}
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(s) = panic.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = panic.downcast_ref::<String>() {
		s.clone()
	} else {
		"handler panicked".to_string()
	}
}
