use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use linkbridge_protocol::{OAuthParams, OAuthRequest, RpcResult};
use linkbridge_runtime::{HandlerError, RpcService};
use tracing::{debug, info, warn};

use super::error::OAuthError;
use super::navigation::{HeaderRules, LoadRequest, NavigationPolicy};

/// An isolated browsing surface owned by the host.
///
/// `capture` shows the surface, performs `load`, consults `policy` on every
/// navigation, and resolves once: with the intercepted URL, or `None` when
/// the user or the system dismissed it.
#[async_trait]
pub trait CaptureSurface: Send + Sync + 'static {
	/// Clears cookies, cache, and web storage of the surface.
	async fn clear_storage(&self) -> anyhow::Result<()>;

	async fn capture(&self, load: LoadRequest, policy: Arc<NavigationPolicy>) -> anyhow::Result<Option<String>>;
}

pub struct OAuthService {
	surface: Arc<dyn CaptureSurface>,
	allowed_host: Option<String>,
	/// Set when a capture was dropped before its closing storage clear.
	pending_clear: AtomicBool,
}

/// Marks a capture whose closing clear has not run yet. Dropping it armed
/// leaves the clear to [`OAuthService`]'s `dispose`.
struct ClearOnCancel<'a> {
	pending: &'a AtomicBool,
	armed: bool,
}

impl<'a> ClearOnCancel<'a> {
	fn new(pending: &'a AtomicBool) -> Self {
		Self { pending, armed: true }
	}

	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for ClearOnCancel<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.pending.store(true, Ordering::SeqCst);
		}
	}
}

impl OAuthService {
	pub fn new(surface: Arc<dyn CaptureSurface>) -> Self {
		Self {
			surface,
			allowed_host: None,
			pending_clear: AtomicBool::new(false),
		}
	}

	/// Restricts the surface to one host; navigations elsewhere open
	/// externally.
	pub fn with_allowed_host(mut self, host: Option<String>) -> Self {
		self.allowed_host = host;
		self
	}

	async fn authorize(&self, params: OAuthParams) -> Result<String, OAuthError> {
		let rules = HeaderRules::compile(params.header_config.as_deref().unwrap_or_default())?;
		let policy = Arc::new(NavigationPolicy::new(
			params.intercept_prefix,
			self.allowed_host.clone(),
			rules,
		));
		let load = policy.initial_load(&params.authorize_url);

		info!(url = %params.authorize_url, "starting oauth capture");
		self.clear_storage().await;
		let guard = ClearOnCancel::new(&self.pending_clear);
		let outcome = self.surface.capture(load, policy).await;
		self.clear_storage().await;
		guard.disarm();

		match outcome? {
			Some(return_uri) => {
				debug!(%return_uri, "oauth capture finished");
				Ok(return_uri)
			}
			None => {
				debug!("oauth capture cancelled");
				Err(OAuthError::Cancelled)
			}
		}
	}

	async fn clear_storage(&self) {
		if let Err(e) = self.surface.clear_storage().await {
			warn!(error = %e, "failed to clear capture surface storage");
		}
	}
}

#[async_trait]
impl RpcService for OAuthService {
	type Request = OAuthRequest;

	fn name(&self) -> &'static str {
		"oauth"
	}

	async fn handle(&self, request: OAuthRequest) -> Result<RpcResult, HandlerError> {
		match request {
			OAuthRequest::OAuth(params) => {
				let return_uri = self.authorize(params).await?;
				Ok(RpcResult::OAuthResult { return_uri })
			}
		}
	}

	async fn dispose(&self) {
		if self.pending_clear.swap(false, Ordering::SeqCst) {
			debug!("clearing storage of an interrupted capture");
			self.clear_storage().await;
		}
	}
}
