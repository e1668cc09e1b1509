//! One connect flow: both services, bound to one hosting web view.
//!
//! The host creates a [`ConnectSession`] when its web view appears, calls
//! [`start`](ConnectSession::start), and awaits
//! [`dispose`](ConnectSession::dispose) when the view is torn down.

use std::sync::Arc;

use linkbridge_runtime::{Dispatcher, Outbound, ScriptHost, Transport, WebViewTransport};
use tracing::info;

use crate::ble::{BlePlatform, BleService};
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::oauth::{AuthResponse, CaptureSurface, OAuthService};

pub struct ConnectSession {
	config: BridgeConfig,
	oauth: Arc<Dispatcher<OAuthService>>,
	ble: Arc<Dispatcher<BleService>>,
}

#[derive(Default)]
pub struct ConnectSessionBuilder {
	config: BridgeConfig,
	oauth_transport: Option<Arc<dyn Transport>>,
	ble_transport: Option<Arc<dyn Transport>>,
	surface: Option<Arc<dyn CaptureSurface>>,
	platform: Option<Arc<dyn BlePlatform>>,
}

impl ConnectSessionBuilder {
	pub fn config(mut self, config: BridgeConfig) -> Self {
		self.config = config;
		self
	}

	pub fn oauth_transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.oauth_transport = Some(transport);
		self
	}

	pub fn ble_transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.ble_transport = Some(transport);
		self
	}

	/// Exposes both services on `host` under the configured channel names.
	pub fn web_view(self, host: Arc<dyn ScriptHost>) -> Self {
		let oauth = Arc::new(WebViewTransport::new(Arc::clone(&host), self.config.oauth_channel.clone()));
		let ble = Arc::new(WebViewTransport::new(host, self.config.ble_channel.clone()));
		self.oauth_transport(oauth).ble_transport(ble)
	}

	pub fn capture_surface(mut self, surface: Arc<dyn CaptureSurface>) -> Self {
		self.surface = Some(surface);
		self
	}

	pub fn ble_platform(mut self, platform: Arc<dyn BlePlatform>) -> Self {
		self.platform = Some(platform);
		self
	}

	/// Validates the config and wires both dispatchers to the current tokio
	/// runtime.
	pub fn build(self) -> Result<ConnectSession> {
		self.config.validate()?;

		let oauth_transport = self.oauth_transport.ok_or(Error::MissingComponent("OAuth transport"))?;
		let ble_transport = self.ble_transport.ok_or(Error::MissingComponent("BLE transport"))?;
		let surface = self.surface.ok_or(Error::MissingComponent("capture surface"))?;
		let platform = self.platform.ok_or(Error::MissingComponent("BLE platform"))?;

		let oauth_outbound = Outbound::new(oauth_transport);
		let oauth_service = OAuthService::new(surface).with_allowed_host(self.config.allowed_host.clone());
		let oauth = Dispatcher::new(oauth_outbound, Arc::new(oauth_service))?;

		let ble_outbound = Outbound::new(ble_transport);
		let ble_service = BleService::new(platform, ble_outbound.clone(), self.config.max_mtu);
		let ble = Dispatcher::new(ble_outbound, Arc::new(ble_service))?;

		Ok(ConnectSession {
			config: self.config,
			oauth,
			ble,
		})
	}
}

impl ConnectSession {
	pub fn builder() -> ConnectSessionBuilder {
		ConnectSessionBuilder::default()
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	pub fn oauth(&self) -> &Arc<Dispatcher<OAuthService>> {
		&self.oauth
	}

	pub fn ble(&self) -> &Arc<Dispatcher<BleService>> {
		&self.ble
	}

	/// Starts listening on both channels.
	pub fn start(&self) -> Result<()> {
		self.oauth.start()?;
		self.ble.start()?;
		info!(
			oauth_channel = %self.config.oauth_channel,
			ble_channel = %self.config.ble_channel,
			"connect session started"
		);
		Ok(())
	}

	/// Disposes both services. Nothing reaches the web content afterwards.
	pub async fn dispose(&self) {
		futures::join!(self.oauth.dispose(), self.ble.dispose());
		info!("connect session disposed");
	}

	/// Parses a redirect the host received for the configured redirect URI.
	///
	/// `None` when no redirect URI is configured or `uri` is not a redirect to
	/// it.
	pub fn receive_redirect(&self, uri: &str) -> Option<AuthResponse> {
		let redirect_uri = self.config.redirect_uri.as_deref()?;
		AuthResponse::from_redirect_uri(redirect_uri, uri)
	}
}
