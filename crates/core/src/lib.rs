//! Native side of the web-view bridge.
//!
//! Vendor web content running in a host web view drives two services over
//! JSON-RPC:
//!
//! - **OAuth capture** (`oauth`): opens an isolated browsing surface and
//!   returns the redirect URI that ends the authorization
//! - **BLE session** (`startScan`, `connectGATT`, `startNotifications`, ...):
//!   scans, connects, reads, writes, and streams characteristic values back
//!   as `deviceInfo` and `notify` events
//!
//! The host supplies the platform pieces as trait objects
//! ([`ScriptHost`](linkbridge_runtime::ScriptHost), [`CaptureSurface`],
//! [`BlePlatform`]) and owns a [`ConnectSession`] for as long as its web view
//! lives.
//!
//! # Example
//!
//! ```ignore
//! let session = ConnectSession::builder()
//!     .config(BridgeConfig::from_path("bridge.json")?)
//!     .web_view(web_view)
//!     .capture_surface(surface)
//!     .ble_platform(platform)
//!     .build()?;
//! session.start()?;
//! // ... when the view goes away:
//! session.dispose().await;
//! ```

pub mod ble;
pub mod config;
pub mod error;
pub mod logging;
pub mod oauth;
pub mod session;

pub use ble::{Availability, BleError, BlePeripheral, BlePlatform, BleService};
pub use config::{BridgeConfig, ConfigError};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use oauth::{AuthResponse, CaptureSurface, OAuthError, OAuthService, VehicleInfo};
pub use session::{ConnectSession, ConnectSessionBuilder};

pub use linkbridge_protocol as protocol;
pub use linkbridge_runtime as runtime;
