//! OAuth capture service.

pub mod error;
pub mod navigation;
pub mod response;
pub mod service;

pub use error::OAuthError;
pub use navigation::{HeaderRules, LoadRequest, NavigationAction, NavigationPolicy};
pub use response::{AuthResponse, VehicleInfo};
pub use service::{CaptureSurface, OAuthService};
