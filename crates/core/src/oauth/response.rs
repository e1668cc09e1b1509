//! Parsing of the authorization redirect that ends a connect flow.

use std::collections::HashMap;

use serde::Serialize;
use url::Url;

const MISSING_CODE: &str = "Unable to fetch code. Please try again";

/// Vehicle reported alongside an authorization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleInfo {
	pub vin: Option<String>,
	pub make: Option<String>,
}

/// Outcome of an authorization redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
	pub code: Option<String>,
	pub error: Option<String>,
	pub error_description: Option<String>,
	pub state: Option<String>,
	pub vehicle: Option<VehicleInfo>,
	pub virtual_key_url: Option<String>,
}

impl AuthResponse {
	/// Parses `uri` if it is a redirect to `redirect_uri`.
	///
	/// A `code` wins over everything else. An `error` carries vehicle info
	/// only when a `vin` came with it. With neither, the response has only a
	/// fixed description and the state.
	pub fn from_redirect_uri(redirect_uri: &str, uri: &str) -> Option<Self> {
		if !uri.starts_with(redirect_uri) {
			return None;
		}

		let mut query = query_params(uri);
		let state = query.remove("state");
		let error_description = query.remove("error_description");

		if let Some(code) = query.remove("code") {
			return Some(AuthResponse {
				code: Some(code),
				error_description,
				state,
				virtual_key_url: query.remove("virtual_key_url"),
				..Default::default()
			});
		}

		if let Some(error) = query.remove("error") {
			let vehicle = query.remove("vin").map(|vin| VehicleInfo {
				vin: Some(vin),
				make: query.remove("make"),
			});
			return Some(AuthResponse {
				error: Some(error),
				error_description,
				state,
				vehicle,
				..Default::default()
			});
		}

		Some(AuthResponse {
			error_description: Some(MISSING_CODE.to_string()),
			state,
			..Default::default()
		})
	}

	pub fn is_success(&self) -> bool {
		self.code.is_some()
	}
}

/// First value of each query parameter.
fn query_params(uri: &str) -> HashMap<String, String> {
	let mut params = HashMap::new();
	if let Ok(url) = Url::parse(uri) {
		for (key, value) in url.query_pairs() {
			params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
		}
	}
	params
}
