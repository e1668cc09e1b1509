use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Extra headers applied to navigations whose URL fully matches `pattern`.
///
/// Rules are evaluated in order and the first match wins. A `User-Agent`
/// entry (any case) also replaces the surface's user agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
	#[serde(alias = "urlPattern")]
	pub pattern: String,
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
}

impl HeaderRule {
	pub fn new(pattern: impl Into<String>) -> Self {
		Self {
			pattern: pattern.into(),
			headers: BTreeMap::new(),
		}
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}
}
