//! Per-navigation decisions for the capture surface.
//!
//! The surface asks [`NavigationPolicy::decide`] before following every
//! navigation and acts on the answer. Checks run in a fixed order: the
//! intercept prefix first, then the allowed host, then header rules.

use std::collections::BTreeMap;

use linkbridge_protocol::HeaderRule;
use regex::Regex;
use url::Url;

use super::error::OAuthError;

/// Header rules compiled for full-URL matching.
#[derive(Debug, Clone, Default)]
pub struct HeaderRules {
	rules: Vec<(Regex, BTreeMap<String, String>)>,
}

impl HeaderRules {
	/// Compiles `rules` in order. Each pattern must match the whole URL.
	pub fn compile(rules: &[HeaderRule]) -> Result<Self, OAuthError> {
		let rules = rules
			.iter()
			.map(|rule| {
				let regex = Regex::new(&format!("^(?:{})$", rule.pattern)).map_err(|e| OAuthError::InvalidPattern {
					pattern: rule.pattern.clone(),
					reason: e.to_string(),
				})?;
				Ok((regex, rule.headers.clone()))
			})
			.collect::<Result<Vec<_>, OAuthError>>()?;
		Ok(Self { rules })
	}

	/// Headers of the first rule matching `url`.
	pub fn headers_for(&self, url: &str) -> Option<&BTreeMap<String, String>> {
		self.rules
			.iter()
			.find(|(regex, _)| regex.is_match(url))
			.map(|(_, headers)| headers)
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}

/// `User-Agent` value from a header map, matched case-insensitively.
pub fn user_agent(headers: &BTreeMap<String, String>) -> Option<&str> {
	headers
		.iter()
		.find(|(name, _)| name.eq_ignore_ascii_case("User-Agent"))
		.map(|(_, value)| value.as_str())
}

/// A page load with its extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
	pub url: String,
	pub headers: BTreeMap<String, String>,
	/// Replacement user agent for the surface, if a rule sets one.
	pub user_agent: Option<String>,
}

impl LoadRequest {
	fn new(url: &str, headers: BTreeMap<String, String>) -> Self {
		let user_agent = user_agent(&headers).map(str::to_string);
		Self {
			url: url.to_string(),
			headers,
			user_agent,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
	/// End the capture with this URL as the result.
	Intercept(String),
	/// Leave the surface and hand the URL to the system browser.
	OpenExternally(String),
	/// Cancel the navigation and reload with headers.
	LoadWithHeaders(LoadRequest),
	/// Let the surface follow the navigation unchanged.
	Continue,
}

/// Navigation rules for one capture.
#[derive(Debug, Clone)]
pub struct NavigationPolicy {
	intercept_prefix: String,
	allowed_host: Option<String>,
	rules: HeaderRules,
}

impl NavigationPolicy {
	/// An empty `intercept_prefix` disables interception.
	pub fn new(intercept_prefix: impl Into<String>, allowed_host: Option<String>, rules: HeaderRules) -> Self {
		Self {
			intercept_prefix: intercept_prefix.into(),
			allowed_host,
			rules,
		}
	}

	pub fn intercept_prefix(&self) -> &str {
		&self.intercept_prefix
	}

	pub fn allowed_host(&self) -> Option<&str> {
		self.allowed_host.as_deref()
	}

	pub fn decide(&self, url: &str) -> NavigationAction {
		if !self.intercept_prefix.is_empty() && url.starts_with(&self.intercept_prefix) {
			return NavigationAction::Intercept(url.to_string());
		}

		if let Some(allowed) = &self.allowed_host {
			let host = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string));
			if host.as_deref() != Some(allowed.as_str()) {
				return NavigationAction::OpenExternally(url.to_string());
			}
		}

		match self.rules.headers_for(url) {
			Some(headers) if !headers.is_empty() => NavigationAction::LoadWithHeaders(LoadRequest::new(url, headers.clone())),
			_ => NavigationAction::Continue,
		}
	}

	/// The first load of a capture, with headers from the first matching rule.
	pub fn initial_load(&self, url: &str) -> LoadRequest {
		let headers = self.rules.headers_for(url).cloned().unwrap_or_default();
		LoadRequest::new(url, headers)
	}
}
