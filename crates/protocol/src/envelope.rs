//! JSON-RPC envelope types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
	JSONRPC_VERSION.to_string()
}

/// Correlation id echoed from a request into its response.
///
/// The web content chooses the id; native code never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	Number(serde_json::Number),
	String(String),
}

impl From<i64> for RequestId {
	fn from(value: i64) -> Self {
		RequestId::Number(value.into())
	}
}

impl From<&str> for RequestId {
	fn from(value: &str) -> Self {
		RequestId::String(value.to_string())
	}
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RequestId::Number(n) => write!(f, "{n}"),
			RequestId::String(s) => write!(f, "{s:?}"),
		}
	}
}

/// Successful response to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
	#[serde(default = "default_version")]
	pub jsonrpc: String,
	/// Echo of the request id. Serialized as `null` when the request had none.
	pub id: Option<RequestId>,
	pub result: T,
}

impl<T> ResultEnvelope<T> {
	pub fn new(id: Option<RequestId>, result: T) -> Self {
		Self {
			jsonrpc: default_version(),
			id,
			result,
		}
	}
}

/// Failed response to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
	#[serde(default = "default_version")]
	pub jsonrpc: String,
	/// Echo of the request id, `null` when the id could not be read.
	pub id: Option<RequestId>,
	pub error: ErrorObject,
}

impl ErrorEnvelope {
	pub fn new(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
		Self {
			jsonrpc: default_version(),
			id,
			error: ErrorObject {
				code,
				message: message.into(),
			},
		}
	}
}

/// Fixed `{code, message}` error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
	pub code: i32,
	pub message: String,
}

/// Unsolicited push from native code. Has a `method` and no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
	#[serde(default = "default_version")]
	pub jsonrpc: String,
	#[serde(flatten)]
	pub event: E,
}

impl<E> EventEnvelope<E> {
	pub fn new(event: E) -> Self {
		Self {
			jsonrpc: default_version(),
			event,
		}
	}
}
