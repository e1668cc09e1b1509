//! Request decoding and outbound encoding.
//!
//! Decoding reads the `id` before anything else so that a request with bad
//! params still gets an error addressed to the right caller. Encoding
//! produces bare envelope JSON; [`dispatch_script`] wraps it for delivery
//! into the web content's event system.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::{ErrorEnvelope, EventEnvelope, RequestId, ResultEnvelope};
use crate::error_code::ErrorCode;
use crate::request::RpcRequest;
use crate::result::RpcResult;

/// A request that decoded cleanly, with its correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRequest<R> {
	pub id: Option<RequestId>,
	pub request: R,
}

/// Why an inbound message could not become a request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct DecodeError {
	/// The id, if it could be read before decoding failed.
	pub id: Option<RequestId>,
	pub kind: DecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
	#[error("Malformed request: {0}")]
	Malformed(String),
	#[error("Missing method")]
	MissingMethod,
	#[error("Method not found: {0}")]
	UnknownMethod(String),
	#[error("Invalid params for {method}: {reason}")]
	InvalidParams { method: String, reason: String },
}

impl DecodeError {
	fn new(id: Option<RequestId>, kind: DecodeErrorKind) -> Self {
		Self { id, kind }
	}

	pub fn error_code(&self) -> ErrorCode {
		match self.kind {
			DecodeErrorKind::UnknownMethod(_) => ErrorCode::MethodNotFound,
			_ => ErrorCode::Internal,
		}
	}

	pub fn code(&self) -> i32 {
		self.error_code().code()
	}

	pub fn message(&self) -> String {
		self.kind.to_string()
	}

	/// Error envelope answering the failed message.
	pub fn to_envelope(&self) -> ErrorEnvelope {
		ErrorEnvelope::new(self.id.clone(), self.code(), self.message())
	}
}

/// Decodes one inbound message into a request of the closed set `R`.
///
/// Missing or `null` params are treated as an empty object.
pub fn decode_request<R: RpcRequest>(text: &str) -> Result<DecodedRequest<R>, DecodeError> {
	let value: Value =
		serde_json::from_str(text).map_err(|e| DecodeError::new(None, DecodeErrorKind::Malformed(e.to_string())))?;

	let Value::Object(mut object) = value else {
		return Err(DecodeError::new(
			None,
			DecodeErrorKind::Malformed("expected a JSON object".to_string()),
		));
	};

	let id = read_id(&object);

	let method = match object.remove("method") {
		Some(Value::String(method)) => method,
		_ => return Err(DecodeError::new(id, DecodeErrorKind::MissingMethod)),
	};

	if !R::METHODS.contains(&method.as_str()) {
		return Err(DecodeError::new(id, DecodeErrorKind::UnknownMethod(method)));
	}

	let params = match object.remove("params") {
		None | Some(Value::Null) => Value::Object(Map::new()),
		Some(params) => params,
	};

	let mut tagged = Map::with_capacity(2);
	tagged.insert("method".to_string(), Value::String(method.clone()));
	tagged.insert("params".to_string(), params);

	let request = serde_json::from_value(Value::Object(tagged)).map_err(|e| {
		DecodeError::new(
			id.clone(),
			DecodeErrorKind::InvalidParams {
				method,
				reason: e.to_string(),
			},
		)
	})?;

	Ok(DecodedRequest { id, request })
}

/// Reads `id` without failing: anything other than a number or string counts
/// as absent.
fn read_id(object: &Map<String, Value>) -> Option<RequestId> {
	match object.get("id") {
		Some(Value::Number(n)) => Some(RequestId::Number(n.clone())),
		Some(Value::String(s)) => Some(RequestId::String(s.clone())),
		_ => None,
	}
}

pub fn encode_result(id: Option<RequestId>, result: RpcResult) -> String {
	to_json(&ResultEnvelope::new(id, result))
}

pub fn encode_error(id: Option<RequestId>, code: i32, message: impl Into<String>) -> String {
	to_json(&ErrorEnvelope::new(id, code, message))
}

pub fn encode_event<E: Serialize>(event: E) -> String {
	to_json(&EventEnvelope::new(event))
}

fn to_json<T: Serialize>(value: &T) -> String {
	serde_json::to_string(value).unwrap_or_else(|e| {
		format!(
			r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":{},"message":{}}}}}"#,
			ErrorCode::Internal.code(),
			Value::String(e.to_string())
		)
	})
}

/// Wraps envelope JSON in the script that raises `<channel>Response` in the
/// web content.
///
/// The JSON is embedded as a JS string literal and re-parsed on the page side,
/// so it cannot break out of the surrounding expression whatever it contains.
pub fn dispatch_script(channel: &str, json: &str) -> String {
	let escaped = Value::String(json.to_string())
		.to_string()
		.replace('\u{2028}', "\\u2028")
		.replace('\u{2029}', "\\u2029");
	format!("dispatchEvent(new CustomEvent('{channel}Response', {{ detail: JSON.parse({escaped}) }}))")
}
