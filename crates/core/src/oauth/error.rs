use linkbridge_protocol::ErrorCode;
use linkbridge_runtime::HandlerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
	/// The surface closed without reaching the intercept prefix.
	#[error("OAuth capture cancelled")]
	Cancelled,

	#[error("Invalid header pattern '{pattern}': {reason}")]
	InvalidPattern { pattern: String, reason: String },

	#[error(transparent)]
	Surface(#[from] anyhow::Error),
}

impl From<OAuthError> for HandlerError {
	fn from(err: OAuthError) -> Self {
		match err {
			OAuthError::Cancelled => HandlerError::declared(ErrorCode::OAuthCancelled, err.to_string()),
			OAuthError::InvalidPattern { .. } => HandlerError::declared(ErrorCode::InvalidParams, err.to_string()),
			OAuthError::Surface(e) => HandlerError::Internal(e),
		}
	}
}
