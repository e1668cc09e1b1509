//! The contract a service implements to be served by a [`Dispatcher`].
//!
//! [`Dispatcher`]: crate::Dispatcher

use async_trait::async_trait;
use linkbridge_protocol::{ErrorCode, RpcRequest, RpcResult};
use thiserror::Error;

/// Failure returned by a request handler.
#[derive(Debug, Error)]
pub enum HandlerError {
	/// A failure the web content is expected to branch on.
	#[error("{message}")]
	Declared { code: i32, message: String },

	/// Anything else. Reported with the internal error code and its text.
	#[error(transparent)]
	Internal(#[from] anyhow::Error),
}

impl HandlerError {
	pub fn declared(code: ErrorCode, message: impl Into<String>) -> Self {
		HandlerError::Declared {
			code: code.code(),
			message: message.into(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		HandlerError::Internal(anyhow::anyhow!(message.into()))
	}

	pub fn code(&self) -> i32 {
		match self {
			HandlerError::Declared { code, .. } => *code,
			HandlerError::Internal(_) => ErrorCode::Internal.code(),
		}
	}

	/// Message sent to the web content.
	///
	/// Internal errors report their full context chain.
	pub fn message(&self) -> String {
		match self {
			HandlerError::Declared { message, .. } => message.clone(),
			HandlerError::Internal(err) => format!("{err:#}"),
		}
	}
}

/// A logical service multiplexed onto one channel.
///
/// The dispatcher runs every `handle` call in its own task, so several may
/// be in flight at once and must coordinate through the service's own state.
#[async_trait]
pub trait RpcService: Send + Sync + 'static {
	type Request: RpcRequest;

	/// Short name used in logs.
	fn name(&self) -> &'static str;

	async fn handle(&self, request: Self::Request) -> Result<RpcResult, HandlerError>;

	/// Releases every resource the service holds. Called once, after all
	/// in-flight handlers have been cancelled.
	async fn dispose(&self) {}
}
