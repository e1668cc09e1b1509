//! Error types for the bridge runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the dispatcher lifecycle.
///
/// Request-level failures never surface here: they become error envelopes.
#[derive(Debug, Error)]
pub enum Error {
	/// `start` was called on a dispatcher that is already listening.
	#[error("Dispatcher for {0} is already started")]
	AlreadyStarted(&'static str),

	/// The dispatcher was used after `dispose`.
	#[error("Dispatcher for {0} has been disposed")]
	Disposed(&'static str),

	/// No tokio runtime was available to run handler tasks on.
	#[error("No tokio runtime available: {0}")]
	NoRuntime(String),
}
