//! Error types for session setup.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Runtime(#[from] linkbridge_runtime::Error),

	/// The session builder was not given a required collaborator.
	#[error("Connect session is missing its {0}")]
	MissingComponent(&'static str),
}
