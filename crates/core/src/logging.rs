use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs a compact stderr subscriber.
///
/// `RUST_LOG` wins when set. Returns `false` if a global subscriber was
/// already installed, which hosts embedding the bridge may well have done.
pub fn init_logging(verbosity: u8) -> bool {
	// 0 = errors only
	// 1 = info for the bridge crates
	// 2+ = debug, including every envelope
	let filter = match verbosity {
		0 => "error",
		1 => "warn,linkbridge=info,linkbridge_runtime=info",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.try_init()
		.is_ok()
}
