//! Diagnostic logging. Command output goes to stdout; tracing writes to
//! stderr and stays quiet unless `RUST_LOG` asks for more.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
