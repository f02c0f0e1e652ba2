use std::process::ExitCode;
use std::time::Duration;

use abc_cli::app;
use abc_cli::cli::Cli;
use abc_cli::logging::init_tracing;
use clap::Parser;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(app::run(cli));
    // A prompt blocked on stdin must not hold the process open.
    runtime.shutdown_timeout(Duration::from_millis(250));
    code
}
