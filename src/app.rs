use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use task_follow::FollowController;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::commands;
use crate::config::AppConfig;
use crate::context::CommandContext;
use crate::output::Output;
use crate::shell;

/// Exit status after an interrupt.
const INTERRUPTED: u8 = 130;

pub async fn run(cli: Cli) -> ExitCode {
    let output = Output::stdio();
    match run_inner(cli, output.clone()).await {
        Ok(code) => code,
        Err(error) => {
            output.error(format!("error: {error:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run_inner(cli: Cli, output: Output) -> Result<ExitCode> {
    let config = AppConfig::from_cli(&cli);
    let mut ctx = CommandContext::bootstrap(&config, output.clone())?;
    // Restore problems are reported but do not fail the command.
    output.reset_error();

    let shutdown = CancellationToken::new();
    spawn_interrupt_handler(Arc::clone(&ctx.follows), output.clone(), shutdown.clone());

    match cli.command {
        None | Some(Command::Shell) => {
            shell::run(&mut ctx, shutdown).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(command) => {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    output.error("Interrupted.");
                    return Ok(ExitCode::from(INTERRUPTED));
                }
                result = commands::execute(&mut ctx, command) => result,
            };
            result?;
            Ok(if output.had_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

/// Ctrl+C stops an active follow; otherwise it requests shutdown.
fn spawn_interrupt_handler(follows: Arc<FollowController>, output: Output, shutdown: CancellationToken) {
    tokio::spawn(async move {
        loop {
            if let Err(error) = tokio::signal::ctrl_c().await {
                debug!(%error, "could not listen for ctrl-c");
                return;
            }
            if follows.stop_active() {
                output.info("Stopping observer mode...");
                continue;
            }
            shutdown.cancel();
            return;
        }
    });
}
