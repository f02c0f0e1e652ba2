//! Command handlers. Each handler validates its arguments, issues requests
//! through the auth orchestrator, and reports through the context output.
//! Responses are printed by the auth sink as they arrive.

pub mod args;
pub mod auth;
pub mod mcp;
pub mod run;
pub mod session;
pub mod theme;

use anyhow::{bail, Result};

use crate::cli::{AuthCommand, Command};
use crate::context::CommandContext;

pub async fn execute(ctx: &mut CommandContext, command: Command) -> Result<()> {
    match command {
        Command::Login(args) => auth::login(ctx, args).await,
        Command::Logout => {
            auth::logout(ctx);
            Ok(())
        }
        Command::Whoami => {
            auth::whoami(ctx);
            Ok(())
        }
        Command::Auth {
            command: AuthCommand::Refresh,
        } => auth::refresh(ctx).await,
        Command::Mcp { command } => mcp::execute(ctx, command).await,
        Command::Session { command } => session::execute(ctx, command).await,
        Command::Run(args) => run::execute(ctx, args).await,
        Command::Theme { command } => theme::execute(ctx, command),
        Command::Shell => bail!("Already in the interactive shell."),
    }
}
