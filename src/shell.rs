//! Interactive mode: one command per line, the active session kept between
//! lines, and the two-step login prompt.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::Command;
use crate::commands;
use crate::context::CommandContext;
use crate::terminal::EchoGuard;

const PROMPT: &str = "abc> ";

#[derive(Parser, Debug)]
#[command(name = "abc-cli", no_binary_name = true, disable_version_flag = true)]
struct ShellInput {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Api(Command),
    /// Leave the shell.
    #[command(alias = "quit")]
    Exit,
}

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellLine {
    Empty,
    Exit,
    Command(Command),
    /// Help text requested with `--help` or `help`.
    Help(String),
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

/// Parse a shell line. A leading `/` is accepted, and `/mcp` and `/sessions`
/// list servers and sessions.
pub fn parse_shell_line(line: &str) -> ShellLine {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return ShellLine::Empty;
    }
    let expanded = match trimmed {
        "mcp" => "mcp list",
        "sessions" => "session list",
        other => other,
    };

    let tokens = match shell_words::split(expanded) {
        Ok(tokens) => tokens,
        Err(error) => return ShellLine::Invalid(format!("Could not parse input: {error}.")),
    };
    match ShellInput::try_parse_from(tokens) {
        Ok(ShellInput {
            command: ShellCommand::Exit,
        }) => ShellLine::Exit,
        Ok(ShellInput {
            command: ShellCommand::Api(command),
        }) => ShellLine::Command(command),
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                ShellLine::Help(error.render().to_string())
            }
            _ => ShellLine::Invalid(error.render().to_string().trim_end().to_string()),
        },
    }
}

/// Handle one line of input.
pub async fn handle_line(ctx: &mut CommandContext, line: &str) -> ShellFlow {
    if ctx.login.is_awaiting_input() {
        if matches!(line.trim(), "/exit" | "exit") {
            return ShellFlow::Exit;
        }
        if let Err(error) = commands::auth::consume_login_input(ctx, line).await {
            ctx.output.error(format!("{error:#}"));
        }
        return ShellFlow::Continue;
    }

    match parse_shell_line(line) {
        ShellLine::Empty => {}
        ShellLine::Exit => return ShellFlow::Exit,
        ShellLine::Help(text) => ctx.output.info(text.trim_end().to_string()),
        ShellLine::Invalid(message) => ctx.output.error(message),
        ShellLine::Command(command) => {
            if let Err(error) = commands::execute(ctx, command).await {
                ctx.output.error(format!("{error:#}"));
            }
        }
    }
    ShellFlow::Continue
}

/// Read lines from stdin until `exit`, end of input, or `shutdown`.
pub async fn run(ctx: &mut CommandContext, shutdown: CancellationToken) -> Result<()> {
    ctx.interactive = true;
    ctx.output
        .info("abc-cli interactive shell. Type `help` for commands, `exit` to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match ctx.login.hint() {
            Some(hint) => ctx.output.prompt(&format!("{hint}: ")),
            None => ctx.output.prompt(PROMPT),
        }

        let echo = ctx.login.is_password_input().then(EchoGuard::disable);
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        drop(echo);

        let Some(line) = line else {
            break;
        };
        if handle_line(ctx, &line).await == ShellFlow::Exit {
            break;
        }
    }

    ctx.login.cancel();
    ctx.output.info("Exiting abc-cli...");
    Ok(())
}
