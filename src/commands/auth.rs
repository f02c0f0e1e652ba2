use anyhow::{anyhow, bail, Context as _, Result};
use platform_auth::{LoginFlow, LoginInput, LoginOutcome};
use serde_json::json;

use crate::cli::LoginArgs;
use crate::context::CommandContext;
use crate::output::OutputLevel;
use crate::terminal::EchoGuard;

pub const MANUAL_REFRESH_REASON: &str = "Manual auth refresh requested.";

/// `login`. The shell switches into its two-step prompt unless both values
/// were given; one-shot mode prompts on the terminal for whatever is missing.
pub async fn login(ctx: &mut CommandContext, args: LoginArgs) -> Result<()> {
    if ctx.interactive && (args.username.is_none() || args.password.is_none()) {
        start_interactive_login(ctx);
        return Ok(());
    }

    let mut flow = LoginFlow::new();
    flow.start();

    let username = match args.username {
        Some(username) => username,
        None => read_line("Username: ", false).await?,
    };
    if let LoginInput::Rejected(message) = flow.consume(&username) {
        bail!(message);
    }

    let password = match args.password {
        Some(password) => password,
        None => read_line("Password: ", true).await?,
    };
    match flow.consume(&password) {
        LoginInput::Submit { username, password } => submit_login(ctx, &username, &password).await,
        LoginInput::Rejected(message) | LoginInput::Reset(message) => bail!(message),
        LoginInput::NotActive | LoginInput::UsernameAccepted => {
            bail!("Login state mismatch. Run login again.")
        }
    }
}

pub fn start_interactive_login(ctx: &mut CommandContext) {
    ctx.login.start();
    ctx.output.info("Login started. Enter username.");
}

/// Feed one shell line to the pending login prompt.
pub async fn consume_login_input(ctx: &mut CommandContext, line: &str) -> Result<()> {
    match ctx.login.consume(line) {
        LoginInput::NotActive => Ok(()),
        LoginInput::Rejected(message) | LoginInput::Reset(message) => {
            ctx.output.error(message);
            Ok(())
        }
        LoginInput::UsernameAccepted => {
            ctx.output.info("Enter password (masked).");
            Ok(())
        }
        LoginInput::Submit { username, password } => {
            submit_login(ctx, &username, &password).await
        }
    }
}

pub async fn submit_login(ctx: &mut CommandContext, username: &str, password: &str) -> Result<()> {
    match ctx.auth.login(username, password).await? {
        LoginOutcome::Succeeded { .. } => {}
        // The rejecting response has already been printed.
        LoginOutcome::Rejected(_) => {}
        LoginOutcome::MissingAccessCredential(_) => {
            ctx.output.error("Login response missing access_token.");
        }
    }
    Ok(())
}

pub fn logout(ctx: &mut CommandContext) {
    ctx.auth.logout();
    ctx.active_session = None;
}

pub fn whoami(ctx: &CommandContext) {
    let state = ctx.auth.snapshot();
    ctx.output.json(
        OutputLevel::Info,
        &json!({
            "authenticated": state.access_credential.is_some(),
            "username": state.username,
            "hasRefreshToken": state.refresh_credential.is_some(),
            "activeSessionId": ctx.active_session,
            "theme": ctx.theme.as_str(),
        }),
    );
}

/// `auth refresh`. A missing refresh credential keeps the session.
pub async fn refresh(ctx: &CommandContext) -> Result<()> {
    ctx.auth.refresh(MANUAL_REFRESH_REASON, false).await?;
    Ok(())
}

/// Read one line from the terminal. The echo guard is owned by this future,
/// not the blocking reader, and is restored when the future is dropped.
async fn read_line(prompt: &'static str, masked: bool) -> Result<String> {
    let _guard = masked.then(EchoGuard::disable);
    tokio::task::spawn_blocking(move || -> Result<String> {
        use std::io::{BufRead, Write};

        let mut stderr = std::io::stderr();
        write!(stderr, "{prompt}")?;
        stderr.flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(anyhow!("Login cancelled: no input."));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    })
    .await
    .context("login prompt task failed")?
}
