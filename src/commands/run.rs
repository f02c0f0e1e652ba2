use anyhow::{bail, Result};
use platform_api::endpoints;
use platform_api::events::read_session_id;
use platform_api::payload::CreateTaskRequest;
use serde_json::Value;

use crate::cli::{PageArgs, RunArgs, RunCommand, TaskIdArgs};
use crate::commands::args::{page_query, parse_positive_int, resolve_task_id};
use crate::context::CommandContext;

pub async fn execute(ctx: &mut CommandContext, args: RunArgs) -> Result<()> {
    if let Some(session_id) = args.session {
        ctx.active_session = Some(session_id);
    }
    match args.command {
        RunCommand::Submit {
            objective,
            session_id,
        } => submit(ctx, objective, session_id).await,
        RunCommand::Status(ids) => status(ctx, &ids).await,
        RunCommand::Events { ids, follow } => events(ctx, &ids, follow).await,
        RunCommand::Artifacts(ids) => artifacts(ctx, &ids).await,
        RunCommand::List(page) => list(ctx, &page).await,
        RunCommand::Cancel(ids) => cancel(ctx, &ids).await,
    }
}

/// Fail unless `body` names `expected` as its owning session.
pub fn assert_task_in_session(body: &Value, command: &str, expected: u64) -> Result<()> {
    let Some(actual) = read_session_id(body) else {
        bail!("run {command} response missing sessionId.");
    };
    if actual != expected {
        bail!(
            "Task belongs to session {actual}, but active session is {expected}. Run `session use {actual}` first."
        );
    }
    Ok(())
}

fn task_id(command: &str, ids: &TaskIdArgs, implied: Option<&str>) -> Result<u64> {
    resolve_task_id(
        command,
        ids.task_id.as_deref(),
        ids.task_id_flag.as_deref(),
        implied,
    )
}

async fn submit(
    ctx: &mut CommandContext,
    objective: Option<String>,
    session_id: Option<String>,
) -> Result<()> {
    let expected = ctx.require_active_session("submit")?;
    let Some(objective) = objective.filter(|objective| !objective.trim().is_empty()) else {
        bail!("run submit requires --objective <text>.");
    };
    let requested = match session_id.as_deref() {
        Some(raw) => parse_positive_int(raw, "sessionId")?,
        None => expected,
    };
    if requested != expected {
        bail!("run submit must use active session {expected}. Run `session use {requested}` first.");
    }

    let response = ctx
        .execute(endpoints::create_task(&CreateTaskRequest {
            message: objective,
            session_id: Some(requested),
        })?)
        .await?;
    if response.ok {
        assert_task_in_session(&response.body, "submit", expected)?;
    }
    Ok(())
}

async fn status(ctx: &CommandContext, ids: &TaskIdArgs) -> Result<()> {
    let expected = ctx.require_active_session("status")?;
    let task_id = task_id("status", ids, None)?;
    let response = ctx.execute(endpoints::get_task(task_id)).await?;
    if response.ok {
        assert_task_in_session(&response.body, "status", expected)?;
    }
    Ok(())
}

async fn artifacts(ctx: &CommandContext, ids: &TaskIdArgs) -> Result<()> {
    let expected = ctx.require_active_session("artifacts")?;
    let task_id = task_id("artifacts", ids, None)?;
    let probe = ctx.execute(endpoints::get_task(task_id)).await?;
    if !probe.ok {
        return Ok(());
    }
    assert_task_in_session(&probe.body, "artifacts", expected)?;
    ctx.execute(endpoints::get_task_artifacts(task_id)).await?;
    Ok(())
}

async fn list(ctx: &CommandContext, page: &PageArgs) -> Result<()> {
    ctx.require_active_session("list")?;
    ctx.execute(endpoints::list_tasks(&page_query(page)?)).await?;
    Ok(())
}

async fn cancel(ctx: &CommandContext, ids: &TaskIdArgs) -> Result<()> {
    let expected = ctx.require_active_session("cancel")?;
    let task_id = task_id("cancel", ids, None)?;
    let probe = ctx.execute(endpoints::get_task(task_id)).await?;
    if !probe.ok {
        return Ok(());
    }
    assert_task_in_session(&probe.body, "cancel", expected)?;
    ctx.execute(endpoints::cancel_task(task_id)).await?;
    Ok(())
}

/// `run events --follow`: check ownership once, then observe the stream
/// until it ends or the user stops it.
async fn events(
    ctx: &CommandContext,
    ids: &TaskIdArgs,
    follow: Option<Option<String>>,
) -> Result<()> {
    let expected = ctx.require_active_session("events")?;
    let Some(implied) = follow else {
        bail!("run events requires --follow <task_id>.");
    };
    let task_id = task_id("events", ids, implied.as_deref())?;

    let probe = ctx.execute(endpoints::get_task(task_id)).await?;
    if !probe.ok {
        return Ok(());
    }
    assert_task_in_session(&probe.body, "events", expected)?;

    let output = ctx.output.clone();
    output.info(format!("Observer mode started: run events --follow {task_id}"));
    output.info("Press Ctrl+C to stop observing.");
    let outcome = ctx
        .follows
        .run(&ctx.follower, task_id, Some(expected), |update| {
            output.follow_update(&update)
        })
        .await?;

    if outcome.is_success() {
        output.success(outcome.explanation());
    } else {
        output.error(outcome.explanation());
    }
    Ok(())
}
