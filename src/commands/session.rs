use anyhow::Result;
use platform_api::endpoints;
use platform_api::events::read_session_id;

use crate::cli::{SessionCommand, SessionIdArgs};
use crate::commands::args::{page_query, resolve_numeric_id};
use crate::context::CommandContext;

pub async fn execute(ctx: &mut CommandContext, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Create { title } => {
            let response = ctx
                .execute(endpoints::create_session(title.as_deref())?)
                .await?;
            if response.ok {
                if let Some(session_id) = read_session_id(&response.body) {
                    ctx.active_session = Some(session_id);
                    ctx.output.success(format!("Switched to session {session_id}."));
                }
            }
        }
        SessionCommand::List(page) => {
            ctx.execute(endpoints::list_sessions(&page_query(&page)?))
                .await?;
        }
        SessionCommand::Get(ids) => {
            ctx.execute(endpoints::get_session(session_id(&ids)?))
                .await?;
        }
        SessionCommand::Use(ids) => {
            let session_id = session_id(&ids)?;
            let response = ctx.execute(endpoints::get_session(session_id)).await?;
            if response.ok {
                ctx.active_session = Some(session_id);
                ctx.output.success(format!("Active session set to {session_id}."));
            }
        }
        SessionCommand::Current => match ctx.active_session {
            Some(session_id) => {
                ctx.execute(endpoints::get_session(session_id)).await?;
            }
            None => ctx
                .output
                .info("No active session. Use `session create` or `session use <id>`."),
        },
        SessionCommand::Leave => {
            ctx.active_session = None;
            ctx.output.success("Left current session.");
        }
    }
    Ok(())
}

fn session_id(ids: &SessionIdArgs) -> Result<u64> {
    resolve_numeric_id("sessionId", ids.id.as_deref(), ids.id_flag.as_deref(), "session-id")
}
