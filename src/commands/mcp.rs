use anyhow::{anyhow, bail, Result};
use platform_api::endpoints;
use platform_api::payload::{CreateMcpRequest, McpAuthType, StartMcpAuthRequest, UpdateMcpRequest};
use serde_json::{Map, Value};

use crate::cli::{IdArgs, McpAddArgs, McpAuthCommand, McpAuthStartArgs, McpCommand, McpUpdateArgs};
use crate::commands::args::{parse_json_option, parse_positive_int, resolve_numeric_id};
use crate::context::CommandContext;

const MCP_ID_LABEL: &str = "mcp id";
const REQUIRED_ADD_FIELDS: [&str; 6] = ["serverCode", "version", "name", "endpoint", "authType", "authConfig"];

pub async fn execute(ctx: &CommandContext, command: McpCommand) -> Result<()> {
    match command {
        McpCommand::Add(args) => add(ctx, args).await,
        McpCommand::List {
            server_code,
            status,
        } => {
            ctx.execute(endpoints::list_mcp(server_code.as_deref(), status.as_deref()))
                .await?;
            Ok(())
        }
        McpCommand::Get(ids) => {
            ctx.execute(endpoints::get_mcp(mcp_id(&ids)?)).await?;
            Ok(())
        }
        McpCommand::Update(args) => update(ctx, args).await,
        McpCommand::Delete(ids) => {
            ctx.execute(endpoints::delete_mcp(mcp_id(&ids)?)).await?;
            Ok(())
        }
        McpCommand::Sync(ids) => {
            ctx.execute(endpoints::sync_mcp(mcp_id(&ids)?)).await?;
            Ok(())
        }
        McpCommand::Capabilities(ids) => {
            ctx.execute(endpoints::list_capabilities(mcp_id(&ids)?)).await?;
            Ok(())
        }
        McpCommand::Auth { command } => auth(ctx, command).await,
    }
}

fn mcp_id(ids: &IdArgs) -> Result<u64> {
    resolve_numeric_id(MCP_ID_LABEL, ids.id.as_deref(), ids.id_flag.as_deref(), "id")
}

fn parse_auth_type(raw: &str, command: &str) -> Result<McpAuthType> {
    raw.parse::<McpAuthType>().map_err(|_| {
        let names = McpAuthType::ALL.map(|auth_type| auth_type.as_str()).join("|");
        anyhow!("mcp {command} --auth-type must be one of {names}.")
    })
}

fn json_object(raw: &str, option_name: &str) -> Result<Map<String, Value>> {
    match parse_json_option(Some(raw), option_name)? {
        Some(Value::Object(map)) => Ok(map),
        _ => bail!("{option_name} must be a JSON object."),
    }
}

async fn add(ctx: &CommandContext, args: McpAddArgs) -> Result<()> {
    if let Some(raw) = args.payload_json.as_deref() {
        let has_conflict = args.server_code.is_some()
            || args.url.is_some()
            || args.version.is_some()
            || args.name.is_some()
            || args.description.is_some()
            || args.auth_type.is_some()
            || args.auth_config_json.is_some();
        if has_conflict {
            bail!("mcp add --payload-json cannot be used with other add options.");
        }
        let payload = json_object(raw, "--payload-json")?;
        if let Some(field) = REQUIRED_ADD_FIELDS
            .iter()
            .find(|field| !payload.contains_key(**field))
        {
            bail!("mcp add --payload-json missing required field '{field}'.");
        }
        ctx.execute(endpoints::create_mcp_raw(Value::Object(payload)))
            .await?;
        return Ok(());
    }

    let (Some(server_code), Some(endpoint), Some(version)) = (args.server_code, args.url, args.version)
    else {
        bail!("mcp add requires --server-code <code> --url <endpoint> --version <v>.");
    };
    let auth_type = parse_auth_type(args.auth_type.as_deref().unwrap_or("NONE"), "add")?;
    let auth_config = parse_json_option(args.auth_config_json.as_deref(), "--auth-config-json")?
        .unwrap_or_else(|| Value::Object(Map::new()));

    let request = endpoints::create_mcp(&CreateMcpRequest {
        name: args.name.unwrap_or_else(|| server_code.clone()),
        server_code,
        version,
        description: args.description,
        endpoint,
        auth_type,
        auth_config,
    })?;
    ctx.execute(request).await?;
    Ok(())
}

async fn update(ctx: &CommandContext, args: McpUpdateArgs) -> Result<()> {
    let id = mcp_id(&args.ids)?;
    let payload = UpdateMcpRequest {
        name: args.name,
        description: args.description,
        endpoint: args.url,
        auth_type: args
            .auth_type
            .as_deref()
            .map(|raw| parse_auth_type(raw, "update"))
            .transpose()?,
        auth_config: parse_json_option(args.auth_config_json.as_deref(), "--auth-config-json")?,
    };
    if payload.is_empty() {
        bail!("mcp update requires at least one field to update.");
    }
    ctx.execute(endpoints::update_mcp(id, &payload)?).await?;
    Ok(())
}

async fn auth(ctx: &CommandContext, command: McpAuthCommand) -> Result<()> {
    match command {
        McpAuthCommand::Start(args) => auth_start(ctx, args).await,
        McpAuthCommand::Status(ids) => {
            ctx.execute(endpoints::get_mcp_auth_status(mcp_id(&ids)?))
                .await?;
            Ok(())
        }
        McpAuthCommand::Delete { ids, connection_id } => {
            let id = mcp_id(&ids)?;
            let connection_id = connection_id
                .as_deref()
                .map(|raw| parse_positive_int(raw, "connectionId"))
                .transpose()?;
            ctx.execute(endpoints::delete_mcp_auth(id, connection_id))
                .await?;
            Ok(())
        }
    }
}

/// Start MCP auth and, when the server reports success, sync capabilities.
async fn auth_start(ctx: &CommandContext, args: McpAuthStartArgs) -> Result<()> {
    let id = mcp_id(&args.ids)?;
    let request = match args.payload_json.as_deref() {
        Some(raw) => {
            let has_conflict = args.connection_name.is_some()
                || args.return_url.is_some()
                || args.credentials_json.is_some();
            if has_conflict {
                bail!("mcp auth start --payload-json cannot be used with other auth start options.");
            }
            endpoints::start_mcp_auth_raw(id, Value::Object(json_object(raw, "--payload-json")?))
        }
        None => endpoints::start_mcp_auth(
            id,
            &StartMcpAuthRequest {
                connection_name: args.connection_name,
                return_url: args.return_url,
                credentials: parse_json_option(args.credentials_json.as_deref(), "--credentials-json")?,
            },
        )?,
    };

    let response = ctx.execute(request).await?;
    let succeeded = response.body.get("success").and_then(Value::as_bool) == Some(true);
    if response.ok && succeeded {
        ctx.output.info("MCP auth succeeded. Triggering capability sync...");
        ctx.execute(endpoints::sync_mcp(id)).await?;
    }
    Ok(())
}
