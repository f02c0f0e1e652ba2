//! Command-line surface. The interactive shell parses each input line with
//! the same definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Client for the task-execution platform.
#[derive(Parser, Debug, Clone)]
#[command(name = "abc-cli", version, about)]
pub struct Cli {
    /// Versioned API base URL.
    #[arg(long, env = "ABC_API_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Whole-request timeout for REST calls. Event streams are not bounded.
    #[arg(long, env = "ABC_API_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Directory holding the stored session and preferences.
    #[arg(long, env = "ABC_CLI_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Defaults to the interactive shell.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in. Prompts for anything not given.
    Login(LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Show who is signed in and the active session.
    Whoami,
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Manage MCP servers.
    Mcp {
        #[command(subcommand)]
        command: McpCommand,
    },
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Submit and observe tasks in the active session.
    Run(RunArgs),
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },
    /// Interactive mode.
    Shell,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginArgs {
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long, env = "ABC_CLI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AuthCommand {
    /// Exchange the refresh token for a new access token.
    Refresh,
}

/// An id given positionally or with `--id`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: Option<String>,
    #[arg(long = "id", value_name = "ID")]
    pub id_flag: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageArgs {
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub page: Option<String>,
    #[arg(long)]
    pub size: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum McpCommand {
    Add(McpAddArgs),
    List {
        #[arg(long)]
        server_code: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Get(IdArgs),
    Update(McpUpdateArgs),
    Delete(IdArgs),
    Sync(IdArgs),
    Capabilities(IdArgs),
    Auth {
        #[command(subcommand)]
        command: McpAuthCommand,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct McpAddArgs {
    #[arg(long)]
    pub server_code: Option<String>,
    /// Server endpoint URL.
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub version: Option<String>,
    /// Defaults to the server code.
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// NONE, API_KEY, BASIC, OAUTH2, JWT or CUSTOM.
    #[arg(long)]
    pub auth_type: Option<String>,
    #[arg(long)]
    pub auth_config_json: Option<String>,
    /// Complete request body. Excludes every other option.
    #[arg(long)]
    pub payload_json: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct McpUpdateArgs {
    #[command(flatten)]
    pub ids: IdArgs,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub auth_type: Option<String>,
    #[arg(long)]
    pub auth_config_json: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum McpAuthCommand {
    Start(McpAuthStartArgs),
    Status(IdArgs),
    Delete {
        #[command(flatten)]
        ids: IdArgs,
        #[arg(long)]
        connection_id: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct McpAuthStartArgs {
    #[command(flatten)]
    pub ids: IdArgs,
    #[arg(long)]
    pub connection_name: Option<String>,
    #[arg(long)]
    pub return_url: Option<String>,
    #[arg(long)]
    pub credentials_json: Option<String>,
    /// Complete request body. Excludes every other option.
    #[arg(long)]
    pub payload_json: Option<String>,
}

/// A session id given positionally or with `--session-id`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIdArgs {
    #[arg(value_name = "SESSION_ID")]
    pub id: Option<String>,
    #[arg(long = "session-id", value_name = "SESSION_ID")]
    pub id_flag: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Create a session and make it active.
    Create {
        #[arg(long)]
        title: Option<String>,
    },
    List(PageArgs),
    Get(SessionIdArgs),
    /// Make an existing session active.
    Use(SessionIdArgs),
    Current,
    Leave,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Active session for this invocation.
    #[arg(long = "session", value_name = "SESSION_ID")]
    pub session: Option<u64>,
    #[command(subcommand)]
    pub command: RunCommand,
}

/// A task id given positionally or with `--task-id`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskIdArgs {
    #[arg(value_name = "TASK_ID")]
    pub task_id: Option<String>,
    #[arg(long = "task-id", value_name = "TASK_ID")]
    pub task_id_flag: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RunCommand {
    Submit {
        #[arg(long)]
        objective: Option<String>,
        /// Must match the active session.
        #[arg(long)]
        session_id: Option<String>,
    },
    Status(TaskIdArgs),
    /// Observe the task event stream.
    Events {
        #[command(flatten)]
        ids: TaskIdArgs,
        /// Required. May carry the task id.
        #[arg(long, value_name = "TASK_ID", num_args = 0..=1)]
        follow: Option<Option<String>>,
    },
    Artifacts(TaskIdArgs),
    List(PageArgs),
    Cancel(TaskIdArgs),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ThemeCommand {
    List,
    Current,
    Set {
        #[arg(value_name = "NAME")]
        name: Option<String>,
        #[arg(long = "name", value_name = "NAME")]
        name_flag: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn follow_accepts_optional_task_id() {
        let cli = Cli::try_parse_from(["abc-cli", "run", "--session", "3", "events", "--follow", "9"])
            .expect("parse");
        assert_eq!(
            cli.command,
            Some(Command::Run(RunArgs {
                session: Some(3),
                command: RunCommand::Events {
                    ids: TaskIdArgs::default(),
                    follow: Some(Some("9".to_string())),
                },
            }))
        );

        let cli = Cli::try_parse_from(["abc-cli", "run", "events", "4", "--follow"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Command::Run(RunArgs {
                command: RunCommand::Events { follow: Some(None), .. },
                ..
            }))
        ));
    }

    #[test]
    fn no_subcommand_means_shell() {
        let cli = Cli::try_parse_from(["abc-cli"]).expect("parse");
        assert_eq!(cli.command, None);
    }
}
