use std::sync::Arc;

use abc_cli::cli::{
    Command, IdArgs, LoginArgs, McpAddArgs, McpAuthCommand, McpAuthStartArgs, McpCommand,
    McpUpdateArgs, RunArgs, RunCommand, SessionCommand, SessionIdArgs, TaskIdArgs, ThemeCommand,
};
use abc_cli::commands;
use abc_cli::context::CommandContext;
use abc_cli::output::Output;
use abc_cli::shell::{handle_line, ShellFlow};
use credential_store::{CredentialStore, ThemeName};
use platform_api::{HttpMethod, PlatformTransport};
use platform_api_mock::{MockTransport, StreamScript};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    transport: Arc<MockTransport>,
    output: Output,
    ctx: CommandContext,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = CredentialStore::at(dir.path().join("home"));
    let transport = Arc::new(MockTransport::new());
    let dyn_transport: Arc<dyn PlatformTransport> = transport.clone();
    let output = Output::capturing();
    let ctx = CommandContext::new(dyn_transport, store, output.clone());
    Harness {
        _dir: dir,
        transport,
        output,
        ctx,
    }
}

fn signed_in() -> Harness {
    let harness = harness();
    harness
        .ctx
        .auth
        .save_session("t1", Some("r1".to_string()), Some("alice".to_string()));
    harness
}

fn in_session(session_id: u64) -> Harness {
    let mut harness = signed_in();
    harness.ctx.active_session = Some(session_id);
    harness
}

async fn run(harness: &mut Harness, command: Command) -> Result<(), String> {
    commands::execute(&mut harness.ctx, command)
        .await
        .map_err(|error| error.to_string())
}

fn run_command(command: RunCommand) -> Command {
    Command::Run(RunArgs {
        session: None,
        command,
    })
}

fn task_ids(task_id: &str) -> TaskIdArgs {
    TaskIdArgs {
        task_id: Some(task_id.to_string()),
        task_id_flag: None,
    }
}

fn mcp_ids(id: &str) -> IdArgs {
    IdArgs {
        id: Some(id.to_string()),
        id_flag: None,
    }
}

#[tokio::test]
async fn commands_require_login() {
    let mut harness = harness();

    let error = run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::List {
                server_code: None,
                status: None,
            },
        },
    )
    .await
    .expect_err("should fail without credentials");

    assert_eq!(error, "Not logged in. Run login first.");
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn expired_credential_is_refreshed_and_request_retried() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Get, "/mcp/servers", 401, json!({ "message": "expired" }));
    harness
        .transport
        .push_json(HttpMethod::Post, "/auth/refresh", 200, json!({ "access_token": "t2" }));
    harness
        .transport
        .push_json(HttpMethod::Get, "/mcp/servers", 200, json!([]));

    run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::List {
                server_code: Some("git".to_string()),
                status: None,
            },
        },
    )
    .await
    .expect("list should succeed after refresh");

    let credentials: Vec<_> = harness
        .transport
        .requests_to("/mcp/servers")
        .into_iter()
        .map(|request| request.credential)
        .collect();
    assert_eq!(credentials, vec![Some("t1".to_string()), Some("t2".to_string())]);
    assert!(harness.output.contains("Token refreshed."));
    assert!(harness
        .output
        .contains("Retrying previous request with refreshed token..."));
    assert!(!harness.output.contains("t2"));
}

#[tokio::test]
async fn session_create_switches_to_new_session() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Post, "/sessions", 201, json!({ "sessionId": 11 }));

    run(
        &mut harness,
        Command::Session {
            command: SessionCommand::Create {
                title: Some("demo".to_string()),
            },
        },
    )
    .await
    .expect("create should succeed");

    assert_eq!(harness.ctx.active_session, Some(11));
    assert_eq!(
        harness.transport.requests_to("/sessions")[0].body,
        Some(json!({ "title": "demo" }))
    );
    assert!(harness.output.contains("Switched to session 11."));
}

#[tokio::test]
async fn session_use_only_switches_when_session_exists() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Get, "/sessions/5", 200, json!({ "id": 5 }));
    harness
        .transport
        .push_json(HttpMethod::Get, "/sessions/6", 404, json!({ "message": "not found" }));

    let use_session = |id: &str| Command::Session {
        command: SessionCommand::Use(SessionIdArgs {
            id: None,
            id_flag: Some(id.to_string()),
        }),
    };

    run(&mut harness, use_session("5")).await.expect("use 5");
    assert_eq!(harness.ctx.active_session, Some(5));
    assert!(harness.output.contains("Active session set to 5."));

    run(&mut harness, use_session("6")).await.expect("use 6 reports, not fails");
    assert_eq!(harness.ctx.active_session, Some(5));
    assert!(harness.output.had_error());
}

#[tokio::test]
async fn session_current_and_leave() {
    let mut harness = signed_in();

    run(
        &mut harness,
        Command::Session {
            command: SessionCommand::Current,
        },
    )
    .await
    .expect("current");
    assert!(harness
        .output
        .contains("No active session. Use `session create` or `session use <id>`."));
    assert!(harness.transport.requests().is_empty());

    harness.ctx.active_session = Some(3);
    run(
        &mut harness,
        Command::Session {
            command: SessionCommand::Leave,
        },
    )
    .await
    .expect("leave");
    assert_eq!(harness.ctx.active_session, None);
    assert!(harness.output.contains("Left current session."));
}

#[tokio::test]
async fn session_get_rejects_conflicting_ids() {
    let mut harness = signed_in();

    let error = run(
        &mut harness,
        Command::Session {
            command: SessionCommand::Get(SessionIdArgs {
                id: Some("1".to_string()),
                id_flag: Some("2".to_string()),
            }),
        },
    )
    .await
    .expect_err("conflict");

    assert_eq!(
        error,
        "Conflicting sessionId values between positional and --session-id."
    );
}

#[tokio::test]
async fn run_commands_require_active_session() {
    let mut harness = signed_in();

    let error = run(
        &mut harness,
        run_command(RunCommand::Submit {
            objective: Some("do it".to_string()),
            session_id: None,
        }),
    )
    .await
    .expect_err("no session");

    assert_eq!(
        error,
        "run submit requires an active session. Use `session use <id>` or `session create` first."
    );
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn run_submit_validates_objective_and_session() {
    let mut harness = in_session(7);

    let error = run(
        &mut harness,
        run_command(RunCommand::Submit {
            objective: Some("   ".to_string()),
            session_id: None,
        }),
    )
    .await
    .expect_err("blank objective");
    assert_eq!(error, "run submit requires --objective <text>.");

    let error = run(
        &mut harness,
        run_command(RunCommand::Submit {
            objective: Some("do it".to_string()),
            session_id: Some("9".to_string()),
        }),
    )
    .await
    .expect_err("other session");
    assert_eq!(
        error,
        "run submit must use active session 7. Run `session use 9` first."
    );
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn run_submit_sends_task_for_active_session() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Post, "/tasks", 201, json!({ "id": 3, "sessionId": 7 }));

    run(
        &mut harness,
        run_command(RunCommand::Submit {
            objective: Some("do it".to_string()),
            session_id: Some("7".to_string()),
        }),
    )
    .await
    .expect("submit");

    assert_eq!(
        harness.transport.requests_to("/tasks")[0].body,
        Some(json!({ "message": "do it", "sessionId": 7 }))
    );
}

#[tokio::test]
async fn run_session_flag_sets_active_session() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks", 200, json!({ "items": [] }));

    run(
        &mut harness,
        Command::Run(RunArgs {
            session: Some(4),
            command: RunCommand::List(Default::default()),
        }),
    )
    .await
    .expect("list");

    assert_eq!(harness.ctx.active_session, Some(4));
}

#[tokio::test]
async fn run_status_rejects_task_from_other_session() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/3", 200, json!({ "id": 3, "sessionId": 8 }));

    let error = run(&mut harness, run_command(RunCommand::Status(task_ids("3"))))
        .await
        .expect_err("ownership");

    assert_eq!(
        error,
        "Task belongs to session 8, but active session is 7. Run `session use 8` first."
    );
}

#[tokio::test]
async fn run_status_requires_session_id_in_response() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/3", 200, json!({ "id": 3 }));

    let error = run(&mut harness, run_command(RunCommand::Status(task_ids("3"))))
        .await
        .expect_err("missing session id");

    assert_eq!(error, "run status response missing sessionId.");
}

#[tokio::test]
async fn run_cancel_skips_cancel_when_probe_fails() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/3", 404, json!({ "message": "gone" }));

    run(&mut harness, run_command(RunCommand::Cancel(task_ids("3"))))
        .await
        .expect("probe failure is reported, not raised");

    assert_eq!(harness.transport.request_count("/tasks/3/cancel"), 0);
}

#[tokio::test]
async fn run_cancel_after_ownership_check() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/3", 200, json!({ "sessionId": 7, "status": "RUNNING" }));
    harness
        .transport
        .push_json(HttpMethod::Post, "/tasks/3/cancel", 202, json!({ "status": "CANCELLED" }));

    run(&mut harness, run_command(RunCommand::Cancel(task_ids("3"))))
        .await
        .expect("cancel");

    assert_eq!(harness.transport.request_count("/tasks/3/cancel"), 1);
}

#[tokio::test]
async fn run_artifacts_fetches_after_ownership_check() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/3", 200, json!({ "sessionId": 7 }));
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/3/artifacts", 200, json!([{ "name": "out.txt" }]));

    run(&mut harness, run_command(RunCommand::Artifacts(task_ids("3"))))
        .await
        .expect("artifacts");

    assert_eq!(harness.transport.request_count("/tasks/3/artifacts"), 1);
}

#[tokio::test]
async fn run_events_requires_follow() {
    let mut harness = in_session(7);

    let error = run(
        &mut harness,
        run_command(RunCommand::Events {
            ids: task_ids("4"),
            follow: None,
        }),
    )
    .await
    .expect_err("follow required");
    assert_eq!(error, "run events requires --follow <task_id>.");

    let error = run(
        &mut harness,
        run_command(RunCommand::Events {
            ids: task_ids("4"),
            follow: Some(Some("5".to_string())),
        }),
    )
    .await
    .expect_err("conflict");
    assert_eq!(error, "Conflicting task id values for run events.");
}

#[tokio::test]
async fn run_events_follows_until_terminal_event() {
    let mut harness = in_session(7);
    harness
        .transport
        .push_json(HttpMethod::Get, "/tasks/4", 200, json!({ "sessionId": 7, "status": "RUNNING" }));
    harness.transport.push_stream(StreamScript::frames(&[
        ("task.created", json!({ "sessionId": 7 })),
        ("task.completed", json!({ "sessionId": 7 })),
    ]));

    run(
        &mut harness,
        run_command(RunCommand::Events {
            ids: TaskIdArgs::default(),
            follow: Some(Some("4".to_string())),
        }),
    )
    .await
    .expect("follow");

    assert_eq!(harness.transport.stream_opens().len(), 1);
    assert!(harness
        .output
        .contains("Observer mode started: run events --follow 4"));
    assert!(harness.output.contains(r#""event":"task.created""#));
    assert!(harness
        .output
        .contains("SSE reached terminal event 'task.completed'. Follow ended."));
    assert!(!harness.ctx.follows.is_active());
}

#[tokio::test]
async fn mcp_add_validates_options_before_sending() {
    let mut harness = signed_in();
    let add = |args: McpAddArgs| Command::Mcp {
        command: McpCommand::Add(args),
    };

    let error = run(
        &mut harness,
        add(McpAddArgs {
            server_code: Some("git".to_string()),
            ..McpAddArgs::default()
        }),
    )
    .await
    .expect_err("missing url");
    assert_eq!(
        error,
        "mcp add requires --server-code <code> --url <endpoint> --version <v>."
    );

    let error = run(
        &mut harness,
        add(McpAddArgs {
            payload_json: Some("{}".to_string()),
            name: Some("x".to_string()),
            ..McpAddArgs::default()
        }),
    )
    .await
    .expect_err("conflict");
    assert_eq!(
        error,
        "mcp add --payload-json cannot be used with other add options."
    );

    let error = run(
        &mut harness,
        add(McpAddArgs {
            payload_json: Some(
                r#"{"serverCode":"git","version":"1","name":"git","endpoint":"http://x","authType":"NONE"}"#
                    .to_string(),
            ),
            ..McpAddArgs::default()
        }),
    )
    .await
    .expect_err("missing field");
    assert_eq!(
        error,
        "mcp add --payload-json missing required field 'authConfig'."
    );

    let error = run(
        &mut harness,
        add(McpAddArgs {
            server_code: Some("git".to_string()),
            url: Some("http://x".to_string()),
            version: Some("1".to_string()),
            auth_type: Some("magic".to_string()),
            ..McpAddArgs::default()
        }),
    )
    .await
    .expect_err("bad auth type");
    assert_eq!(
        error,
        "mcp add --auth-type must be one of NONE|API_KEY|BASIC|OAUTH2|JWT|CUSTOM."
    );

    let error = run(
        &mut harness,
        add(McpAddArgs {
            server_code: Some("git".to_string()),
            url: Some("http://x".to_string()),
            version: Some("1".to_string()),
            auth_config_json: Some("{oops".to_string()),
            ..McpAddArgs::default()
        }),
    )
    .await
    .expect_err("bad json");
    assert_eq!(error, "--auth-config-json must be valid JSON.");

    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn mcp_add_fills_defaults() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Post, "/mcp/servers", 201, json!({ "id": 2 }));

    run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::Add(McpAddArgs {
                server_code: Some("git".to_string()),
                url: Some("http://mcp.local".to_string()),
                version: Some("1.0".to_string()),
                auth_type: Some("api_key".to_string()),
                ..McpAddArgs::default()
            }),
        },
    )
    .await
    .expect("add");

    assert_eq!(
        harness.transport.requests_to("/mcp/servers")[0].body,
        Some(json!({
            "serverCode": "git",
            "version": "1.0",
            "name": "git",
            "endpoint": "http://mcp.local",
            "authType": "API_KEY",
            "authConfig": {}
        }))
    );
}

#[tokio::test]
async fn mcp_update_requires_a_field() {
    let mut harness = signed_in();

    let error = run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::Update(McpUpdateArgs {
                ids: mcp_ids("2"),
                ..McpUpdateArgs::default()
            }),
        },
    )
    .await
    .expect_err("empty update");

    assert_eq!(error, "mcp update requires at least one field to update.");
}

#[tokio::test]
async fn mcp_auth_start_success_triggers_sync() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Post, "/mcp/servers/2/auth", 200, json!({ "success": true }));
    harness
        .transport
        .push_json(HttpMethod::Post, "/mcp/servers/2/sync", 200, json!({ "synced": 4 }));

    run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::Auth {
                command: McpAuthCommand::Start(McpAuthStartArgs {
                    ids: mcp_ids("2"),
                    connection_name: Some("main".to_string()),
                    ..McpAuthStartArgs::default()
                }),
            },
        },
    )
    .await
    .expect("auth start");

    assert_eq!(
        harness.transport.requests_to("/mcp/servers/2/auth")[0].body,
        Some(json!({ "connectionName": "main" }))
    );
    assert_eq!(harness.transport.request_count("/mcp/servers/2/sync"), 1);
    assert!(harness
        .output
        .contains("MCP auth succeeded. Triggering capability sync..."));
}

#[tokio::test]
async fn mcp_auth_start_without_success_does_not_sync() {
    let mut harness = signed_in();
    harness.transport.push_json(
        HttpMethod::Post,
        "/mcp/servers/2/auth",
        200,
        json!({ "success": false, "authorizationUrl": "https://idp" }),
    );

    run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::Auth {
                command: McpAuthCommand::Start(McpAuthStartArgs {
                    ids: mcp_ids("2"),
                    payload_json: Some(r#"{"returnUrl":"http://cb"}"#.to_string()),
                    ..McpAuthStartArgs::default()
                }),
            },
        },
    )
    .await
    .expect("auth start");

    assert_eq!(harness.transport.request_count("/mcp/servers/2/sync"), 0);
    assert_eq!(
        harness.transport.requests_to("/mcp/servers/2/auth")[0].body,
        Some(json!({ "returnUrl": "http://cb" }))
    );
}

#[tokio::test]
async fn mcp_auth_delete_sends_connection_id() {
    let mut harness = signed_in();
    harness
        .transport
        .push_json(HttpMethod::Delete, "/mcp/servers/2/auth", 204, serde_json::Value::Null);

    run(
        &mut harness,
        Command::Mcp {
            command: McpCommand::Auth {
                command: McpAuthCommand::Delete {
                    ids: mcp_ids("2"),
                    connection_id: Some("3".to_string()),
                },
            },
        },
    )
    .await
    .expect("auth delete");

    assert_eq!(
        harness.transport.requests_to("/mcp/servers/2/auth")[0].query,
        vec![("connectionId".to_string(), Some("3".to_string()))]
    );
}

#[tokio::test]
async fn theme_set_persists_choice() {
    let mut harness = harness();

    run(
        &mut harness,
        Command::Theme {
            command: ThemeCommand::Set {
                name: None,
                name_flag: Some("light-hc".to_string()),
            },
        },
    )
    .await
    .expect("set");

    assert_eq!(harness.ctx.theme, ThemeName::LightHc);
    assert_eq!(
        harness.ctx.store().load_preference().expect("load").value,
        Some(ThemeName::LightHc)
    );
    assert!(harness.output.contains("Theme switched to 'light-hc'."));
}

#[tokio::test]
async fn theme_set_reports_unknown_theme() {
    let mut harness = harness();

    run(
        &mut harness,
        Command::Theme {
            command: ThemeCommand::Set {
                name: Some("solarized".to_string()),
                name_flag: None,
            },
        },
    )
    .await
    .expect("unknown theme is reported, not raised");

    assert!(harness.output.contains("Unknown theme 'solarized'."));
    assert!(harness.output.contains("\"available\""));
    assert_eq!(harness.ctx.theme, ThemeName::Dark);

    let error = run(
        &mut harness,
        Command::Theme {
            command: ThemeCommand::Set {
                name: Some("dark".to_string()),
                name_flag: Some("light-hc".to_string()),
            },
        },
    )
    .await
    .expect_err("conflict");
    assert_eq!(
        error,
        "Conflicting theme names between positional and --name."
    );
}

#[tokio::test]
async fn logout_clears_session_and_store() {
    let mut harness = in_session(3);

    run(&mut harness, Command::Logout).await.expect("logout");

    assert!(!harness.ctx.auth.is_authenticated());
    assert_eq!(harness.ctx.active_session, None);
    assert_eq!(harness.ctx.store().load().expect("load").value, None);
    assert!(harness.output.contains("Logged out. Local token removed."));
}

#[tokio::test]
async fn login_with_both_values_signs_in() {
    let mut harness = harness();
    harness.transport.push_json(
        HttpMethod::Post,
        "/auth/login",
        200,
        json!({ "access_token": "t9", "refresh_token": "r9" }),
    );

    run(
        &mut harness,
        Command::Login(LoginArgs {
            username: Some("alice".to_string()),
            password: Some("pw".to_string()),
        }),
    )
    .await
    .expect("login");

    let stored = harness.ctx.store().load().expect("load").value.expect("session");
    assert_eq!(stored.access_credential, "t9");
    assert_eq!(stored.refresh_credential.as_deref(), Some("r9"));
    assert!(harness.output.contains("Login succeeded for 'alice'."));
    assert!(!harness.output.contains("t9"));
}

#[tokio::test]
async fn shell_drives_two_step_login() {
    let mut harness = harness();
    harness.ctx.interactive = true;
    harness
        .transport
        .push_json(HttpMethod::Post, "/auth/login", 200, json!({ "access_token": "t9" }));

    assert_eq!(handle_line(&mut harness.ctx, "/login").await, ShellFlow::Continue);
    assert!(harness.ctx.login.is_awaiting_input());
    assert!(harness.output.contains("Login started. Enter username."));

    handle_line(&mut harness.ctx, "/alice").await;
    assert!(harness.output.contains("Username cannot start with '/'."));

    handle_line(&mut harness.ctx, "alice").await;
    assert!(harness.ctx.login.is_password_input());

    handle_line(&mut harness.ctx, "pw").await;
    assert!(!harness.ctx.login.is_awaiting_input());
    assert!(harness.ctx.auth.is_authenticated());
    assert_eq!(
        harness.transport.requests_to("/auth/login")[0].body,
        Some(json!({ "username": "alice", "password": "pw" }))
    );
}

#[tokio::test]
async fn shell_reports_bad_input_and_keeps_going() {
    let mut harness = signed_in();

    assert_eq!(
        handle_line(&mut harness.ctx, "frobnicate").await,
        ShellFlow::Continue
    );
    assert!(harness.output.had_error());

    assert_eq!(
        handle_line(&mut harness.ctx, "run status 3").await,
        ShellFlow::Continue
    );
    assert!(harness.output.contains(
        "run status requires an active session. Use `session use <id>` or `session create` first."
    ));

    assert_eq!(handle_line(&mut harness.ctx, "exit").await, ShellFlow::Exit);
}
