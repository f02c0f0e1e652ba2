//! Validation of ids and option values shared by the command handlers.

use anyhow::{anyhow, bail, Result};
use platform_api::payload::PageQuery;
use serde_json::Value;

use crate::cli::PageArgs;

pub fn parse_positive_int(raw: &str, label: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(anyhow!("{label} must be a positive integer.")),
    }
}

fn parse_positive_u32(raw: &str, label: &str) -> Result<u32> {
    let value = parse_positive_int(raw, label)?;
    u32::try_from(value).map_err(|_| anyhow!("{label} must be a positive integer."))
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Resolve an id given positionally and/or through `--{option_name}`.
pub fn resolve_numeric_id(
    label: &str,
    positional: Option<&str>,
    option: Option<&str>,
    option_name: &str,
) -> Result<u64> {
    let positional = trimmed(positional);
    let option = trimmed(option);
    if let (Some(positional), Some(option)) = (positional, option) {
        if positional != option {
            bail!("Conflicting {label} values between positional and --{option_name}.");
        }
    }
    let Some(raw) = option.or(positional) else {
        bail!("{label} is required.");
    };
    parse_positive_int(raw, label)
}

/// Resolve a task id from the positional, `--task-id`, and an id implied by
/// another option such as `--follow <id>`. All given values must agree.
pub fn resolve_task_id(
    command: &str,
    positional: Option<&str>,
    option: Option<&str>,
    implied: Option<&str>,
) -> Result<u64> {
    let values: Vec<&str> = [positional, option, implied]
        .into_iter()
        .filter_map(trimmed)
        .collect();
    if values.iter().any(|value| *value != values[0]) {
        bail!("Conflicting task id values for run {command}.");
    }
    let Some(raw) = values.first() else {
        bail!("run {command} requires <task_id> or --task-id <id>.");
    };
    parse_positive_int(raw, "task_id")
}

pub fn parse_json_option(raw: Option<&str>, option_name: &str) -> Result<Option<Value>> {
    raw.map(|raw| {
        serde_json::from_str(raw).map_err(|_| anyhow!("{option_name} must be valid JSON."))
    })
    .transpose()
}

pub fn page_query(args: &PageArgs) -> Result<PageQuery> {
    Ok(PageQuery {
        status: trimmed(args.status.as_deref()).map(ToOwned::to_owned),
        page: trimmed(args.page.as_deref())
            .map(|raw| parse_positive_u32(raw, "page"))
            .transpose()?,
        size: trimmed(args.size.as_deref())
            .map(|raw| parse_positive_u32(raw, "size"))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn message(result: Result<impl std::fmt::Debug>) -> String {
        result.expect_err("expected error").to_string()
    }

    #[test]
    fn positive_int_rejects_zero_and_garbage() {
        assert_eq!(parse_positive_int(" 12 ", "mcp id").unwrap(), 12);
        assert_eq!(message(parse_positive_int("0", "page")), "page must be a positive integer.");
        assert_eq!(message(parse_positive_int("-3", "page")), "page must be a positive integer.");
        assert_eq!(message(parse_positive_int("1.5", "page")), "page must be a positive integer.");
    }

    #[test]
    fn numeric_id_accepts_either_source() {
        assert_eq!(resolve_numeric_id("mcp id", Some("4"), None, "id").unwrap(), 4);
        assert_eq!(resolve_numeric_id("mcp id", None, Some("5"), "id").unwrap(), 5);
        assert_eq!(resolve_numeric_id("mcp id", Some("6"), Some(" 6 "), "id").unwrap(), 6);
    }

    #[test]
    fn numeric_id_reports_conflicts_and_absence() {
        assert_eq!(
            message(resolve_numeric_id("sessionId", Some("1"), Some("2"), "session-id")),
            "Conflicting sessionId values between positional and --session-id."
        );
        assert_eq!(
            message(resolve_numeric_id("mcp id", Some("  "), None, "id")),
            "mcp id is required."
        );
    }

    #[test]
    fn task_id_requires_agreement() {
        assert_eq!(resolve_task_id("events", None, None, Some("9")).unwrap(), 9);
        assert_eq!(resolve_task_id("events", Some("9"), Some("9"), Some("9")).unwrap(), 9);
        assert_eq!(
            message(resolve_task_id("events", Some("9"), None, Some("8"))),
            "Conflicting task id values for run events."
        );
        assert_eq!(
            message(resolve_task_id("status", None, None, None)),
            "run status requires <task_id> or --task-id <id>."
        );
        assert_eq!(
            message(resolve_task_id("status", Some("x"), None, None)),
            "task_id must be a positive integer."
        );
    }

    #[test]
    fn json_option_reports_option_name() {
        assert_eq!(
            parse_json_option(Some(r#"{"a":1}"#), "--auth-config-json").unwrap(),
            Some(json!({ "a": 1 }))
        );
        assert_eq!(parse_json_option(None, "--auth-config-json").unwrap(), None);
        assert_eq!(
            message(parse_json_option(Some("{"), "--credentials-json")),
            "--credentials-json must be valid JSON."
        );
    }

    #[test]
    fn page_query_validates_numbers() {
        let query = page_query(&PageArgs {
            status: Some("RUNNING".to_string()),
            page: Some("2".to_string()),
            size: None,
        })
        .unwrap();
        assert_eq!(
            query,
            PageQuery {
                status: Some("RUNNING".to_string()),
                page: Some(2),
                size: None,
            }
        );
        assert_eq!(
            message(page_query(&PageArgs {
                size: Some("99999999999".to_string()),
                ..PageArgs::default()
            })),
            "size must be a positive integer."
        );
    }
}
