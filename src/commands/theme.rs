use anyhow::{bail, Context as _, Result};
use credential_store::ThemeName;
use serde_json::json;

use crate::cli::ThemeCommand;
use crate::context::CommandContext;
use crate::output::OutputLevel;

fn theme_names() -> Vec<&'static str> {
    ThemeName::ALL.iter().map(|theme| theme.as_str()).collect()
}

pub fn execute(ctx: &mut CommandContext, command: ThemeCommand) -> Result<()> {
    match command {
        ThemeCommand::List => {
            ctx.output
                .json(OutputLevel::Info, &json!({ "themes": theme_names() }));
        }
        ThemeCommand::Current => {
            ctx.output
                .json(OutputLevel::Info, &json!({ "theme": ctx.theme.as_str() }));
        }
        ThemeCommand::Set { name, name_flag } => set(ctx, name, name_flag)?,
    }
    Ok(())
}

fn set(ctx: &mut CommandContext, name: Option<String>, name_flag: Option<String>) -> Result<()> {
    let positional = name.as_deref().map(str::trim).filter(|value| !value.is_empty());
    let option = name_flag
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let (Some(positional), Some(option)) = (positional, option) {
        if positional != option {
            bail!("Conflicting theme names between positional and --name.");
        }
    }
    let Some(raw) = option.or(positional) else {
        bail!("theme set requires <name> or --name <theme>.");
    };

    let Ok(theme) = raw.parse::<ThemeName>() else {
        ctx.output.error(format!("Unknown theme '{raw}'."));
        ctx.output
            .json(OutputLevel::Info, &json!({ "available": theme_names() }));
        return Ok(());
    };

    ctx.store()
        .save_preference(theme)
        .context("Failed to save theme preference")?;
    ctx.theme = theme;
    ctx.output
        .success(format!("Theme switched to '{}'.", theme.as_str()));
    ctx.output.json(
        OutputLevel::Info,
        &json!({ "theme": theme.as_str(), "persisted": true }),
    );
    Ok(())
}
