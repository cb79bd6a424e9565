//! Theme commands

use anyhow::Result;

use studysync::preferences::{AccentColor, ProfileStore, ThemeMode};

use super::AppContext;

pub fn theme_show_command(ctx: &AppContext) -> Result<()> {
    let profiles = ProfileStore::new(ctx.db.clone());
    let theme = profiles.theme(ctx.user())?;
    println!("{}", serde_json::to_string_pretty(&theme)?);
    Ok(())
}

pub fn theme_set_command(ctx: &AppContext, mode: Option<&str>, accent: Option<&str>) -> Result<()> {
    let profiles = ProfileStore::new(ctx.db.clone());
    let mut theme = profiles.theme(ctx.user())?;

    if let Some(mode) = mode {
        theme.mode = mode.parse::<ThemeMode>()?;
    }
    if let Some(accent) = accent {
        theme.accent = accent.parse::<AccentColor>()?;
    }

    profiles.set_theme(ctx.user(), theme)?;
    println!("{}", serde_json::to_string_pretty(&theme)?);
    Ok(())
}
