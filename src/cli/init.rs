//! Init command implementation

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use studysync::{Config, Database};

/// Write a default config (unless one exists) and create the database
pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    let config = if config_path.exists() && !force {
        println!("Config already exists: {}", config_path.display());
        println!("Use --force to overwrite.");
        Config::from_file(config_path)?
    } else {
        let config = Config::default();
        config.save_to_file(config_path)?;
        println!("Created {}", config_path.display());
        config
    };

    let db_path = config.database_path();
    Database::open(&db_path)
        .with_context(|| format!("Failed to create database: {}", db_path.display()))?;
    info!(path = %db_path.display(), "Database ready");
    println!("Database: {}", db_path.display());
    Ok(())
}
