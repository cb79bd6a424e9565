//! Shared state for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use studysync::progress::{BadgeNotifier, BadgeUnlocked, LogNotifier, SqliteProgressStore};
use studysync::study::{StudyRepository, Subject, Topic};
use studysync::{Config, Database};

/// Loaded configuration plus an open database
pub struct AppContext {
    pub config: Config,
    pub db: Database,
}

impl AppContext {
    /// Resolve the config path - the global config unless overridden by --config
    pub fn resolve_config_path(config_override: Option<&Path>) -> PathBuf {
        match config_override {
            Some(p) => p.to_path_buf(),
            None => Config::global_config_path(),
        }
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load_from(config_path)?;
        let db_path = config.database_path();
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        Ok(Self { config, db })
    }

    pub fn user(&self) -> &str {
        &self.config.user_id
    }

    pub fn study(&self) -> StudyRepository {
        StudyRepository::new(self.db.clone())
    }

    pub fn progress_store(&self) -> SqliteProgressStore {
        SqliteProgressStore::new(self.db.clone())
    }

    /// Print an unlocked badge, or only log it when notifications are disabled
    pub fn announce(&self, unlocked: &BadgeUnlocked) {
        if self.config.notifications {
            println!("🎉 Badge Unlocked! {}", unlocked.badge_name);
        } else {
            LogNotifier.badge_unlocked(unlocked);
        }
    }

    /// Find a subject by id or (case-insensitive) name
    pub fn find_subject(&self, study: &StudyRepository, key: &str) -> Result<Subject> {
        let subjects = study.list_subjects(self.user())?;
        subjects
            .into_iter()
            .find(|s| s.id == key || s.name.eq_ignore_ascii_case(key))
            .with_context(|| format!("Unknown subject: {key}"))
    }

    /// Find a topic of `subject` by id or (case-insensitive) name
    pub fn find_topic(&self, study: &StudyRepository, subject: &Subject, key: &str) -> Result<Topic> {
        let topics = study.list_topics(self.user(), &subject.id)?;
        topics
            .into_iter()
            .find(|t| t.id == key || t.name.eq_ignore_ascii_case(key))
            .with_context(|| format!("Unknown topic in {}: {key}", subject.name))
    }
}
