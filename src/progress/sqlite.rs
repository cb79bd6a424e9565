//! SQLite-backed progress store

use chrono::Utc;
use rusqlite::OptionalExtension;

use super::badges::UserBadgeProgress;
use super::store::ProgressStore;
use super::streaks::StreakRecord;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::time::stored_timestamp;
use crate::validation::{ValidationError, stored_count};

/// Streak and badge persistence on top of [`Database`]
#[derive(Clone)]
pub struct SqliteProgressStore {
    db: Database,
}

impl SqliteProgressStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ProgressStore for SqliteProgressStore {
    fn load_streak_record(&self, user_id: &str) -> Result<StreakRecord> {
        let conn = self.db.conn();
        let row = conn
            .query_row(
                "SELECT current_streak, longest_streak, last_activity_at, version FROM streaks WHERE user_id = ?1",
                [user_id],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, Option<i64>>(2)?,
                        r.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((current, longest, last, version)) = row else {
            return Ok(StreakRecord::default());
        };

        let current_streak = stored_count("current_streak", current)?;
        let longest_streak = stored_count("longest_streak", longest)?;
        if longest_streak < current_streak {
            return Err(ValidationError::InconsistentStreak {
                current: current_streak,
                longest: longest_streak,
            }
            .into());
        }

        Ok(StreakRecord {
            current_streak,
            longest_streak,
            last_activity_at: last
                .map(|ms| stored_timestamp("last_activity_at", ms))
                .transpose()?,
            version: u64::try_from(version).map_err(|_| ValidationError::StoredCountOutOfRange {
                field: "streak version",
                value: version,
            })?,
        })
    }

    fn save_streak_record(&self, user_id: &str, record: &StreakRecord) -> Result<StreakRecord> {
        let now = Utc::now().timestamp_millis();
        let next_version = record.version + 1;
        let last = record.last_activity_at.map(|t| t.timestamp_millis());
        let expected = i64::try_from(record.version).unwrap_or(i64::MAX);
        let next = i64::try_from(next_version).unwrap_or(i64::MAX);

        let conn = self.db.conn();
        let updated = conn.execute(
            r#"UPDATE streaks
               SET current_streak = ?1, longest_streak = ?2, last_activity_at = ?3,
                   version = ?4, updated_at = ?5
               WHERE user_id = ?6 AND version = ?7"#,
            rusqlite::params![
                record.current_streak,
                record.longest_streak,
                last,
                next,
                now,
                user_id,
                expected,
            ],
        )?;

        if updated == 0 {
            let stored: Option<i64> = conn
                .query_row("SELECT version FROM streaks WHERE user_id = ?1", [user_id], |r| r.get(0))
                .optional()?;
            if let Some(found) = stored {
                return Err(Error::Conflict {
                    user_id: user_id.to_string(),
                    expected: record.version,
                    found: found.max(0).unsigned_abs(),
                });
            }

            conn.execute(
                r#"INSERT INTO streaks
                   (user_id, current_streak, longest_streak, last_activity_at, version, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                rusqlite::params![
                    user_id,
                    record.current_streak,
                    record.longest_streak,
                    last,
                    next,
                    now,
                ],
            )?;
        }

        Ok(StreakRecord {
            version: next_version,
            ..*record
        })
    }

    fn load_badge_progress(&self, user_id: &str) -> Result<Vec<UserBadgeProgress>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT badge_id, progress, earned_at FROM user_badges WHERE user_id = ?1 ORDER BY badge_id",
        )?;
        let rows = stmt
            .query_map([user_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, Option<i64>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(badge_id, progress, earned_at)| -> Result<UserBadgeProgress> {
                let progress = u8::try_from(progress)
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| ValidationError::ProgressOutOfRange {
                        badge_id: badge_id.clone(),
                        progress,
                    })?;
                Ok(UserBadgeProgress {
                    badge_id,
                    progress,
                    earned_at: earned_at
                        .map(|ms| stored_timestamp("earned_at", ms))
                        .transpose()?,
                })
            })
            .collect()
    }

    fn save_badge_progress(&self, user_id: &str, progress: &UserBadgeProgress) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let conn = self.db.conn();
        // An earned badge is never un-earned, whatever the caller sends
        conn.execute(
            r#"INSERT INTO user_badges (user_id, badge_id, progress, earned_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(user_id, badge_id) DO UPDATE SET
                   progress = CASE WHEN user_badges.earned_at IS NOT NULL THEN 100 ELSE excluded.progress END,
                   earned_at = COALESCE(user_badges.earned_at, excluded.earned_at),
                   updated_at = excluded.updated_at"#,
            rusqlite::params![
                user_id,
                progress.badge_id,
                progress.progress,
                progress.earned_at.map(|t| t.timestamp_millis()),
                now,
            ],
        )?;
        Ok(())
    }
}
