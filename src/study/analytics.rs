//! Weekly and daily study analytics

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Days, FixedOffset, NaiveDate};
use rusqlite::{Connection, OptionalExtension};

use super::StudyRepository;
use super::models::{DailyActivity, WeeklyStats};
use crate::error::Result;
use crate::progress::progress_percent;
use crate::time::{DAY_MS, day_bucket, parse_day_bucket};
use crate::validation;

impl StudyRepository {
    /// Sessions created in the 7 days before `now`, compared with the 7 days before that
    pub fn weekly_stats(&self, user_id: &str, now: DateTime<FixedOffset>) -> Result<WeeklyStats> {
        let conn = self.db.conn();
        let now_ms = now.timestamp_millis();
        let week_ago = now_ms - 7 * DAY_MS;
        let two_weeks_ago = now_ms - 14 * DAY_MS;

        let (total_sessions, total_duration_minutes): (u64, u64) = conn.query_row(
            r#"SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0)
               FROM study_sessions WHERE user_id = ?1 AND created_at >= ?2"#,
            rusqlite::params![user_id, week_ago],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let previous_week_sessions: u64 = conn.query_row(
            r#"SELECT COUNT(*) FROM study_sessions
               WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3"#,
            rusqlite::params![user_id, two_weeks_ago, week_ago],
            |r| r.get(0),
        )?;

        let topics_completed: u64 = conn.query_row(
            "SELECT COUNT(*) FROM topics WHERE user_id = ?1 AND status = 'learned'",
            [user_id],
            |r| r.get(0),
        )?;

        Ok(WeeklyStats {
            total_sessions,
            total_duration_minutes,
            topics_completed,
            most_studied_subject: Self::most_studied_subject(&conn, user_id, week_ago)?,
            consistency_score: progress_percent(total_sessions, 7),
            previous_week_sessions,
        })
    }

    /// Subject with the most sessions since `since_ms`; ties go to the alphabetically first name
    fn most_studied_subject(
        conn: &Connection,
        user_id: &str,
        since_ms: i64,
    ) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                r#"SELECT s.name FROM study_sessions ss
                   JOIN subjects s ON s.id = ss.subject_id
                   WHERE ss.user_id = ?1 AND ss.created_at >= ?2
                   GROUP BY s.id
                   ORDER BY COUNT(*) DESC, s.name ASC
                   LIMIT 1"#,
                rusqlite::params![user_id, since_ms],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// Per-day activity for the `days` days ending at `today`, oldest first.
    ///
    /// Days without sessions are included with a zero count. `days` must be
    /// within `1..=ACTIVITY_DAYS_MAX`.
    pub fn daily_activity(
        &self,
        user_id: &str,
        today: NaiveDate,
        days: u32,
    ) -> Result<Vec<DailyActivity>> {
        let days = validation::activity_days(days)?;
        let first = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);

        let mut by_day: BTreeMap<NaiveDate, (u64, BTreeSet<String>)> = first
            .iter_days()
            .take_while(|d| *d <= today)
            .map(|d| (d, (0, BTreeSet::new())))
            .collect();

        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT session_date, subject_id FROM study_sessions
               WHERE user_id = ?1 AND session_date >= ?2 AND session_date <= ?3"#,
        )?;
        let rows = stmt.query_map(
            [user_id, day_bucket(first).as_str(), day_bucket(today).as_str()],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )?;

        for row in rows {
            let (date, subject_id) = row?;
            let Some(entry) = parse_day_bucket(&date).and_then(|d| by_day.get_mut(&d)) else {
                continue;
            };
            entry.0 += 1;
            entry.1.insert(subject_id);
        }

        Ok(by_day
            .into_iter()
            .map(|(date, (sessions, subjects))| DailyActivity {
                date,
                sessions,
                subjects: subjects.into_iter().collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::study::{NewSession, TopicStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(repo: &StudyRepository, subject_id: &str, day: NaiveDate, minutes: Option<u32>) -> String {
        repo.log_session(
            "u1",
            NewSession {
                subject_id: subject_id.to_string(),
                topic_ids: vec![],
                notes: String::new(),
                session_date: day,
                duration_minutes: minutes,
            },
        )
        .unwrap()
        .id
    }

    fn backdate(repo: &StudyRepository, session_id: &str, created_at: DateTime<Utc>) {
        repo.db
            .conn()
            .execute(
                "UPDATE study_sessions SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![created_at.timestamp_millis(), session_id],
            )
            .unwrap();
    }

    #[test]
    fn test_weekly_stats() {
        let repo = StudyRepository::new(crate::db::Database::open_in_memory().unwrap());
        let math = repo.add_subject("u1", "Math", "", "#111").unwrap();
        let art = repo.add_subject("u1", "Art", "", "#222").unwrap();
        let topic = repo.add_topic("u1", &math.id, "Sets").unwrap();
        repo.set_topic_status("u1", &topic.id, TopicStatus::Learned)
            .unwrap();

        let now = Utc::now();
        let today = now.date_naive();
        log(&repo, &math.id, today, Some(30));
        log(&repo, &math.id, today, None);
        log(&repo, &art.id, today, Some(15));
        let old = log(&repo, &art.id, today, Some(60));
        backdate(&repo, &old, now - Duration::days(10));
        let ancient = log(&repo, &art.id, today, Some(60));
        backdate(&repo, &ancient, now - Duration::days(20));

        let stats = repo.weekly_stats("u1", now.fixed_offset()).unwrap();
        assert_eq!(
            stats,
            WeeklyStats {
                total_sessions: 3,
                total_duration_minutes: 45,
                topics_completed: 1,
                most_studied_subject: Some("Math".to_string()),
                consistency_score: 43,
                previous_week_sessions: 1,
            }
        );
    }

    #[test]
    fn test_weekly_stats_empty() {
        let repo = StudyRepository::new(crate::db::Database::open_in_memory().unwrap());
        let stats = repo.weekly_stats("u1", Utc::now().fixed_offset()).unwrap();
        assert_eq!(stats, WeeklyStats::default());
    }

    #[test]
    fn test_daily_activity_oldest_first() {
        let repo = StudyRepository::new(crate::db::Database::open_in_memory().unwrap());
        let math = repo.add_subject("u1", "Math", "", "#111").unwrap();
        let art = repo.add_subject("u1", "Art", "", "#222").unwrap();
        log(&repo, &math.id, date(2024, 3, 1), None);
        log(&repo, &art.id, date(2024, 3, 3), None);
        log(&repo, &math.id, date(2024, 3, 3), None);
        log(&repo, &math.id, date(2024, 2, 1), None);

        let activity = repo.daily_activity("u1", date(2024, 3, 3), 3).unwrap();
        assert_eq!(activity.len(), 3);
        assert_eq!(activity[0].date, date(2024, 3, 1));
        assert_eq!(activity[0].sessions, 1);
        assert_eq!(activity[1].sessions, 0);
        assert_eq!(activity[2].date, date(2024, 3, 3));
        assert_eq!(activity[2].sessions, 2);
        assert_eq!(activity[2].subjects.len(), 2);

    }

    #[test]
    fn test_daily_activity_range_is_bounded() {
        let repo = StudyRepository::new(crate::db::Database::open_in_memory().unwrap());
        let today = date(2024, 3, 3);

        let year = repo
            .daily_activity("u1", today, validation::ACTIVITY_DAYS_MAX)
            .unwrap();
        assert_eq!(year.len(), validation::ACTIVITY_DAYS_MAX as usize);

        for days in [0, validation::ACTIVITY_DAYS_MAX + 1, u32::MAX] {
            assert!(matches!(
                repo.daily_activity("u1", today, days),
                Err(crate::error::Error::Validation(
                    crate::validation::ValidationError::DaysOutOfRange { .. }
                ))
            ));
        }
    }
}
