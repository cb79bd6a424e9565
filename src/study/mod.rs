//! Subjects, topics and study sessions
//!
//! Also the metrics source the badge evaluator reads from: session count,
//! learned topic count and subject count are aggregated straight from these
//! tables.

mod analytics;
mod models;

pub use models::{
    DailyActivity, NewSession, StudySession, Subject, SubjectUpdate, Topic, TopicStatus,
    WeeklyStats,
};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::db::{Database, timestamp_column};
use crate::error::{Error, Result};
use crate::progress::MetricsSource;
use crate::time::day_bucket;
use crate::validation::{
    self, DESCRIPTION_MAX, NOTES_MAX, SUBJECT_NAME_MAX, TOPIC_NAME_MAX, ValidationError,
};

/// Reads and writes study data
#[derive(Clone)]
pub struct StudyRepository {
    db: Database,
}

impl StudyRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ========================================
    // SUBJECTS
    // ========================================

    pub fn add_subject(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        color: &str,
    ) -> Result<Subject> {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: validation::required_text("Subject name", name, SUBJECT_NAME_MAX)?,
            description: validation::optional_text("Description", description, DESCRIPTION_MAX)?,
            color: validation::color(color)?,
            created_at: Utc::now().trunc_subsecs(3),
        };

        let conn = self.db.conn();
        conn.execute(
            r#"INSERT INTO subjects (id, user_id, name, description, color, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            rusqlite::params![
                subject.id,
                subject.user_id,
                subject.name,
                subject.description,
                subject.color,
                subject.created_at.timestamp_millis(),
            ],
        )?;
        debug!(user = user_id, subject = %subject.id, "Subject added");
        Ok(subject)
    }

    /// Subjects of a user, newest first
    pub fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT id, user_id, name, description, color, created_at
               FROM subjects WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"#,
        )?;
        let rows = stmt.query_map([user_id], subject_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_subject(&self, user_id: &str, subject_id: &str) -> Result<Subject> {
        let conn = self.db.conn();
        Self::find_subject(&conn, user_id, subject_id)
    }

    pub fn update_subject(
        &self,
        user_id: &str,
        subject_id: &str,
        update: SubjectUpdate,
    ) -> Result<Subject> {
        let conn = self.db.conn();
        let mut subject = Self::find_subject(&conn, user_id, subject_id)?;

        if let Some(name) = update.name {
            subject.name = validation::required_text("Subject name", &name, SUBJECT_NAME_MAX)?;
        }
        if let Some(description) = update.description {
            subject.description =
                validation::optional_text("Description", &description, DESCRIPTION_MAX)?;
        }
        if let Some(color) = update.color {
            subject.color = validation::color(&color)?;
        }

        conn.execute(
            "UPDATE subjects SET name = ?1, description = ?2, color = ?3 WHERE id = ?4",
            rusqlite::params![subject.name, subject.description, subject.color, subject.id],
        )?;
        Ok(subject)
    }

    /// Delete a subject with its topics and sessions
    pub fn delete_subject(&self, user_id: &str, subject_id: &str) -> Result<()> {
        let conn = self.db.conn();
        let deleted = conn.execute(
            "DELETE FROM subjects WHERE id = ?1 AND user_id = ?2",
            [subject_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("subject {subject_id}")));
        }
        debug!(user = user_id, subject = subject_id, "Subject deleted");
        Ok(())
    }

    fn find_subject(conn: &Connection, user_id: &str, subject_id: &str) -> Result<Subject> {
        conn.query_row(
            r#"SELECT id, user_id, name, description, color, created_at
               FROM subjects WHERE id = ?1 AND user_id = ?2"#,
            [subject_id, user_id],
            subject_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("subject {subject_id}")))
    }

    // ========================================
    // TOPICS
    // ========================================

    /// Append a topic to the end of a subject
    pub fn add_topic(&self, user_id: &str, subject_id: &str, name: &str) -> Result<Topic> {
        let name = validation::required_text("Topic name", name, TOPIC_NAME_MAX)?;
        let conn = self.db.conn();
        Self::find_subject(&conn, user_id, subject_id)?;

        let order_index: u32 = conn.query_row(
            "SELECT COUNT(*) FROM topics WHERE subject_id = ?1",
            [subject_id],
            |r| r.get(0),
        )?;

        let topic = Topic {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            name,
            status: TopicStatus::NotStarted,
            order_index,
        };
        conn.execute(
            r#"INSERT INTO topics (id, user_id, subject_id, name, status, order_index, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            rusqlite::params![
                topic.id,
                user_id,
                topic.subject_id,
                topic.name,
                topic.status.as_str(),
                topic.order_index,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(topic)
    }

    /// Topics of a subject in display order
    pub fn list_topics(&self, user_id: &str, subject_id: &str) -> Result<Vec<Topic>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT id, subject_id, name, status, order_index
               FROM topics WHERE user_id = ?1 AND subject_id = ?2 ORDER BY order_index"#,
        )?;
        let rows = stmt
            .query_map([user_id, subject_id], topic_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(topic_from_raw).collect()
    }

    pub fn set_topic_status(
        &self,
        user_id: &str,
        topic_id: &str,
        status: TopicStatus,
    ) -> Result<Topic> {
        let conn = self.db.conn();
        let updated = conn.execute(
            "UPDATE topics SET status = ?1 WHERE id = ?2 AND user_id = ?3",
            [status.as_str(), topic_id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("topic {topic_id}")));
        }

        let raw = conn.query_row(
            "SELECT id, subject_id, name, status, order_index FROM topics WHERE id = ?1",
            [topic_id],
            topic_row,
        )?;
        debug!(user = user_id, topic = topic_id, status = %status, "Topic status changed");
        topic_from_raw(raw)
    }

    pub fn delete_topic(&self, user_id: &str, topic_id: &str) -> Result<()> {
        let conn = self.db.conn();
        let deleted = conn.execute(
            "DELETE FROM topics WHERE id = ?1 AND user_id = ?2",
            [topic_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("topic {topic_id}")));
        }
        Ok(())
    }

    // ========================================
    // SESSIONS
    // ========================================

    /// Record a study session. Every topic must belong to the session's subject.
    pub fn log_session(&self, user_id: &str, session: NewSession) -> Result<StudySession> {
        let notes = validation::optional_text("Notes", &session.notes, NOTES_MAX)?;
        let conn = self.db.conn();
        Self::find_subject(&conn, user_id, &session.subject_id)?;

        for topic_id in &session.topic_ids {
            let belongs: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM topics WHERE id = ?1 AND subject_id = ?2 AND user_id = ?3",
                [topic_id.as_str(), session.subject_id.as_str(), user_id],
                |r| r.get(0),
            )?;
            if !belongs {
                return Err(ValidationError::ForeignTopic(topic_id.clone()).into());
            }
        }

        let record = StudySession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            subject_id: session.subject_id,
            topic_ids: session.topic_ids,
            notes,
            session_date: session.session_date,
            duration_minutes: session.duration_minutes,
            created_at: Utc::now().trunc_subsecs(3),
        };

        conn.execute(
            r#"INSERT INTO study_sessions
               (id, user_id, subject_id, topic_ids, notes, session_date, duration_minutes, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            rusqlite::params![
                record.id,
                record.user_id,
                record.subject_id,
                serde_json::to_string(&record.topic_ids)?,
                record.notes,
                day_bucket(record.session_date),
                record.duration_minutes,
                record.created_at.timestamp_millis(),
            ],
        )?;
        debug!(user = user_id, session = %record.id, date = %record.session_date, "Session logged");
        Ok(record)
    }

    /// Sessions of a user, newest first
    pub fn list_sessions(&self, user_id: &str) -> Result<Vec<StudySession>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT id, user_id, subject_id, topic_ids, notes, session_date, duration_minutes, created_at
               FROM study_sessions WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"#,
        )?;
        let rows = stmt
            .query_map([user_id], |r| {
                Ok(RawSession {
                    id: r.get(0)?,
                    user_id: r.get(1)?,
                    subject_id: r.get(2)?,
                    topic_ids: r.get(3)?,
                    notes: r.get(4)?,
                    session_date: parse_date_column(r, 5)?,
                    duration_minutes: r.get(6)?,
                    created_at: timestamp_column(r, 7, "created_at")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawSession::into_session).collect()
    }
}

impl MetricsSource for StudyRepository {
    fn session_count(&self, user_id: &str) -> Result<i64> {
        let conn = self.db.conn();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM study_sessions WHERE user_id = ?1",
            [user_id],
            |r| r.get(0),
        )?)
    }

    fn topics_learned_count(&self, user_id: &str) -> Result<i64> {
        let conn = self.db.conn();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM topics WHERE user_id = ?1 AND status = 'learned'",
            [user_id],
            |r| r.get(0),
        )?)
    }

    fn subject_count(&self, user_id: &str) -> Result<i64> {
        let conn = self.db.conn();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM subjects WHERE user_id = ?1",
            [user_id],
            |r| r.get(0),
        )?)
    }
}

fn subject_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        description: r.get(3)?,
        color: r.get(4)?,
        created_at: timestamp_column(r, 5, "created_at")?,
    })
}

fn parse_date_column(r: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = r.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

type RawTopic = (String, String, String, String, u32);

fn topic_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RawTopic> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

fn topic_from_raw((id, subject_id, name, status, order_index): RawTopic) -> Result<Topic> {
    Ok(Topic {
        id,
        subject_id,
        name,
        status: status.parse()?,
        order_index,
    })
}

struct RawSession {
    id: String,
    user_id: String,
    subject_id: String,
    topic_ids: String,
    notes: String,
    session_date: NaiveDate,
    duration_minutes: Option<u32>,
    created_at: DateTime<Utc>,
}

impl RawSession {
    fn into_session(self) -> Result<StudySession> {
        Ok(StudySession {
            topic_ids: serde_json::from_str(&self.topic_ids)?,
            session_date: self.session_date,
            created_at: self.created_at,
            id: self.id,
            user_id: self.user_id,
            subject_id: self.subject_id,
            notes: self.notes,
            duration_minutes: self.duration_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> StudyRepository {
        StudyRepository::new(Database::open_in_memory().unwrap())
    }

    fn session(subject_id: &str, topic_ids: Vec<String>) -> NewSession {
        NewSession {
            subject_id: subject_id.to_string(),
            topic_ids,
            notes: "  reviewed chapter 2 ".to_string(),
            session_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            duration_minutes: Some(45),
        }
    }

    #[test]
    fn test_subject_crud() {
        let repo = repo();
        let subject = repo
            .add_subject("u1", " Physics ", "Mechanics", "#336699")
            .unwrap();
        assert_eq!(subject.name, "Physics");

        let updated = repo
            .update_subject(
                "u1",
                &subject.id,
                SubjectUpdate {
                    name: Some("Classical Physics".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Classical Physics");
        assert_eq!(updated.color, "#336699");
        assert_eq!(repo.get_subject("u1", &subject.id).unwrap(), updated);
        assert!(matches!(
            repo.get_subject("u2", &subject.id),
            Err(Error::NotFound(_))
        ));

        // Other users cannot see or delete it
        assert!(repo.list_subjects("u2").unwrap().is_empty());
        assert!(matches!(
            repo.delete_subject("u2", &subject.id),
            Err(Error::NotFound(_))
        ));

        repo.delete_subject("u1", &subject.id).unwrap();
        assert!(repo.list_subjects("u1").unwrap().is_empty());
    }

    #[test]
    fn test_subject_validation() {
        let repo = repo();
        assert!(matches!(
            repo.add_subject("u1", "Chemistry", "", "blue"),
            Err(Error::Validation(ValidationError::InvalidColor(_)))
        ));
        assert!(matches!(
            repo.add_subject("u1", "  ", "", "#fff"),
            Err(Error::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_topic_order_and_status() {
        let repo = repo();
        let subject = repo.add_subject("u1", "Math", "", "#fff").unwrap();
        let a = repo.add_topic("u1", &subject.id, "Limits").unwrap();
        let b = repo.add_topic("u1", &subject.id, "Derivatives").unwrap();
        assert_eq!((a.order_index, b.order_index), (0, 1));

        let learned = repo
            .set_topic_status("u1", &b.id, TopicStatus::Learned)
            .unwrap();
        assert_eq!(learned.status, TopicStatus::Learned);
        assert_eq!(repo.topics_learned_count("u1").unwrap(), 1);

        let topics = repo.list_topics("u1", &subject.id).unwrap();
        assert_eq!(
            topics.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["Limits", "Derivatives"]
        );

        repo.delete_topic("u1", &a.id).unwrap();
        assert!(matches!(
            repo.delete_topic("u1", &a.id),
            Err(Error::NotFound(_))
        ));
        assert_eq!(repo.list_topics("u1", &subject.id).unwrap().len(), 1);
    }

    #[test]
    fn test_log_session_and_metrics() {
        let repo = repo();
        let subject = repo.add_subject("u1", "History", "", "#abc").unwrap();
        let topic = repo.add_topic("u1", &subject.id, "Rome").unwrap();

        let logged = repo
            .log_session("u1", session(&subject.id, vec![topic.id.clone()]))
            .unwrap();
        assert_eq!(logged.notes, "reviewed chapter 2");

        let sessions = repo.list_sessions("u1").unwrap();
        assert_eq!(sessions, vec![logged]);
        assert_eq!(repo.session_count("u1").unwrap(), 1);
        assert_eq!(repo.subject_count("u1").unwrap(), 1);
        assert_eq!(repo.session_count("u2").unwrap(), 0);
    }

    #[test]
    fn test_session_rejects_foreign_topic() {
        let repo = repo();
        let history = repo.add_subject("u1", "History", "", "#abc").unwrap();
        let math = repo.add_subject("u1", "Math", "", "#def").unwrap();
        let topic = repo.add_topic("u1", &math.id, "Algebra").unwrap();

        let err = repo
            .log_session("u1", session(&history.id, vec![topic.id.clone()]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::ForeignTopic(id)) if id == topic.id
        ));
    }

    #[test]
    fn test_delete_subject_cascades() {
        let repo = repo();
        let subject = repo.add_subject("u1", "Art", "", "#123").unwrap();
        repo.add_topic("u1", &subject.id, "Color theory").unwrap();
        repo.log_session("u1", session(&subject.id, vec![])).unwrap();

        repo.delete_subject("u1", &subject.id).unwrap();
        assert_eq!(repo.session_count("u1").unwrap(), 0);
        assert_eq!(repo.topics_learned_count("u1").unwrap(), 0);
    }

    #[test]
    fn test_unreadable_created_at_is_an_error() {
        let repo = repo();
        let subject = repo.add_subject("u1", "Music", "", "#a0a").unwrap();
        repo.log_session("u1", session(&subject.id, vec![])).unwrap();
        repo.db
            .conn()
            .execute_batch(
                "UPDATE subjects SET created_at = 9223372036854775807;
                 UPDATE study_sessions SET created_at = 9223372036854775807;",
            )
            .unwrap();

        for err in [
            repo.list_subjects("u1").unwrap_err(),
            repo.list_sessions("u1").unwrap_err(),
        ] {
            assert!(matches!(
                err,
                Error::Validation(ValidationError::StoredTimestamp {
                    field: "created_at",
                    ..
                })
            ));
        }
    }
}
