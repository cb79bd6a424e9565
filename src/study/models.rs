//! Data models for study tracking

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Learning status of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicStatus {
    #[default]
    NotStarted,
    InProgress,
    Learned,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Learned => "learned",
        }
    }
}

impl FromStr for TopicStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "learned" => Ok(Self::Learned),
            other => Err(ValidationError::UnknownTopicStatus(other.to_string())),
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a subject; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct SubjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub status: TopicStatus,
    pub order_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub user_id: String,
    pub subject_id: String,
    pub topic_ids: Vec<String>,
    pub notes: String,
    pub session_date: NaiveDate,
    pub duration_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Input for logging a study session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub subject_id: String,
    pub topic_ids: Vec<String>,
    pub notes: String,
    pub session_date: NaiveDate,
    pub duration_minutes: Option<u32>,
}

/// Summary of the last seven days
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub total_sessions: u64,
    pub total_duration_minutes: u64,
    /// All-time learned topics
    pub topics_completed: u64,
    pub most_studied_subject: Option<String>,
    /// 0..=100, one session per day is 100
    pub consistency_score: u8,
    pub previous_week_sessions: u64,
}

/// Activity on a single day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub sessions: u64,
    /// Distinct subject ids studied that day
    pub subjects: Vec<String>,
}
