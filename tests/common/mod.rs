//! Shared test utilities for integration tests

#![allow(dead_code)]

use std::cell::RefCell;

use chrono::NaiveDate;
use tempfile::TempDir;

use studysync::Database;
use studysync::progress::{BadgeNotifier, BadgeUnlocked};
use studysync::study::{NewSession, StudyRepository, Subject};
use studysync::time::FixedClock;

/// Creates a database in a fresh temp directory
pub fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(&temp_dir.path().join("studysync.db")).expect("Failed to open database");
    (temp_dir, db)
}

/// Clock at a UTC wall time
pub fn utc_clock(y: i32, m: u32, d: u32, h: u32, min: u32) -> FixedClock {
    FixedClock::at(0, y, m, d, h, min).expect("valid test date")
}

/// Log a session without topics
pub fn log_session(study: &StudyRepository, user: &str, subject: &Subject) {
    study
        .log_session(
            user,
            NewSession {
                subject_id: subject.id.clone(),
                topic_ids: vec![],
                notes: String::new(),
                session_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
                duration_minutes: Some(30),
            },
        )
        .expect("Failed to log session");
}

/// Notifier that keeps every event it receives
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: RefCell<Vec<BadgeUnlocked>>,
}

impl RecordingNotifier {
    pub fn badge_ids(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|e| e.badge_id.clone())
            .collect()
    }
}

impl BadgeNotifier for RecordingNotifier {
    fn badge_unlocked(&self, event: &BadgeUnlocked) {
        self.events.borrow_mut().push(event.clone());
    }
}
