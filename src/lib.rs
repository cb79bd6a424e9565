//! StudySync - study progress tracking
//!
//! StudySync records subjects, topics and study sessions and turns them into
//! motivation: a daily study streak and a catalog of achievement badges.
//!
//! ## Layout
//!
//! - [`study`]: subjects, topics, sessions and weekly/daily analytics
//! - [`progress`]: streak engine, badge evaluator and the tracker that runs
//!   both after every logged session
//! - [`groups`]: study groups joined by invite code, with message history
//!   and emoji reactions
//! - [`materials`]: links and PDFs, optionally shared with a group
//! - [`preferences`]: strictly validated theme and avatar settings
//! - [`db`]: the shared SQLite database

pub mod config;
pub mod db;
pub mod error;
pub mod groups;
pub mod materials;
pub mod preferences;
pub mod progress;
pub mod study;
pub mod time;
pub mod validation;

pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use validation::ValidationError;
