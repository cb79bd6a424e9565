//! Input validation shared by the study, group and progress layers
//!
//! Every check fails fast with a typed [`ValidationError`] instead of clamping
//! or falling back to defaults.

use once_cell::sync::Lazy;
use regex::Regex;

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("valid color regex"));

static INVITE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+$").expect("valid invite code regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+(?:[/?#]\S*)?$").expect("valid url regex"));

pub const SUBJECT_NAME_MAX: usize = 100;
pub const TOPIC_NAME_MAX: usize = 200;
pub const GROUP_NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const NOTES_MAX: usize = 5000;
pub const INVITE_CODE_MAX: usize = 50;
pub const MATERIAL_TITLE_MAX: usize = 200;
pub const MATERIAL_DESCRIPTION_MAX: usize = 1000;
pub const URL_MAX: usize = 2000;
pub const MESSAGE_MAX: usize = 2000;
pub const EMOJI_MAX: usize = 16;
pub const ACTIVITY_DAYS_MAX: u32 = 366;

/// Malformed input rejected at a module boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid color format: {0}")]
    InvalidColor(String),

    #[error("Invite code must be alphanumeric")]
    InvalidInviteCode,

    #[error("{metric} must not be negative (got {value})")]
    NegativeMetric { metric: &'static str, value: i64 },

    #[error("Unknown badge: {0}")]
    UnknownBadge(String),

    #[error("Badge {0} must have a positive threshold")]
    InvalidThreshold(String),

    #[error("Badge {0} is defined more than once")]
    DuplicateBadge(String),

    #[error("Progress for badge {badge_id} is out of range: {progress}")]
    ProgressOutOfRange { badge_id: String, progress: i64 },

    #[error("Unknown topic status: {0}")]
    UnknownTopicStatus(String),

    #[error("Topic {0} does not belong to the session's subject")]
    ForeignTopic(String),

    #[error("Invalid {kind} preference: {reason}")]
    Preference { kind: &'static str, reason: String },

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Unknown material type: {0} (expected pdf or link)")]
    UnknownMaterialKind(String),

    #[error("Activity range must be 1..={max} days (got {days})")]
    DaysOutOfRange { days: u32, max: u32 },

    #[error("Stored {field} is out of range: {value}")]
    StoredCountOutOfRange { field: &'static str, value: i64 },

    #[error("Stored {field} is not a valid timestamp: {value}")]
    StoredTimestamp { field: &'static str, value: i64 },

    #[error("Stored streak is inconsistent: longest {longest} < current {current}")]
    InconsistentStreak { current: u32, longest: u32 },
}

/// Trim `value` and require 1..=`max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    optional_text(field, trimmed, max)
}

/// Trim `value` and require at most `max` characters (empty allowed).
pub fn optional_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Hex color in `#rgb` or `#rrggbb` form.
pub fn color(value: &str) -> Result<String, ValidationError> {
    if COLOR_RE.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ValidationError::InvalidColor(value.to_string()))
    }
}

/// Normalize an invite code: trimmed, lowercased, 1..=50 chars of `[a-z0-9]`.
pub fn invite_code(value: &str) -> Result<String, ValidationError> {
    let code = value.trim().to_lowercase();
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "Invite code",
        });
    }
    if code.chars().count() > INVITE_CODE_MAX {
        return Err(ValidationError::TooLong {
            field: "Invite code",
            max: INVITE_CODE_MAX,
        });
    }
    if !INVITE_CODE_RE.is_match(&code) {
        return Err(ValidationError::InvalidInviteCode);
    }
    Ok(code)
}

/// `http(s)` URL with a dotted host, at most 2000 characters.
pub fn url(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field: "URL" });
    }
    if trimmed.chars().count() > URL_MAX {
        return Err(ValidationError::TooLong {
            field: "URL",
            max: URL_MAX,
        });
    }
    if !URL_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidUrl(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Number of days for an activity report.
pub fn activity_days(days: u32) -> Result<u32, ValidationError> {
    if (1..=ACTIVITY_DAYS_MAX).contains(&days) {
        Ok(days)
    } else {
        Err(ValidationError::DaysOutOfRange {
            days,
            max: ACTIVITY_DAYS_MAX,
        })
    }
}

/// Non-negative count read back from storage.
pub fn stored_count(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| ValidationError::StoredCountOutOfRange { field, value })
}
