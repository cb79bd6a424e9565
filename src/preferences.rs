//! Theme and avatar preferences stored on the user profile
//!
//! Both are persisted as JSON. Parsing is strict: unknown fields, unknown
//! enum values and malformed colors are rejected with
//! [`ValidationError::Preference`] instead of silently falling back to the
//! defaults.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::Result;
use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    #[default]
    Blue,
    Purple,
    Green,
    Orange,
    Pink,
    Teal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemePreference {
    pub mode: ThemeMode,
    pub accent: AccentColor,
}

impl ThemePreference {
    pub fn from_json(json: &str) -> std::result::Result<Self, ValidationError> {
        parse_strict("theme", json)
    }

    pub fn toggled(self) -> Self {
        let mode = match self.mode {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        };
        Self { mode, ..self }
    }
}

impl FromStr for ThemeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_strict("theme", &format!("\"{s}\""))
    }
}

impl FromStr for AccentColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_strict("theme", &format!("\"{s}\""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    #[default]
    Round,
    Oval,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HairStyle {
    #[default]
    Short,
    Long,
    Curly,
    Bald,
    Spiky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeStyle {
    #[default]
    Normal,
    Happy,
    Sleepy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessory {
    #[default]
    None,
    Glasses,
    Headphones,
    Hat,
}

/// Procedural avatar settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AvatarConfig {
    pub face_shape: FaceShape,
    /// Hex color
    pub skin_tone: String,
    pub hair_style: HairStyle,
    /// Hex color
    pub hair_color: String,
    pub eye_style: EyeStyle,
    pub accessory: Accessory,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            face_shape: FaceShape::Round,
            skin_tone: "#FFDFC4".to_string(),
            hair_style: HairStyle::Short,
            hair_color: "#2C1810".to_string(),
            eye_style: EyeStyle::Normal,
            accessory: Accessory::None,
        }
    }
}

impl AvatarConfig {
    pub fn from_json(json: &str) -> std::result::Result<Self, ValidationError> {
        let config: Self = parse_strict("avatar", json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        for value in [&self.skin_tone, &self.hair_color] {
            validation::color(value).map_err(|e| ValidationError::Preference {
                kind: "avatar",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

fn parse_strict<T: DeserializeOwned>(
    kind: &'static str,
    json: &str,
) -> std::result::Result<T, ValidationError> {
    serde_json::from_str(json).map_err(|e| ValidationError::Preference {
        kind,
        reason: e.to_string(),
    })
}

/// Per-user preference storage in the `profiles` table
#[derive(Clone)]
pub struct ProfileStore {
    db: Database,
}

impl ProfileStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stored theme, or the default when none has been saved
    pub fn theme(&self, user_id: &str) -> Result<ThemePreference> {
        match self.load_column(user_id, "theme_preference")? {
            Some(json) => Ok(ThemePreference::from_json(&json)?),
            None => Ok(ThemePreference::default()),
        }
    }

    pub fn set_theme(&self, user_id: &str, theme: ThemePreference) -> Result<()> {
        self.store_column(user_id, "theme_preference", &serde_json::to_string(&theme)?)
    }

    /// Stored avatar, or the default when none has been saved
    pub fn avatar(&self, user_id: &str) -> Result<AvatarConfig> {
        match self.load_column(user_id, "avatar_config")? {
            Some(json) => Ok(AvatarConfig::from_json(&json)?),
            None => Ok(AvatarConfig::default()),
        }
    }

    pub fn set_avatar(&self, user_id: &str, avatar: &AvatarConfig) -> Result<()> {
        avatar.validate()?;
        self.store_column(user_id, "avatar_config", &serde_json::to_string(avatar)?)
    }

    // `column` is always one of the two literals above
    fn load_column(&self, user_id: &str, column: &str) -> Result<Option<String>> {
        let conn = self.db.conn();
        let value: Option<Option<String>> = conn
            .query_row(
                &format!("SELECT {column} FROM profiles WHERE user_id = ?1"),
                [user_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    fn store_column(&self, user_id: &str, column: &str, json: &str) -> Result<()> {
        let conn = self.db.conn();
        conn.execute(
            &format!(
                r#"INSERT INTO profiles (user_id, {column}, created_at) VALUES (?1, ?2, ?3)
                   ON CONFLICT(user_id) DO UPDATE SET {column} = excluded.{column}"#
            ),
            rusqlite::params![user_id, json, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}
