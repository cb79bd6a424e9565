//! Study material models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// What a material points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Pdf,
    Link,
}

impl MaterialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Link => "link",
        }
    }
}

impl FromStr for MaterialKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(Self::Pdf),
            "link" => Ok(Self::Link),
            other => Err(ValidationError::UnknownMaterialKind(other.to_string())),
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyMaterial {
    pub id: String,
    /// Author
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub kind: MaterialKind,
    pub url: String,
    pub subject_id: Option<String>,
    /// Group the material is shared with, if any
    pub group_id: Option<String>,
    pub useful_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a material
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub title: String,
    pub description: String,
    pub kind: MaterialKind,
    pub url: String,
    pub subject_id: Option<String>,
    pub group_id: Option<String>,
}
