//! Study materials: links and PDFs a user collects and shares
//!
//! A material is visible to its author and, once shared, to every member of
//! its group. Only the author may delete or share it.

mod models;

pub use models::{MaterialKind, NewMaterial, StudyMaterial};

use chrono::{SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{Database, invalid_column, timestamp_column};
use crate::error::{Error, Result};
use crate::groups::GroupService;
use crate::validation::{self, MATERIAL_DESCRIPTION_MAX, MATERIAL_TITLE_MAX, stored_count};

const MATERIAL_COLUMNS: &str =
    "id, user_id, title, description, kind, url, subject_id, group_id, useful_count, created_at";

/// Material storage and sharing
#[derive(Clone)]
pub struct MaterialLibrary {
    db: Database,
}

impl MaterialLibrary {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a material. A subject must be the author's own; a group must be
    /// one the author belongs to.
    pub fn add_material(&self, user_id: &str, material: NewMaterial) -> Result<StudyMaterial> {
        let record = StudyMaterial {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: validation::required_text("Title", &material.title, MATERIAL_TITLE_MAX)?,
            description: validation::optional_text(
                "Description",
                &material.description,
                MATERIAL_DESCRIPTION_MAX,
            )?,
            kind: material.kind,
            url: validation::url(&material.url)?,
            subject_id: material.subject_id,
            group_id: material.group_id,
            useful_count: 0,
            created_at: Utc::now().trunc_subsecs(3),
        };

        let conn = self.db.conn();
        if let Some(subject_id) = &record.subject_id {
            Self::require_own_subject(&conn, user_id, subject_id)?;
        }
        if let Some(group_id) = &record.group_id {
            GroupService::require_member(&conn, group_id, user_id)?;
        }

        conn.execute(
            &format!(
                "INSERT INTO study_materials ({MATERIAL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            rusqlite::params![
                record.id,
                record.user_id,
                record.title,
                record.description,
                record.kind.as_str(),
                record.url,
                record.subject_id,
                record.group_id,
                record.useful_count,
                record.created_at.timestamp_millis(),
            ],
        )?;
        debug!(user = user_id, material = %record.id, kind = %record.kind, "Material added");
        Ok(record)
    }

    /// Materials the user wrote or that are shared with one of their groups, newest first
    pub fn list_materials(&self, user_id: &str) -> Result<Vec<StudyMaterial>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            r#"SELECT {MATERIAL_COLUMNS} FROM study_materials
               WHERE user_id = ?1
                  OR group_id IN (SELECT group_id FROM group_memberships WHERE user_id = ?1)
               ORDER BY created_at DESC, rowid DESC"#
        ))?;
        let rows = stmt.query_map([user_id], material_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Materials shared with a group. Members only.
    pub fn group_materials(&self, user_id: &str, group_id: &str) -> Result<Vec<StudyMaterial>> {
        let conn = self.db.conn();
        GroupService::require_member(&conn, group_id, user_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM study_materials WHERE group_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([group_id], material_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete one of the user's own materials
    pub fn delete_material(&self, user_id: &str, material_id: &str) -> Result<()> {
        let conn = self.db.conn();
        let deleted = conn.execute(
            "DELETE FROM study_materials WHERE id = ?1 AND user_id = ?2",
            [material_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("material {material_id}")));
        }
        debug!(user = user_id, material = material_id, "Material deleted");
        Ok(())
    }

    /// Count one more "useful" vote on a visible material; returns the new count
    pub fn mark_useful(&self, user_id: &str, material_id: &str) -> Result<u32> {
        let conn = self.db.conn();
        let count: i64 = conn
            .query_row(
                r#"UPDATE study_materials SET useful_count = useful_count + 1
                   WHERE id = ?1
                     AND (user_id = ?2
                          OR group_id IN (SELECT group_id FROM group_memberships WHERE user_id = ?2))
                   RETURNING useful_count"#,
                [material_id, user_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("material {material_id}")))?;
        Ok(stored_count("useful_count", count)?)
    }

    /// Share one of the user's own materials with a group they belong to
    pub fn share_to_group(
        &self,
        user_id: &str,
        material_id: &str,
        group_id: &str,
    ) -> Result<StudyMaterial> {
        let conn = self.db.conn();
        GroupService::require_member(&conn, group_id, user_id)?;

        let updated = conn.execute(
            "UPDATE study_materials SET group_id = ?1 WHERE id = ?2 AND user_id = ?3",
            [group_id, material_id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("material {material_id}")));
        }

        info!(user = user_id, material = material_id, group = group_id, "Material shared");
        Ok(conn.query_row(
            &format!("SELECT {MATERIAL_COLUMNS} FROM study_materials WHERE id = ?1"),
            [material_id],
            material_from_row,
        )?)
    }

    fn require_own_subject(conn: &Connection, user_id: &str, subject_id: &str) -> Result<()> {
        let owned: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM subjects WHERE id = ?1 AND user_id = ?2",
            [subject_id, user_id],
            |r| r.get(0),
        )?;
        if owned {
            Ok(())
        } else {
            Err(Error::NotFound(format!("subject {subject_id}")))
        }
    }
}

fn material_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StudyMaterial> {
    let kind: String = r.get(4)?;
    let useful_count: i64 = r.get(8)?;
    Ok(StudyMaterial {
        id: r.get(0)?,
        user_id: r.get(1)?,
        title: r.get(2)?,
        description: r.get(3)?,
        kind: kind.parse().map_err(|e| invalid_column(4, Type::Text, e))?,
        url: r.get(5)?,
        subject_id: r.get(6)?,
        group_id: r.get(7)?,
        useful_count: stored_count("useful_count", useful_count)
            .map_err(|e| invalid_column(8, Type::Integer, e))?,
        created_at: timestamp_column(r, 9, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::StudyRepository;
    use crate::validation::ValidationError;

    fn link(title: &str, url: &str) -> NewMaterial {
        NewMaterial {
            title: title.to_string(),
            description: String::new(),
            kind: MaterialKind::Link,
            url: url.to_string(),
            subject_id: None,
            group_id: None,
        }
    }

    fn setup() -> (Database, MaterialLibrary, GroupService) {
        let db = Database::open_in_memory().unwrap();
        (db.clone(), MaterialLibrary::new(db.clone()), GroupService::new(db))
    }

    #[test]
    fn test_add_and_list() {
        let (db, library, _) = setup();
        let subject = StudyRepository::new(db)
            .add_subject("alice", "Physics", "", "#123456")
            .unwrap();

        let notes = library
            .add_material(
                "alice",
                NewMaterial {
                    kind: MaterialKind::Pdf,
                    subject_id: Some(subject.id.clone()),
                    ..link(" Lecture notes ", "https://example.com/notes.pdf")
                },
            )
            .unwrap();
        assert_eq!(notes.title, "Lecture notes");
        assert_eq!(notes.useful_count, 0);

        let video = library
            .add_material("alice", link("Video", "https://video.example.org/watch?v=1"))
            .unwrap();

        assert_eq!(library.list_materials("alice").unwrap(), vec![video, notes]);
        assert!(library.list_materials("bob").unwrap().is_empty());
    }

    #[test]
    fn test_add_validation() {
        let (_, library, _) = setup();
        assert!(matches!(
            library.add_material("alice", link("Docs", "docs.example.com")),
            Err(Error::Validation(ValidationError::InvalidUrl(_)))
        ));
        assert!(matches!(
            library.add_material("alice", link("  ", "https://example.com")),
            Err(Error::Validation(ValidationError::Required { .. }))
        ));
        assert!(matches!(
            library.add_material(
                "alice",
                NewMaterial {
                    subject_id: Some("missing".to_string()),
                    ..link("Docs", "https://example.com")
                }
            ),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_share_to_group_makes_it_visible_to_members() {
        let (_, library, groups) = setup();
        let group = groups.create_group("alice", "Physics club", "").unwrap();
        groups.join_group("bob", &group.invite_code).unwrap();
        let material = library
            .add_material("alice", link("Formulas", "https://example.com/f"))
            .unwrap();

        // Bob cannot share Alice's material, and Carol is not in the group
        assert!(matches!(
            library.share_to_group("bob", &material.id, &group.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            library.share_to_group("carol", &material.id, &group.id),
            Err(Error::Forbidden(_))
        ));

        let shared = library
            .share_to_group("alice", &material.id, &group.id)
            .unwrap();
        assert_eq!(shared.group_id.as_deref(), Some(group.id.as_str()));
        assert_eq!(library.list_materials("bob").unwrap(), vec![shared.clone()]);
        assert_eq!(library.group_materials("bob", &group.id).unwrap(), vec![shared]);
        assert!(library.list_materials("carol").unwrap().is_empty());
        assert!(matches!(
            library.group_materials("carol", &group.id),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_mark_useful_counts_votes() {
        let (_, library, groups) = setup();
        let group = groups.create_group("alice", "Chemistry", "").unwrap();
        groups.join_group("bob", &group.invite_code).unwrap();
        let material = library
            .add_material(
                "alice",
                NewMaterial {
                    group_id: Some(group.id.clone()),
                    ..link("Periodic table", "https://example.com/table")
                },
            )
            .unwrap();

        assert_eq!(library.mark_useful("alice", &material.id).unwrap(), 1);
        assert_eq!(library.mark_useful("bob", &material.id).unwrap(), 2);
        assert!(matches!(
            library.mark_useful("carol", &material.id),
            Err(Error::NotFound(_))
        ));
        assert_eq!(library.list_materials("alice").unwrap()[0].useful_count, 2);
    }

    #[test]
    fn test_delete_is_author_only() {
        let (_, library, _) = setup();
        let material = library
            .add_material("alice", link("Flashcards", "https://example.com/cards"))
            .unwrap();

        assert!(matches!(
            library.delete_material("bob", &material.id),
            Err(Error::NotFound(_))
        ));
        library.delete_material("alice", &material.id).unwrap();
        assert!(library.list_materials("alice").unwrap().is_empty());
    }

    #[test]
    fn test_group_delete_unshares_material() {
        let (_, library, groups) = setup();
        let group = groups.create_group("alice", "Biology", "").unwrap();
        library
            .add_material(
                "alice",
                NewMaterial {
                    group_id: Some(group.id.clone()),
                    ..link("Cell diagram", "https://example.com/cell")
                },
            )
            .unwrap();

        groups.delete_group("alice", &group.id).unwrap();
        let materials = library.list_materials("alice").unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].group_id, None);
    }

    #[test]
    fn test_unknown_stored_kind_is_an_error() {
        let (db, library, _) = setup();
        library
            .add_material("alice", link("Slides", "https://example.com/s"))
            .unwrap();
        db.conn()
            .execute("UPDATE study_materials SET kind = 'video'", [])
            .unwrap();

        assert!(matches!(
            library.list_materials("alice"),
            Err(Error::Validation(ValidationError::UnknownMaterialKind(kind))) if kind == "video"
        ));
    }
}
