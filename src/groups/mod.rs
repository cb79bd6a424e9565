//! Study groups and invite-code membership
//!
//! A group is created by an admin and joined by other users through its
//! invite code. Only admins may delete a group; deleting it removes every
//! membership.

mod messages;
mod models;

pub use messages::MESSAGE_HISTORY_LIMIT;
pub use models::{
    GroupMember, GroupMessage, GroupRole, JoinedGroup, MessageAttachment, ReactionSummary,
    StudyGroup,
};

use chrono::{SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{Database, timestamp_column};
use crate::error::{Error, Result};
use crate::validation::{self, DESCRIPTION_MAX, GROUP_NAME_MAX};

/// Length of generated invite codes
const INVITE_CODE_LEN: usize = 8;

/// Invite codes drawn before giving up on a clash
const INVITE_CODE_ATTEMPTS: u32 = 5;

/// Group membership operations
#[derive(Clone)]
pub struct GroupService {
    db: Database,
}

impl GroupService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a group; the creator becomes its admin
    pub fn create_group(&self, creator: &str, name: &str, description: &str) -> Result<StudyGroup> {
        self.create_group_with(creator, name, description, new_invite_code)
    }

    /// Insert a group, drawing a fresh invite code from `next_code` while the
    /// previous one is already taken
    fn create_group_with(
        &self,
        creator: &str,
        name: &str,
        description: &str,
        mut next_code: impl FnMut() -> String,
    ) -> Result<StudyGroup> {
        let id = Uuid::new_v4().to_string();
        let name = validation::required_text("Group name", name, GROUP_NAME_MAX)?;
        let description = validation::optional_text("Description", description, DESCRIPTION_MAX)?;
        let created_at = Utc::now().trunc_subsecs(3);
        let created_ms = created_at.timestamp_millis();

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let mut attempt = 1;
        let invite_code = loop {
            let code = next_code();
            let inserted = tx.execute(
                r#"INSERT INTO study_groups (id, name, description, invite_code, created_by, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                rusqlite::params![id, name, description, code, creator, created_ms],
            );
            match inserted {
                Ok(_) => break code,
                Err(err) if is_unique_violation(&err) && attempt < INVITE_CODE_ATTEMPTS => {
                    debug!(attempt, "Invite code already in use, drawing another");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        };
        tx.execute(
            "INSERT INTO group_memberships (group_id, user_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, creator, GroupRole::Admin.as_str(), created_ms],
        )?;
        tx.commit()?;

        info!(group = %id, creator, "Study group created");
        Ok(StudyGroup {
            id,
            name,
            description,
            invite_code,
            created_by: creator.to_string(),
            created_at,
        })
    }

    /// Join a group by invite code.
    ///
    /// The code is trimmed and lowercased before lookup.
    pub fn join_group(&self, user_id: &str, invite_code: &str) -> Result<JoinedGroup> {
        let code = validation::invite_code(invite_code)?;
        let conn = self.db.conn();

        let (group_id, group_name): (String, String) = conn
            .query_row(
                "SELECT id, name FROM study_groups WHERE invite_code = ?1",
                [code.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound("Invalid invite code".to_string()))?;

        if Self::role_of(&conn, &group_id, user_id)?.is_some() {
            return Err(Error::AlreadyMember { group_id });
        }

        conn.execute(
            "INSERT INTO group_memberships (group_id, user_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                group_id,
                user_id,
                GroupRole::Member.as_str(),
                Utc::now().timestamp_millis(),
            ],
        )?;

        info!(user = user_id, group = %group_id, "User joined group");
        Ok(JoinedGroup {
            group_id,
            group_name,
        })
    }

    pub fn leave_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        let conn = self.db.conn();
        let removed = conn.execute(
            "DELETE FROM group_memberships WHERE group_id = ?1 AND user_id = ?2",
            [group_id, user_id],
        )?;
        if removed == 0 {
            return Err(Error::NotFound(format!("membership in group {group_id}")));
        }
        info!(user = user_id, group = group_id, "User left group");
        Ok(())
    }

    /// Delete a group and all memberships. Admins only.
    pub fn delete_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        let conn = self.db.conn();
        if Self::require_member(&conn, group_id, user_id)? != GroupRole::Admin {
            return Err(Error::Forbidden(
                "only group admins can delete a group".to_string(),
            ));
        }

        conn.execute("DELETE FROM study_groups WHERE id = ?1", [group_id])?;
        info!(user = user_id, group = group_id, "Study group deleted");
        Ok(())
    }

    /// Members of a group, in join order
    pub fn members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT user_id, role, joined_at FROM group_memberships
               WHERE group_id = ?1 ORDER BY joined_at, rowid"#,
        )?;
        let rows = stmt.query_map([group_id], |r| {
            Ok(GroupMember {
                user_id: r.get(0)?,
                role: role_column(r, 1)?,
                joined_at: timestamp_column(r, 2, "joined_at")?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Groups the user belongs to, with the user's role in each
    pub fn list_groups(&self, user_id: &str) -> Result<Vec<(StudyGroup, GroupRole)>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT g.id, g.name, g.description, g.invite_code, g.created_by, g.created_at, m.role
               FROM study_groups g
               JOIN group_memberships m ON m.group_id = g.id
               WHERE m.user_id = ?1
               ORDER BY g.name"#,
        )?;
        let rows = stmt.query_map([user_id], |r| {
            let group = StudyGroup {
                id: r.get(0)?,
                name: r.get(1)?,
                description: r.get(2)?,
                invite_code: r.get(3)?,
                created_by: r.get(4)?,
                created_at: timestamp_column(r, 5, "created_at")?,
            };
            Ok((group, role_column(r, 6)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Role of `user_id` in an existing group: `NotFound` for an unknown
    /// group, `Forbidden` for a non-member
    pub(crate) fn require_member(
        conn: &Connection,
        group_id: &str,
        user_id: &str,
    ) -> Result<GroupRole> {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM study_groups WHERE id = ?1",
            [group_id],
            |r| r.get(0),
        )?;
        if !exists {
            return Err(Error::NotFound(format!("group {group_id}")));
        }
        Self::role_of(conn, group_id, user_id)?
            .ok_or_else(|| Error::Forbidden(format!("not a member of group {group_id}")))
    }

    fn role_of(conn: &Connection, group_id: &str, user_id: &str) -> Result<Option<GroupRole>> {
        Ok(conn
            .query_row(
                "SELECT role FROM group_memberships WHERE group_id = ?1 AND user_id = ?2",
                [group_id, user_id],
                |r| role_column(r, 0),
            )
            .optional()?)
    }
}

fn new_invite_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(INVITE_CODE_LEN);
    code
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn role_column(r: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<GroupRole> {
    let text: String = r.get(idx)?;
    text.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    fn service() -> GroupService {
        GroupService::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_invite_code_shape() {
        let code = new_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(validation::invite_code(&code).is_ok());
    }

    fn fixed_codes(codes: &[&str]) -> impl FnMut() -> String {
        let mut codes: Vec<String> = codes.iter().rev().map(|c| c.to_string()).collect();
        move || codes.pop().unwrap()
    }

    #[test]
    fn test_invite_code_clash_draws_again() {
        let groups = service();
        let first = groups
            .create_group_with("alice", "Algebra", "", fixed_codes(&["aaaa1111"]))
            .unwrap();
        let second = groups
            .create_group_with("bob", "Geometry", "", fixed_codes(&["aaaa1111", "bbbb2222"]))
            .unwrap();

        assert_eq!(first.invite_code, "aaaa1111");
        assert_eq!(second.invite_code, "bbbb2222");
        assert_eq!(groups.join_group("carol", "bbbb2222").unwrap().group_id, second.id);
    }

    #[test]
    fn test_invite_code_clash_gives_up() {
        let groups = service();
        groups
            .create_group_with("alice", "Algebra", "", fixed_codes(&["aaaa1111"]))
            .unwrap();

        let taken = ["aaaa1111"; INVITE_CODE_ATTEMPTS as usize];
        let err = groups
            .create_group_with("bob", "Geometry", "", fixed_codes(&taken))
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(groups.list_groups("bob").unwrap().is_empty());
    }

    #[test]
    fn test_create_makes_creator_admin() {
        let groups = service();
        let group = groups.create_group("alice", "Calculus crew", "").unwrap();

        let members = groups.members(&group.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "alice");
        assert_eq!(members[0].role, GroupRole::Admin);
    }

    #[test]
    fn test_join_normalizes_code() {
        let groups = service();
        let group = groups.create_group("alice", "Biology", "").unwrap();

        let joined = groups
            .join_group("bob", &format!("  {}  ", group.invite_code.to_uppercase()))
            .unwrap();
        assert_eq!(joined.group_id, group.id);
        assert_eq!(joined.group_name, "Biology");

        let roles: Vec<_> = groups
            .members(&group.id)
            .unwrap()
            .into_iter()
            .map(|m| (m.user_id, m.role))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("alice".to_string(), GroupRole::Admin),
                ("bob".to_string(), GroupRole::Member)
            ]
        );
    }

    #[test]
    fn test_join_errors() {
        let groups = service();
        let group = groups.create_group("alice", "Biology", "").unwrap();

        assert!(matches!(
            groups.join_group("bob", "not-a-code!"),
            Err(Error::Validation(ValidationError::InvalidInviteCode))
        ));
        assert!(matches!(
            groups.join_group("bob", "abc123"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            groups.join_group("alice", &group.invite_code),
            Err(Error::AlreadyMember { .. })
        ));
    }

    #[test]
    fn test_only_admin_can_delete() {
        let groups = service();
        let group = groups.create_group("alice", "Chemistry", "").unwrap();
        groups.join_group("bob", &group.invite_code).unwrap();

        assert!(matches!(
            groups.delete_group("bob", &group.id),
            Err(Error::Forbidden(_))
        ));
        groups.delete_group("alice", &group.id).unwrap();
        assert!(groups.members(&group.id).unwrap().is_empty());
        assert!(groups.list_groups("bob").unwrap().is_empty());
    }

    #[test]
    fn test_leave_group() {
        let groups = service();
        let group = groups.create_group("alice", "Physics", "").unwrap();
        groups.join_group("bob", &group.invite_code).unwrap();

        groups.leave_group("bob", &group.id).unwrap();
        assert!(matches!(
            groups.leave_group("bob", &group.id),
            Err(Error::NotFound(_))
        ));
        assert_eq!(groups.list_groups("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_join_time_is_an_error() {
        let groups = service();
        let group = groups.create_group("alice", "History", "").unwrap();
        groups
            .db
            .conn()
            .execute("UPDATE group_memberships SET joined_at = ?1", [i64::MIN])
            .unwrap();

        assert!(matches!(
            groups.members(&group.id),
            Err(Error::Validation(ValidationError::StoredTimestamp {
                field: "joined_at",
                ..
            }))
        ));
    }
}
