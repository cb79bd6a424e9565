//! Group message history and emoji reactions

use chrono::{SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::GroupService;
use super::models::{GroupMessage, MessageAttachment, ReactionSummary};
use crate::db::{invalid_column, timestamp_column};
use crate::error::{Error, Result};
use crate::validation::{self, EMOJI_MAX, MESSAGE_MAX, ValidationError};

/// Most recent messages returned by [`GroupService::messages`]
pub const MESSAGE_HISTORY_LIMIT: u32 = 100;

const ATTACHMENT_NAME_MAX: usize = 255;
const CONTENT_TYPE_MAX: usize = 100;

impl GroupService {
    /// Post a message to a group. Members only.
    ///
    /// Content may be empty when a file is attached; it then reads
    /// `Shared: <file name>`.
    pub fn send_message(
        &self,
        user_id: &str,
        group_id: &str,
        content: &str,
        attachment: Option<MessageAttachment>,
    ) -> Result<GroupMessage> {
        let content = validation::optional_text("Message", content, MESSAGE_MAX)?;
        let attachment = attachment.map(validate_attachment).transpose()?;
        let content = match (&attachment, content.is_empty()) {
            (Some(file), true) => format!("Shared: {}", file.name),
            (None, true) => return Err(ValidationError::Required { field: "Message" }.into()),
            (_, false) => content,
        };

        let conn = self.db.conn();
        Self::require_member(&conn, group_id, user_id)?;

        let message = GroupMessage {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            content,
            attachment,
            created_at: Utc::now().trunc_subsecs(3),
        };
        let file = message.attachment.as_ref();
        conn.execute(
            r#"INSERT INTO group_messages
               (id, group_id, user_id, content, attachment_url, attachment_name, attachment_type, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            rusqlite::params![
                message.id,
                message.group_id,
                message.user_id,
                message.content,
                file.map(|f| f.url.as_str()),
                file.map(|f| f.name.as_str()),
                file.map(|f| f.content_type.as_str()),
                message.created_at.timestamp_millis(),
            ],
        )?;
        debug!(user = user_id, group = group_id, message = %message.id, "Message sent");
        Ok(message)
    }

    /// The latest [`MESSAGE_HISTORY_LIMIT`] messages of a group, oldest first. Members only.
    pub fn messages(&self, user_id: &str, group_id: &str) -> Result<Vec<GroupMessage>> {
        let conn = self.db.conn();
        Self::require_member(&conn, group_id, user_id)?;

        let mut stmt = conn.prepare(
            r#"SELECT id, group_id, user_id, content, attachment_url, attachment_name, attachment_type, created_at
               FROM (SELECT *, rowid AS seq FROM group_messages
                     WHERE group_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2)
               ORDER BY created_at, seq"#,
        )?;
        let rows = stmt.query_map(rusqlite::params![group_id, MESSAGE_HISTORY_LIMIT], message_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// React to a message. Returns `false` when the user already reacted with
    /// this emoji.
    pub fn add_reaction(&self, user_id: &str, message_id: &str, emoji: &str) -> Result<bool> {
        let emoji = validation::required_text("Emoji", emoji, EMOJI_MAX)?;
        let conn = self.db.conn();
        Self::require_message_member(&conn, message_id, user_id)?;

        let added = conn.execute(
            r#"INSERT OR IGNORE INTO message_reactions (message_id, user_id, emoji, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            rusqlite::params![message_id, user_id, emoji, Utc::now().timestamp_millis()],
        )?;
        Ok(added > 0)
    }

    /// Take back a reaction. Returns `false` when there was none.
    pub fn remove_reaction(&self, user_id: &str, message_id: &str, emoji: &str) -> Result<bool> {
        let emoji = validation::required_text("Emoji", emoji, EMOJI_MAX)?;
        let conn = self.db.conn();
        Self::require_message_member(&conn, message_id, user_id)?;

        let removed = conn.execute(
            "DELETE FROM message_reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            [message_id, user_id, emoji.as_str()],
        )?;
        Ok(removed > 0)
    }

    /// Reaction counts per emoji, in the order each emoji was first used
    pub fn reactions(&self, user_id: &str, message_id: &str) -> Result<Vec<ReactionSummary>> {
        let conn = self.db.conn();
        Self::require_message_member(&conn, message_id, user_id)?;

        let mut stmt = conn.prepare(
            r#"SELECT emoji, COUNT(*), MAX(user_id = ?2) FROM message_reactions
               WHERE message_id = ?1
               GROUP BY emoji
               ORDER BY MIN(created_at), MIN(rowid)"#,
        )?;
        let rows = stmt.query_map([message_id, user_id], |r| {
            Ok(ReactionSummary {
                emoji: r.get(0)?,
                count: r.get(1)?,
                reacted: r.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn require_message_member(conn: &Connection, message_id: &str, user_id: &str) -> Result<()> {
        let group_id: String = conn
            .query_row(
                "SELECT group_id FROM group_messages WHERE id = ?1",
                [message_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;
        Self::require_member(conn, &group_id, user_id)?;
        Ok(())
    }
}

fn validate_attachment(file: MessageAttachment) -> std::result::Result<MessageAttachment, ValidationError> {
    Ok(MessageAttachment {
        url: validation::url(&file.url)?,
        name: validation::required_text("Attachment name", &file.name, ATTACHMENT_NAME_MAX)?,
        content_type: validation::required_text(
            "Attachment type",
            &file.content_type,
            CONTENT_TYPE_MAX,
        )?,
    })
}

fn message_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMessage> {
    let attachment = match (
        r.get::<_, Option<String>>(4)?,
        r.get::<_, Option<String>>(5)?,
        r.get::<_, Option<String>>(6)?,
    ) {
        (Some(url), Some(name), Some(content_type)) => Some(MessageAttachment {
            url,
            name,
            content_type,
        }),
        (None, None, None) => None,
        _ => {
            return Err(invalid_column(
                4,
                Type::Text,
                ValidationError::Required {
                    field: "Attachment url, name and type",
                },
            ));
        }
    };

    Ok(GroupMessage {
        id: r.get(0)?,
        group_id: r.get(1)?,
        user_id: r.get(2)?,
        content: r.get(3)?,
        attachment,
        created_at: timestamp_column(r, 7, "created_at")?,
    })
}
