use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::postgres::{PostgresClient, PostgresError};
use crate::models::{ConversationAccess, ConversationSummary, Message};

impl PostgresClient {
    /// `None` when the conversation does not exist
    pub async fn conversation_access(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationAccess>, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT c.kind,
                   EXISTS (
                       SELECT 1 FROM conversation_participants p
                       WHERE p.conversation_id = c.id AND p.user_id = $2
                   ) AS is_participant,
                   m.is_active AS match_active
            FROM conversations c
            LEFT JOIN matches m ON m.id = c.match_id
            WHERE c.id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ConversationAccess {
            kind: row.get("kind"),
            is_participant: row.get("is_participant"),
            match_active: row.get("match_active"),
        }))
    }

    pub async fn conversation_participants(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, PostgresError> {
        let rows = sqlx::query("SELECT user_id FROM conversation_participants WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    /// Conversations of `user_id` by latest activity. Direct conversations of
    /// ended matches are hidden.
    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.kind, c.match_id, c.group_id, c.created_at,
                   ARRAY(
                       SELECT p2.user_id FROM conversation_participants p2
                       WHERE p2.conversation_id = c.id ORDER BY p2.joined_at
                   ) AS participant_ids,
                   (
                       SELECT COUNT(*) FROM messages um
                       WHERE um.conversation_id = c.id
                         AND um.created_at > p.last_read_at
                         AND um.sender_id <> $1
                   ) AS unread_count,
                   lm.id AS last_id, lm.sender_id AS last_sender_id,
                   lm.body AS last_body, lm.created_at AS last_created_at
            FROM conversation_participants p
            JOIN conversations c ON c.id = p.conversation_id
            LEFT JOIN matches m ON m.id = c.match_id
            LEFT JOIN LATERAL (
                SELECT id, sender_id, body, created_at FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC LIMIT 1
            ) lm ON TRUE
            WHERE p.user_id = $1
              AND (c.kind = 'group' OR m.is_active)
            ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let last_id: Option<Uuid> = row.get("last_id");
                let last_message = last_id.map(|message_id| Message {
                    id: message_id,
                    conversation_id: id,
                    sender_id: row.get("last_sender_id"),
                    body: row.get("last_body"),
                    created_at: row.get("last_created_at"),
                });

                ConversationSummary {
                    id,
                    kind: row.get("kind"),
                    match_id: row.get("match_id"),
                    group_id: row.get("group_id"),
                    participant_ids: row.get("participant_ids"),
                    last_message,
                    unread_count: row.get("unread_count"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    /// One page of history, newest first. Paging is keyset over
    /// `(created_at, id)` so messages sharing a timestamp are neither
    /// skipped nor repeated. Without `before_id` the cursor is strictly
    /// older than `before`. The flag reports older messages beyond this page.
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        before_id: Option<Uuid>,
        limit: i64,
    ) -> Result<(Vec<Message>, bool), PostgresError> {
        let mut messages: Vec<Message> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, sender_id, body, created_at
            FROM messages
            WHERE conversation_id = $1
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3::uuid))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(conversation_id)
        .bind(before)
        .bind(before_id.unwrap_or_else(Uuid::nil))
        .bind(limit + 1)
        .fetch_all(&self.pool)
        .await?;

        let has_more = messages.len() as i64 > limit;
        messages.truncate(limit.max(0) as usize);

        Ok((messages, has_more))
    }

    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> Result<Message, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let message: Message = sqlx::query_as(
            "INSERT INTO messages (id, conversation_id, sender_id, body) VALUES ($1, $2, $3, $4) \
             RETURNING id, conversation_id, sender_id, body, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body.trim())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        // Sending implies having read everything before it
        sqlx::query(
            "UPDATE conversation_participants SET last_read_at = $3 WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    pub async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> Result<(), PostgresError> {
        sqlx::query(
            "UPDATE conversation_participants SET last_read_at = NOW() WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
