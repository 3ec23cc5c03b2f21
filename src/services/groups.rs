use sqlx::Row;
use uuid::Uuid;

use super::postgres::{like_pattern, PostgresClient, PostgresError};
use crate::models::{ConversationKind, CreateGroupRequest, GroupRole, JoinOutcome, TravelGroup};

const GROUP_SELECT: &str = r#"
    SELECT g.id, g.name, g.description, g.destination, g.start_date, g.end_date,
           g.max_members, g.owner_id, g.is_public, g.created_at,
           (SELECT COUNT(*) FROM group_members gm WHERE gm.group_id = g.id) AS member_count,
           c.id AS conversation_id
    FROM travel_groups g
    LEFT JOIN conversations c ON c.group_id = g.id
"#;

impl PostgresClient {
    /// Create a group owned by `owner_id`, along with its group conversation
    pub async fn create_group(
        &self,
        owner_id: Uuid,
        request: &CreateGroupRequest,
    ) -> Result<TravelGroup, PostgresError> {
        let group_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO travel_groups (id, name, description, destination, start_date, end_date, max_members, owner_id, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(group_id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.destination.trim())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.max_members)
        .bind(owner_id)
        .bind(request.is_public)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group_id)
            .bind(owner_id)
            .bind(GroupRole::Owner)
            .execute(&mut *tx)
            .await?;

        let conversation_id = Uuid::new_v4();
        sqlx::query("INSERT INTO conversations (id, kind, group_id) VALUES ($1, $2, $3)")
            .bind(conversation_id)
            .bind(ConversationKind::Group)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO conversation_participants (conversation_id, user_id) VALUES ($1, $2)")
            .bind(conversation_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("User {} created group {}", owner_id, group_id);

        self.get_group(group_id)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Group not found".to_string()))
    }

    pub async fn get_group(&self, group_id: Uuid) -> Result<Option<TravelGroup>, PostgresError> {
        let query = format!("{} WHERE g.id = $1", GROUP_SELECT);
        Ok(sqlx::query_as(&query).bind(group_id).fetch_optional(&self.pool).await?)
    }

    pub async fn is_group_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, PostgresError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2) AS member")
            .bind(group_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("member"))
    }

    /// Public groups plus private ones `viewer_id` belongs to, soonest trip first
    pub async fn list_groups(
        &self,
        viewer_id: Uuid,
        destination: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TravelGroup>, PostgresError> {
        let query = format!(
            r#"{}
            WHERE (g.is_public OR EXISTS (
                      SELECT 1 FROM group_members gm2 WHERE gm2.group_id = g.id AND gm2.user_id = $1
                  ))
              AND ($2::text IS NULL OR g.destination ILIKE $2)
            ORDER BY g.start_date ASC NULLS LAST, g.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            GROUP_SELECT
        );

        let pattern = destination.map(str::trim).filter(|d| !d.is_empty()).map(like_pattern);

        Ok(sqlx::query_as(&query)
            .bind(viewer_id)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Join a group. The group row is locked so capacity cannot be exceeded
    /// by concurrent joins.
    pub async fn join_group(&self, group_id: Uuid, user_id: Uuid) -> Result<JoinOutcome, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query("SELECT max_members, is_public FROM travel_groups WHERE id = $1 FOR UPDATE")
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await?;

        let (max_members, is_public): (i32, bool) = match group {
            Some(row) => (row.get("max_members"), row.get("is_public")),
            None => return Ok(JoinOutcome::NotFound),
        };

        let membership = sqlx::query(
            r#"
            SELECT COUNT(*) AS member_count,
                   COALESCE(BOOL_OR(user_id = $2), FALSE) AS is_member
            FROM group_members WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let member_count: i64 = membership.get("member_count");
        let is_member: bool = membership.get("is_member");

        let outcome = if is_member {
            JoinOutcome::AlreadyMember
        } else if !is_public {
            JoinOutcome::Private
        } else if member_count >= i64::from(max_members) {
            JoinOutcome::Full
        } else {
            JoinOutcome::Joined
        };

        if outcome != JoinOutcome::Joined {
            tx.rollback().await?;
            return Ok(outcome);
        }

        sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group_id)
            .bind(user_id)
            .bind(GroupRole::Member)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO conversation_participants (conversation_id, user_id)
            SELECT id, $2 FROM conversations WHERE group_id = $1
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("User {} joined group {}", user_id, group_id);
        Ok(JoinOutcome::Joined)
    }

    /// Leave a group. The owner cannot leave; they delete the group instead.
    pub async fn leave_group(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, PostgresError> {
        let group = self
            .get_group(group_id)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Group not found".to_string()))?;

        if group.owner_id == user_id {
            return Err(PostgresError::InvalidInput(
                "The group owner cannot leave; delete the group instead".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM conversation_participants
            WHERE user_id = $2 AND conversation_id IN (SELECT id FROM conversations WHERE group_id = $1)
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_group(&self, group_id: Uuid, user_id: Uuid) -> Result<(), PostgresError> {
        let group = self
            .get_group(group_id)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Group not found".to_string()))?;

        if group.owner_id != user_id {
            // Outsiders must not learn that a private group exists
            if !group.is_public && !self.is_group_member(group_id, user_id).await? {
                return Err(PostgresError::NotFound("Group not found".to_string()));
            }
            return Err(PostgresError::Forbidden("Only the owner can delete a group".to_string()));
        }

        // Members, the conversation and its messages cascade
        sqlx::query("DELETE FROM travel_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Group {} deleted by {}", group_id, user_id);
        Ok(())
    }
}
