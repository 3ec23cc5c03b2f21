use sqlx::Row;
use uuid::Uuid;

use super::postgres::{PostgresClient, PostgresError};
use crate::models::{CreateJournalRequest, TravelJournal, UpdateJournalRequest};

const JOURNAL_SELECT: &str = r#"
    SELECT j.id, j.author_id, j.title, j.body, j.destination, j.visibility,
           j.trip_start, j.trip_end, j.tags,
           (SELECT COUNT(*) FROM journal_likes l WHERE l.journal_id = j.id) AS like_count,
           j.created_at, j.updated_at
    FROM travel_journals j
"#;

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

impl PostgresClient {
    pub async fn create_journal(
        &self,
        author_id: Uuid,
        request: &CreateJournalRequest,
    ) -> Result<TravelJournal, PostgresError> {
        let journal_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO travel_journals (id, author_id, title, body, destination, visibility, trip_start, trip_end, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(journal_id)
        .bind(author_id)
        .bind(request.title.trim())
        .bind(&request.body)
        .bind(&request.destination)
        .bind(request.visibility)
        .bind(request.trip_start)
        .bind(request.trip_end)
        .bind(normalize_tags(&request.tags))
        .execute(&self.pool)
        .await?;

        self.get_journal(journal_id)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Journal not found".to_string()))
    }

    pub async fn get_journal(&self, journal_id: Uuid) -> Result<Option<TravelJournal>, PostgresError> {
        let query = format!("{} WHERE j.id = $1", JOURNAL_SELECT);
        Ok(sqlx::query_as(&query).bind(journal_id).fetch_optional(&self.pool).await?)
    }

    /// Journals `viewer_id` is allowed to read, newest first
    pub async fn list_journals(
        &self,
        viewer_id: Uuid,
        author_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TravelJournal>, PostgresError> {
        let query = format!(
            r#"{}
            WHERE ($2::uuid IS NULL OR j.author_id = $2)
              AND (
                    j.visibility = 'public'
                 OR j.author_id = $1
                 OR (j.visibility = 'matches' AND EXISTS (
                        SELECT 1 FROM matches m
                        WHERE m.is_active
                          AND ((m.user1_id = $1 AND m.user2_id = j.author_id)
                            OR (m.user2_id = $1 AND m.user1_id = j.author_id))
                    ))
              )
            ORDER BY j.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            JOURNAL_SELECT
        );

        Ok(sqlx::query_as(&query)
            .bind(viewer_id)
            .bind(author_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn require_author(&self, journal_id: Uuid, user_id: Uuid) -> Result<(), PostgresError> {
        let row = sqlx::query("SELECT author_id FROM travel_journals WHERE id = $1")
            .bind(journal_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Journal not found".to_string()))?;

        let author_id: Uuid = row.get("author_id");
        if author_id != user_id {
            return Err(PostgresError::Forbidden("Only the author can change this journal".to_string()));
        }
        Ok(())
    }

    pub async fn update_journal(
        &self,
        journal_id: Uuid,
        user_id: Uuid,
        update: &UpdateJournalRequest,
    ) -> Result<TravelJournal, PostgresError> {
        self.require_author(journal_id, user_id).await?;

        sqlx::query(
            r#"
            UPDATE travel_journals SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                destination = COALESCE($4, destination),
                visibility = COALESCE($5, visibility),
                tags = COALESCE($6, tags),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(journal_id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(&update.body)
        .bind(&update.destination)
        .bind(update.visibility)
        .bind(update.tags.as_deref().map(normalize_tags))
        .execute(&self.pool)
        .await?;

        self.get_journal(journal_id)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Journal not found".to_string()))
    }

    pub async fn delete_journal(&self, journal_id: Uuid, user_id: Uuid) -> Result<(), PostgresError> {
        self.require_author(journal_id, user_id).await?;

        sqlx::query("DELETE FROM travel_journals WHERE id = $1")
            .bind(journal_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flip the user's like; returns the new state and count
    pub async fn toggle_journal_like(&self, journal_id: Uuid, user_id: Uuid) -> Result<(bool, i64), PostgresError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM journal_likes WHERE journal_id = $1 AND user_id = $2")
            .bind(journal_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query("INSERT INTO journal_likes (journal_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(journal_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let count: i64 = sqlx::query("SELECT COUNT(*) AS like_count FROM journal_likes WHERE journal_id = $1")
            .bind(journal_id)
            .fetch_one(&mut *tx)
            .await?
            .get("like_count");

        tx.commit().await?;

        Ok((!removed, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" Surf ".to_string(), "food".to_string(), "surf".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["food".to_string(), "surf".to_string()]);
    }
}
