use sqlx::Row;
use uuid::Uuid;

use super::postgres::{PostgresClient, PostgresError};
use crate::core::swipe::MatchPair;
use crate::models::{ConversationKind, MatchRecord, MatchSummary, PublicProfile, SwipeAction};

const MATCH_COLUMNS: &str = "id, user1_id, user2_id, compatibility_score, matched_at, is_active";

/// A match created by a swipe, with the direct conversation opened for it
#[derive(Debug, Clone)]
pub struct CreatedMatch {
    pub record: MatchRecord,
    pub conversation_id: Uuid,
}

impl PostgresClient {
    /// Insert or overwrite the swiper's latest decision on `target_id`
    pub async fn record_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        action: SwipeAction,
    ) -> Result<(), PostgresError> {
        sqlx::query(
            r#"
            INSERT INTO swipes (swiper_id, target_id, action)
            VALUES ($1, $2, $3)
            ON CONFLICT (swiper_id, target_id)
            DO UPDATE SET action = EXCLUDED.action, created_at = NOW()
            "#,
        )
        .bind(swiper_id)
        .bind(target_id)
        .bind(action)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_swipe(&self, swiper_id: Uuid, target_id: Uuid) -> Result<Option<SwipeAction>, PostgresError> {
        let row = sqlx::query("SELECT action FROM swipes WHERE swiper_id = $1 AND target_id = $2")
            .bind(swiper_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("action")))
    }

    /// Everyone `user_id` has swiped on, in any direction of the decision
    pub async fn swiped_user_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, PostgresError> {
        let rows = sqlx::query("SELECT target_id FROM swipes WHERE swiper_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("target_id")).collect())
    }

    pub async fn find_match_between(&self, pair: MatchPair) -> Result<Option<MatchRecord>, PostgresError> {
        let query = format!("SELECT {} FROM matches WHERE user1_id = $1 AND user2_id = $2", MATCH_COLUMNS);
        Ok(sqlx::query_as(&query)
            .bind(pair.user1_id)
            .bind(pair.user2_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>, PostgresError> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);
        Ok(sqlx::query_as(&query).bind(match_id).fetch_optional(&self.pool).await?)
    }

    /// Create the match row and its direct conversation.
    ///
    /// Returns `None` when the pair already has a match row (active or not),
    /// so concurrent mutual swipes produce exactly one match.
    pub async fn create_match(&self, pair: MatchPair, score: f64) -> Result<Option<CreatedMatch>, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO matches (id, user1_id, user2_id, compatibility_score) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user1_id, user2_id) DO NOTHING RETURNING {}",
            MATCH_COLUMNS
        );

        let record: Option<MatchRecord> = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(pair.user1_id)
            .bind(pair.user2_id)
            .bind(score)
            .fetch_optional(&mut *tx)
            .await?;

        let record = match record {
            Some(record) => record,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let conversation_id = Uuid::new_v4();
        sqlx::query("INSERT INTO conversations (id, kind, match_id) VALUES ($1, $2, $3)")
            .bind(conversation_id)
            .bind(ConversationKind::Direct)
            .bind(record.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id) VALUES ($1, $2), ($1, $3)",
        )
        .bind(conversation_id)
        .bind(pair.user1_id)
        .bind(pair.user2_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Match {} created between {} and {}", record.id, pair.user1_id, pair.user2_id);

        Ok(Some(CreatedMatch { record, conversation_id }))
    }

    /// Active matches of `user_id`, newest first, with partner profiles
    pub async fn list_matches(&self, user_id: Uuid) -> Result<Vec<MatchSummary>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.user1_id, m.user2_id, m.compatibility_score, m.matched_at, m.is_active,
                   c.id AS conversation_id
            FROM matches m
            LEFT JOIN conversations c ON c.match_id = m.id
            WHERE m.is_active AND (m.user1_id = $1 OR m.user2_id = $1)
            ORDER BY m.matched_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let matches: Vec<(MatchRecord, Option<Uuid>)> = rows
            .iter()
            .map(|row| {
                let record = MatchRecord {
                    id: row.get("id"),
                    user1_id: row.get("user1_id"),
                    user2_id: row.get("user2_id"),
                    compatibility_score: row.get("compatibility_score"),
                    matched_at: row.get("matched_at"),
                    is_active: row.get("is_active"),
                };
                (record, row.get("conversation_id"))
            })
            .collect();

        let partner_ids: Vec<Uuid> = matches.iter().map(|(m, _)| m.partner_of(user_id)).collect();
        let partners = self.find_users_by_ids(&partner_ids).await?;

        Ok(matches
            .into_iter()
            .filter_map(|(record, conversation_id)| {
                let partner_id = record.partner_of(user_id);
                // Deactivated partners drop out of the list
                let partner = partners.iter().find(|p| p.id == partner_id && p.is_active)?;
                Some(MatchSummary {
                    match_id: record.id,
                    partner: PublicProfile::from(partner),
                    compatibility_score: record.compatibility_score,
                    matched_at: record.matched_at,
                    conversation_id,
                })
            })
            .collect())
    }

    pub async fn active_matches_for(&self, user_id: Uuid) -> Result<Vec<MatchRecord>, PostgresError> {
        let query = format!(
            "SELECT {} FROM matches WHERE is_active AND (user1_id = $1 OR user2_id = $1)",
            MATCH_COLUMNS
        );
        Ok(sqlx::query_as(&query).bind(user_id).fetch_all(&self.pool).await?)
    }

    pub async fn are_matched(&self, a: Uuid, b: Uuid) -> Result<bool, PostgresError> {
        let pair = match MatchPair::new(a, b) {
            Some(pair) => pair,
            None => return Ok(false),
        };
        Ok(self
            .find_match_between(pair)
            .await?
            .map(|m| m.is_active)
            .unwrap_or(false))
    }

    /// End a match; only its participants may do so
    pub async fn unmatch(&self, match_id: Uuid, user_id: Uuid) -> Result<MatchRecord, PostgresError> {
        let record = self
            .get_match(match_id)
            .await?
            .filter(|m| m.involves(user_id))
            .ok_or_else(|| PostgresError::NotFound("Match not found".to_string()))?;

        if !record.is_active {
            return Ok(record);
        }

        let query = format!(
            "UPDATE matches SET is_active = FALSE, unmatched_at = NOW() WHERE id = $1 RETURNING {}",
            MATCH_COLUMNS
        );
        let updated = sqlx::query_as(&query).bind(match_id).fetch_one(&self.pool).await?;

        tracing::info!("User {} ended match {}", user_id, match_id);
        Ok(updated)
    }

    pub async fn update_match_score(&self, match_id: Uuid, score: f64) -> Result<(), PostgresError> {
        sqlx::query("UPDATE matches SET compatibility_score = $2 WHERE id = $1")
            .bind(match_id)
            .bind(score)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
