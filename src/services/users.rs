use sqlx::Row;
use uuid::Uuid;

use super::postgres::{PostgresClient, PostgresError};
use crate::models::{
    CandidateQuery, RefreshCursor, UpdatePreferencesRequest, UpdateProfileRequest, UserPreferences, UserProfile,
};

pub(crate) const USER_COLUMNS: &str = "id, email, name, age, gender, bio, home_city, latitude, longitude, \
     personality, budget, travel_style, interests, languages, destinations, \
     is_verified, is_active, created_at, updated_at";

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub age: i16,
    pub gender: String,
}

/// Login lookup result
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub is_active: bool,
}

impl PostgresClient {
    /// Create an account with default preferences
    pub async fn create_user(&self, new_user: &NewUser) -> Result<UserProfile, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO users (id, email, password_hash, name, age, gender) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );

        let profile: UserProfile = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(new_user.email.trim().to_lowercase())
            .bind(&new_user.password_hash)
            .bind(new_user.name.trim())
            .bind(new_user.age)
            .bind(new_user.gender.trim().to_lowercase())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PostgresError::conflict_on_unique(e, "Email is already registered"))?;

        sqlx::query("INSERT INTO user_preferences (user_id) VALUES ($1)")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Created user {}", profile.id);
        Ok(profile)
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, PostgresError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&query).bind(user_id).fetch_optional(&self.pool).await?)
    }

    /// Active profile or `NotFound`
    pub async fn get_active_user(&self, user_id: Uuid) -> Result<UserProfile, PostgresError> {
        match self.find_user(user_id).await? {
            Some(profile) if profile.is_active => Ok(profile),
            _ => Err(PostgresError::NotFound("User not found".to_string())),
        }
    }

    pub async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, PostgresError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let query = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        Ok(sqlx::query_as(&query).bind(ids).fetch_all(&self.pool).await?)
    }

    /// `false` for deactivated and unknown accounts
    pub async fn is_user_active(&self, user_id: Uuid) -> Result<bool, PostgresError> {
        let row = sqlx::query("SELECT is_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("is_active")).unwrap_or(false))
    }

    pub async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, PostgresError> {
        let row = sqlx::query("SELECT id, password_hash, is_active FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| UserCredentials {
            user_id: row.get("id"),
            password_hash: row.get("password_hash"),
            is_active: row.get("is_active"),
        }))
    }

    /// Apply a partial update; `None` fields keep their current value
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &UpdateProfileRequest,
    ) -> Result<UserProfile, PostgresError> {
        let query = format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                age = COALESCE($3, age),
                gender = COALESCE($4, gender),
                bio = COALESCE($5, bio),
                home_city = COALESCE($6, home_city),
                latitude = COALESCE($7, latitude),
                longitude = COALESCE($8, longitude),
                personality = COALESCE($9, personality),
                budget = COALESCE($10, budget),
                travel_style = COALESCE($11, travel_style),
                interests = COALESCE($12, interests),
                languages = COALESCE($13, languages),
                destinations = COALESCE($14, destinations),
                updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let profile: Option<UserProfile> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(update.name.as_deref().map(str::trim))
            .bind(update.age)
            .bind(update.gender.as_deref().map(|g| g.trim().to_lowercase()))
            .bind(&update.bio)
            .bind(&update.home_city)
            .bind(update.latitude)
            .bind(update.longitude)
            .bind(update.personality)
            .bind(update.budget)
            .bind(&update.travel_style)
            .bind(&update.interests)
            .bind(&update.languages)
            .bind(&update.destinations)
            .fetch_optional(&self.pool)
            .await?;

        profile.ok_or_else(|| PostgresError::NotFound("User not found".to_string()))
    }

    /// Preferences, or the defaults when the row is missing
    pub async fn get_preferences(&self, user_id: Uuid) -> Result<UserPreferences, PostgresError> {
        let prefs: Option<UserPreferences> = sqlx::query_as(
            "SELECT user_id, preferred_genders, min_age, max_age, max_distance_km, require_location \
             FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prefs.unwrap_or_else(|| UserPreferences::default_for(user_id)))
    }

    pub async fn upsert_preferences(
        &self,
        user_id: Uuid,
        update: &UpdatePreferencesRequest,
    ) -> Result<UserPreferences, PostgresError> {
        let genders: Vec<String> = update
            .preferred_genders
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();

        let query = r#"
            INSERT INTO user_preferences (user_id, preferred_genders, min_age, max_age, max_distance_km, require_location)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id)
            DO UPDATE SET
                preferred_genders = EXCLUDED.preferred_genders,
                min_age = EXCLUDED.min_age,
                max_age = EXCLUDED.max_age,
                max_distance_km = EXCLUDED.max_distance_km,
                require_location = EXCLUDED.require_location
            RETURNING user_id, preferred_genders, min_age, max_age, max_distance_km, require_location
        "#;

        let prefs = sqlx::query_as(query)
            .bind(user_id)
            .bind(&genders)
            .bind(update.min_age)
            .bind(update.max_age)
            .bind(update.max_distance_km)
            .bind(update.require_location)
            .fetch_one(&self.pool)
            .await?;

        // Preference changes reshuffle discovery, so the refresher should see this user
        sqlx::query("UPDATE users SET updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(prefs)
    }

    /// Deactivate the account and end its matches
    pub async fn deactivate_user(&self, user_id: Uuid) -> Result<bool, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE matches SET is_active = FALSE, unmatched_at = NOW() \
             WHERE is_active AND (user1_id = $1 OR user2_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// SQL pre-filter for discovery; the matcher re-checks everything in memory.
    ///
    /// `exclude_user_ids` carries everyone the viewer already swiped on.
    pub async fn query_candidates(&self, query: &CandidateQuery) -> Result<Vec<UserProfile>, PostgresError> {
        let (min_lat, max_lat, min_lon, max_lon) = match query.bounding_box {
            Some(b) => (Some(b.min_lat), Some(b.max_lat), Some(b.min_lon), Some(b.max_lon)),
            None => (None, None, None, None),
        };

        let sql = format!(
            r#"
            SELECT {}
            FROM users u
            WHERE u.is_active
              AND u.id <> $1
              AND NOT (u.id = ANY($2))
              AND u.age BETWEEN $3 AND $4
              AND (cardinality($5::text[]) = 0 OR u.gender = ANY($5))
              AND (NOT $10 OR (u.latitude IS NOT NULL AND u.longitude IS NOT NULL))
              AND (
                    $6::float8 IS NULL
                 OR u.latitude IS NULL
                 OR (u.latitude BETWEEN $6 AND $7 AND u.longitude BETWEEN $8 AND $9)
              )
            ORDER BY u.updated_at DESC
            LIMIT $11
            "#,
            USER_COLUMNS
        );

        let genders: Vec<String> = query.preferred_genders.iter().map(|g| g.to_lowercase()).collect();

        let candidates: Vec<UserProfile> = sqlx::query_as(&sql)
            .bind(query.viewer_id)
            .bind(&query.exclude_user_ids)
            .bind(query.min_age)
            .bind(query.max_age)
            .bind(&genders)
            .bind(min_lat)
            .bind(max_lat)
            .bind(min_lon)
            .bind(max_lon)
            .bind(query.require_location)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Queried {} candidates for {}", candidates.len(), query.viewer_id);

        Ok(candidates)
    }

    /// Active users strictly after `cursor` in `(updated_at, id)` order.
    /// Users sharing a timestamp are split across pages without loss.
    pub async fn users_changed_after(
        &self,
        cursor: &RefreshCursor,
        limit: i64,
    ) -> Result<Vec<RefreshCursor>, PostgresError> {
        let rows: Vec<RefreshCursor> = sqlx::query_as(
            "SELECT updated_at, id AS user_id FROM users \
             WHERE is_active AND (updated_at, id) > ($1, $2) \
             ORDER BY updated_at ASC, id ASC LIMIT $3",
        )
        .bind(cursor.updated_at)
        .bind(cursor.user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn load_refresh_cursor(&self, name: &str) -> Result<Option<RefreshCursor>, PostgresError> {
        let cursor = sqlx::query_as("SELECT updated_at, user_id FROM refresh_cursors WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cursor)
    }

    pub async fn save_refresh_cursor(&self, name: &str, cursor: &RefreshCursor) -> Result<(), PostgresError> {
        sqlx::query(
            "INSERT INTO refresh_cursors (name, updated_at, user_id) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE SET updated_at = EXCLUDED.updated_at, user_id = EXCLUDED.user_id",
        )
        .bind(name)
        .bind(cursor.updated_at)
        .bind(cursor.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
