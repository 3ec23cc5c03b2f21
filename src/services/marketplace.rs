use uuid::Uuid;

use super::postgres::{like_pattern, PostgresClient, PostgresError};
use crate::models::{
    CreateListingRequest, ListingCategory, ListingStatus, MarketplaceListing, UpdateListingRequest,
};

const LISTING_COLUMNS: &str = "id, seller_id, title, description, category, price_cents, currency, \
     location, status, created_at, updated_at";

/// Marketplace search filters, already bounded by the caller
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub category: Option<ListingCategory>,
    pub text: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub status: Option<ListingStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl PostgresClient {
    pub async fn create_listing(
        &self,
        seller_id: Uuid,
        request: &CreateListingRequest,
    ) -> Result<MarketplaceListing, PostgresError> {
        let query = format!(
            r#"
            INSERT INTO marketplace_listings (id, seller_id, title, description, category, price_cents, currency, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );

        let listing: MarketplaceListing = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(seller_id)
            .bind(request.title.trim())
            .bind(&request.description)
            .bind(request.category)
            .bind(request.price_cents)
            .bind(request.currency.to_uppercase())
            .bind(&request.location)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("User {} listed {}", seller_id, listing.id);
        Ok(listing)
    }

    pub async fn get_listing(&self, listing_id: Uuid) -> Result<Option<MarketplaceListing>, PostgresError> {
        let query = format!("SELECT {} FROM marketplace_listings WHERE id = $1", LISTING_COLUMNS);
        Ok(sqlx::query_as(&query).bind(listing_id).fetch_optional(&self.pool).await?)
    }

    /// Search listings, newest first. Only active listings unless a status is given.
    pub async fn search_listings(&self, filter: &ListingFilter) -> Result<Vec<MarketplaceListing>, PostgresError> {
        let query = format!(
            r#"
            SELECT {} FROM marketplace_listings
            WHERE status = $1
              AND ($2::listing_category IS NULL OR category = $2)
              AND ($3::text IS NULL OR title ILIKE $3 OR description ILIKE $3)
              AND ($4::bigint IS NULL OR price_cents >= $4)
              AND ($5::bigint IS NULL OR price_cents <= $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
            LISTING_COLUMNS
        );

        let text = filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(like_pattern);

        Ok(sqlx::query_as(&query)
            .bind(filter.status.unwrap_or(ListingStatus::Active))
            .bind(filter.category)
            .bind(text)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn owned_listing(&self, listing_id: Uuid, seller_id: Uuid) -> Result<MarketplaceListing, PostgresError> {
        let listing = self
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| PostgresError::NotFound("Listing not found".to_string()))?;

        if listing.seller_id != seller_id {
            return Err(PostgresError::Forbidden("Only the seller can change this listing".to_string()));
        }
        Ok(listing)
    }

    /// Edit a listing that has not been sold
    pub async fn update_listing(
        &self,
        listing_id: Uuid,
        seller_id: Uuid,
        update: &UpdateListingRequest,
    ) -> Result<MarketplaceListing, PostgresError> {
        let listing = self.owned_listing(listing_id, seller_id).await?;
        if listing.status == ListingStatus::Sold {
            return Err(PostgresError::Conflict("Sold listings cannot be edited".to_string()));
        }

        let query = format!(
            r#"
            UPDATE marketplace_listings SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                price_cents = COALESCE($5, price_cents),
                location = COALESCE($6, location),
                updated_at = NOW()
            WHERE id = $1 AND status <> 'sold'
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );

        let updated: Option<MarketplaceListing> = sqlx::query_as(&query)
            .bind(listing_id)
            .bind(update.title.as_deref().map(str::trim))
            .bind(&update.description)
            .bind(update.category)
            .bind(update.price_cents)
            .bind(&update.location)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| PostgresError::Conflict("Listing was sold in the meantime".to_string()))
    }

    /// Move a listing through `active -> reserved -> sold`
    pub async fn change_listing_status(
        &self,
        listing_id: Uuid,
        seller_id: Uuid,
        next: ListingStatus,
    ) -> Result<MarketplaceListing, PostgresError> {
        let listing = self.owned_listing(listing_id, seller_id).await?;

        if !listing.status.can_transition_to(next) {
            return Err(PostgresError::Conflict(format!(
                "Cannot move listing from {:?} to {:?}",
                listing.status, next
            )));
        }

        let query = format!(
            "UPDATE marketplace_listings SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {}",
            LISTING_COLUMNS
        );

        // The status guard turns a concurrent transition into a conflict
        let updated: Option<MarketplaceListing> = sqlx::query_as(&query)
            .bind(listing_id)
            .bind(listing.status)
            .bind(next)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| PostgresError::Conflict("Listing status changed concurrently".to_string()))
    }

    pub async fn delete_listing(&self, listing_id: Uuid, seller_id: Uuid) -> Result<(), PostgresError> {
        self.owned_listing(listing_id, seller_id).await?;

        sqlx::query("DELETE FROM marketplace_listings WHERE id = $1")
            .bind(listing_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
