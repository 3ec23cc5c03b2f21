use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use super::page;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{CreateListingRequest, ListingStatusRequest, ListingsQuery, UpdateListingRequest};
use crate::services::ListingFilter;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/marketplace", web::post().to(create_listing))
        .route("/marketplace", web::get().to(search_listings))
        .route("/marketplace/{id}", web::get().to(get_listing))
        .route("/marketplace/{id}", web::put().to(update_listing))
        .route("/marketplace/{id}", web::delete().to(delete_listing))
        .route("/marketplace/{id}/status", web::post().to(change_status));
}

async fn create_listing(
    state: web::Data<AppState>,
    auth: AuthUser,
    req: web::Json<CreateListingRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    if !req.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::Validation("Currency must be an ISO 4217 code".to_string()));
    }

    let listing = state.db.create_listing(auth.user_id, &req).await?;
    Ok(HttpResponse::Created().json(listing))
}

/// GET /api/v1/marketplace?category=gear&q=tent&minPrice=0&maxPrice=5000
async fn search_listings(
    state: web::Data<AppState>,
    _auth: AuthUser,
    query: web::Query<ListingsQuery>,
) -> Result<HttpResponse, ApiError> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(ApiError::Validation("minPrice exceeds maxPrice".to_string()));
        }
    }

    let (limit, offset) = page(&state, query.limit, query.offset);
    let query = query.into_inner();
    let filter = ListingFilter {
        category: query.category,
        text: query.q,
        min_price: query.min_price,
        max_price: query.max_price,
        status: query.status,
        limit,
        offset,
    };

    let listings = state.db.search_listings(&filter).await?;
    Ok(HttpResponse::Ok().json(listings))
}

async fn get_listing(
    state: web::Data<AppState>,
    _auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let listing = state
        .db
        .get_listing(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Listing"))?;
    Ok(HttpResponse::Ok().json(listing))
}

async fn update_listing(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateListingRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let listing = state.db.update_listing(path.into_inner(), auth.user_id, &req).await?;
    Ok(HttpResponse::Ok().json(listing))
}

async fn delete_listing(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.db.delete_listing(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/marketplace/{id}/status
///
/// Request body:
/// ```json
/// { "status": "active|reserved|sold" }
/// ```
async fn change_status(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<ListingStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let listing_id = path.into_inner();
    let listing = state
        .db
        .change_listing_status(listing_id, auth.user_id, req.status)
        .await?;

    tracing::info!("Listing {} is now {:?}", listing_id, listing.status);
    Ok(HttpResponse::Ok().json(listing))
}
