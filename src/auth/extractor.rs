use actix_web::{dev::Payload, http::header::HeaderMap, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::CacheKey;
use crate::state::AppState;

use super::AuthError;

/// Authenticated caller, resolved from the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer token from the `Authorization` header, falling back to `?token=`
/// (browsers cannot set headers on WebSocket upgrades)
pub fn bearer_token(headers: &HeaderMap, query_string: &str) -> Option<String> {
    let from_header = headers
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        web::Query::<TokenQuery>::from_query(query_string)
            .ok()
            .and_then(|q| q.into_inner().token)
            .filter(|token| !token.is_empty())
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let verified = verify_token(req);
        Box::pin(async move {
            let (state, user_id) = verified?;
            ensure_active(&state, user_id).await?;
            Ok(AuthUser { user_id })
        })
    }
}

fn verify_token(req: &HttpRequest) -> Result<(web::Data<AppState>, Uuid), ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("application state not configured".to_string()))?;

    let token = bearer_token(req.headers(), req.query_string()).ok_or(AuthError::MissingToken)?;
    let claims = state.tokens.verify(&token)?;

    Ok((state, claims.sub))
}

/// A valid signature is not enough: the account must still be active.
/// The answer is cached for the cache TTL; deactivation overwrites it.
async fn ensure_active(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let key = CacheKey::account_status(user_id);

    let active = match state.cache.lookup::<bool>(&key).await {
        Some(active) => active,
        None => {
            let active = state.db.is_user_active(user_id).await?;
            state.cache.store(&key, &active).await;
            active
        }
    };

    if active {
        Ok(())
    } else {
        Err(AuthError::InactiveAccount.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_from_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(
            bearer_token(req.headers(), req.query_string()).as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn test_bearer_from_query() {
        let req = TestRequest::with_uri("/ws?token=abc").to_http_request();
        assert_eq!(bearer_token(req.headers(), req.query_string()).as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_bearer() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic Zm9vOmJhcg=="))
            .to_http_request();
        assert!(bearer_token(req.headers(), req.query_string()).is_none());
    }
}
