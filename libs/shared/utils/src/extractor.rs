use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{typed_header::TypedHeaderRejection, TypedHeader};
use headers::{Authorization, authorization::Bearer};
use tracing::debug;

use shared_models::error::AppError;

/// Bearer token of the calling admin, forwarded as-is to the booking API.
///
/// The gateway does not validate the token itself; the booking API is the
/// authority and answers 401/403 when it is not acceptable.
#[derive(Debug, Clone)]
pub struct AdminToken(pub String);

impl AdminToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Middleware that requires a bearer token and stashes it in the request extensions
pub async fn require_bearer(
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(auth) = auth.map_err(|rejection| {
        debug!("Rejecting {} {}: {}", request.method(), request.uri().path(), rejection);
        if rejection.is_missing() {
            AppError::Auth("Missing bearer token".to_string())
        } else {
            AppError::Auth("Authorization header must use the Bearer scheme".to_string())
        }
    })?;

    let token = auth.token().trim();
    if token.is_empty() {
        return Err(AppError::Auth("Empty bearer token".to_string()));
    }

    request.extensions_mut().insert(AdminToken(token.to_string()));

    Ok(next.run(request).await)
}
