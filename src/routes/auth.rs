use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::error::AppError;
use crate::services::auth::{resolve_scope, Claims, ViewerScope};
use crate::AppState;

/// Extractor for the authenticated principal. Token issuance is the identity
/// service's concern; this backend only verifies the bearer token.
#[derive(Debug)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn scope(&self) -> ViewerScope {
        resolve_scope(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;

        tracing::debug!("Authenticated principal: {}", data.claims.sub);
        Ok(AuthUser(data.claims))
    }
}
