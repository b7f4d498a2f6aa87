use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::SharedState;

/// Proof that the caller presented the shared service credential.
///
/// The dispatch surface is internal-only: every route except the health
/// probe requires the key, either as `Authorization: Bearer <key>` or in
/// the `x-service-key` header.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

impl FromRequestParts<SharedState> for ServiceAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "));

        let presented = match bearer {
            Some(token) => Some(token),
            None => parts
                .headers
                .get("x-service-key")
                .and_then(|h| h.to_str().ok()),
        };

        let presented = presented
            .ok_or_else(|| AppError::Unauthorized("Missing service credential".to_string()))?;

        if bool::from(
            presented
                .as_bytes()
                .ct_eq(state.config.service_key.as_bytes()),
        ) {
            Ok(ServiceAuth)
        } else {
            Err(AppError::Unauthorized(
                "Invalid service credential".to_string(),
            ))
        }
    }
}
