//! Authentication middleware
//!
//! Verifies the bearer JWT, loads the active employee behind it and exposes
//! them to handlers as the acting `Actor`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::Actor;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::services::IdentityService;
use crate::AppState;

/// Authenticated employee extracted from the JWT subject
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub actor: Actor,
}

/// Authentication middleware that validates JWT tokens and resolves the employee
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => {
            return unauthorized_response(&msg);
        }
    };

    let employee_id = match uuid::Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid employee ID in token"),
    };

    // Inactive or unknown employees are turned away even with a valid token
    let identity = IdentityService::new(state.db.clone());
    let actor = match identity.find_active(employee_id).await {
        Ok(Some(actor)) => actor,
        Ok(None) => return unauthorized_response("Inactive or unknown employee"),
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(AuthUser { actor });

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the acting employee
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

impl CurrentUser {
    pub fn actor(&self) -> &Actor {
        &self.0.actor
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new("UNAUTHORIZED", "Authentication required"),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Capability guard for read views
/// Returns a Forbidden error when the policy check failed
pub fn require(allowed: bool, message: &str) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(message.to_string()))
    }
}
