use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Resolves a bearer credential to the caller's identity
pub trait IdentityGuard: Send + Sync {
    fn authenticate(&self, token: &str) -> AppResult<Claims>;
}

/// Identity guard backed by HS256 JWTs
pub struct JwtGuard {
    secret: String,
}

impl JwtGuard {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl IdentityGuard for JwtGuard {
    fn authenticate(&self, token: &str) -> AppResult<Claims> {
        verify_token(token, &self.secret)
    }
}

/// Extract and validate bearer token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) =
        auth.ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state.guard.authenticate(auth.token())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
