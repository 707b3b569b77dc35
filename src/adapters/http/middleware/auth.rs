//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates credentials and injects the user into extensions
//! - `CredentialExtractor` - Where the credential is read from (header, query, or both)
//! - `RequireAuth` - Extractor that requires authentication
//! - `AuthRejection` - 401/403/503 responses in the API error envelope
//!
//! # Architecture
//!
//! The middleware uses the `SessionValidator` port, keeping it scheme-agnostic.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```
//!
//! Browsers cannot set headers on an `EventSource`, so the push endpoint also
//! accepts the credential as a `token` query parameter. Which sources are
//! consulted is decided by the configured `CredentialExtractor`.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, middleware};
//!
//! let auth = AuthState::new(Arc::new(MockSessionValidator::new()));
//!
//! let app = Router::new()
//!     .route("/api/protected", get(protected_handler))
//!     .layer(middleware::from_fn_with_state(auth, auth_middleware));
//!
//! async fn protected_handler(RequireAuth(user): RequireAuth) -> String {
//!     format!("Hello, {}!", user.username)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserRole};
use crate::ports::SessionValidator;

/// Reads a raw credential from an incoming request.
pub trait CredentialExtractor: Send + Sync {
    fn extract(&self, headers: &HeaderMap, uri: &Uri) -> Option<String>;
}

/// `Authorization: Bearer <token>` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerHeader;

impl CredentialExtractor for BearerHeader {
    fn extract(&self, headers: &HeaderMap, _uri: &Uri) -> Option<String> {
        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct TokenParam {
    token: Option<String>,
}

/// `?token=<token>` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryToken;

impl CredentialExtractor for QueryToken {
    fn extract(&self, _headers: &HeaderMap, uri: &Uri) -> Option<String> {
        Query::<TokenParam>::try_from_uri(uri)
            .ok()
            .and_then(|Query(param)| param.token)
            .filter(|t| !t.is_empty())
    }
}

/// Bearer header first, then the `token` query parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOrQuery;

impl CredentialExtractor for HeaderOrQuery {
    fn extract(&self, headers: &HeaderMap, uri: &Uri) -> Option<String> {
        BearerHeader
            .extract(headers, uri)
            .or_else(|| QueryToken.extract(headers, uri))
    }
}

/// Auth middleware state - the validator plus where credentials come from.
#[derive(Clone)]
pub struct AuthState {
    validator: Arc<dyn SessionValidator>,
    extractor: Arc<dyn CredentialExtractor>,
}

impl AuthState {
    /// Accepts the bearer header or the `token` query parameter.
    pub fn new(validator: Arc<dyn SessionValidator>) -> Self {
        Self::with_extractor(validator, Arc::new(HeaderOrQuery))
    }

    pub fn with_extractor(
        validator: Arc<dyn SessionValidator>,
        extractor: Arc<dyn CredentialExtractor>,
    ) -> Self {
        Self {
            validator,
            extractor,
        }
    }
}

/// Authentication middleware.
///
/// This middleware:
/// 1. Extracts the credential via the configured `CredentialExtractor`
/// 2. Validates it using the `SessionValidator` port
/// 3. On success, injects `AuthenticatedUser` into request extensions
/// 4. On missing credential, continues without injecting (handlers decide)
/// 5. On invalid credential, returns 401 Unauthorized
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = auth.extractor.extract(request.headers(), request.uri()) else {
        // Handlers use RequireAuth to enforce authentication
        return next.run(request).await;
    };

    match auth.validator.validate(&token).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, role = %user.role, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => AuthRejection::from(e).into_response(),
    }
}

/// Extractor that requires authentication.
///
/// If no user is in the request extensions (i.e., auth middleware didn't
/// successfully validate a credential), returns 401 Unauthorized.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl RequireAuth {
    /// Ensure the user holds one of `roles`, else 403.
    pub fn require_any_role(&self, roles: &[UserRole]) -> Result<(), AuthRejection> {
        if self.0.has_any_role(roles) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.0.id, role = %self.0.role, "Role check failed");
            Err(AuthRejection::from(AuthError::requires_roles(roles)))
        }
    }
}

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No credential was presented.
    Unauthenticated,
    /// A credential was presented but did not validate.
    InvalidCredential(&'static str),
    /// Authenticated, but the role is not allowed here.
    Forbidden(String),
    /// The validator could not be reached.
    Unavailable,
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => AuthRejection::Unauthenticated,
            AuthError::TokenExpired => AuthRejection::InvalidCredential("Token expired"),
            AuthError::InvalidToken => AuthRejection::InvalidCredential("Invalid or expired token"),
            AuthError::InsufficientPermissions(_) => AuthRejection::Forbidden(err.to_string()),
            AuthError::ServiceUnavailable(msg) => {
                tracing::error!("Auth service unavailable: {}", msg);
                AuthRejection::Unavailable
            }
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AuthRejection::InvalidCredential(message) => {
                (StatusCode::UNAUTHORIZED, message.to_string())
            }
            AuthRejection::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AuthRejection::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": message,
            })),
        )
            .into_response()
    }
}
