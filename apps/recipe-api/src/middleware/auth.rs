//! Authentication middleware.

use std::sync::Arc;

use auth::Claims;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use entities::User;
use recipe_store::Store;

use crate::{error::ServerError, services::AccountService, state::AppState};

/// Authenticated user information.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The caller's user record, loaded fresh for this request.
    pub user: User,
    /// Validated claims of the presented token.
    pub claims: Claims,
}

impl AuthenticatedUser {
    /// Returns the caller's user ID.
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

impl From<(User, Claims)> for AuthenticatedUser {
    fn from((user, claims): (User, Claims)) -> Self {
        Self { user, claims }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` or
/// `Authorization: Token <token>` header.
fn extract_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// Validates the bearer token, rejects revoked tokens and inactive users, and
/// stores the [`AuthenticatedUser`] in the request extensions. Every failure
/// yields the same 401 response.
pub async fn auth_middleware<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&request).map(str::to_owned) else {
        tracing::debug!("Missing authorization header");
        return ServerError::AuthenticationRequired.into_response();
    };

    let accounts = AccountService::new(&state.store, &state.jwt_manager);
    let resolved = match accounts.current_user(&token).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return e.into_response();
        }
    };

    let user = AuthenticatedUser::from(resolved);
    tracing::debug!(user_id = %user.id(), "Authenticated request");
    request.extensions_mut().insert(user);

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use chrono::Utc;

    use super::*;

    fn request_with(header: &str) -> Request {
        Request::builder()
            .header(AUTHORIZATION, header)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let request = request_with("Bearer test-token-123");
        assert_eq!(extract_token(&request), Some("test-token-123"));
    }

    #[test]
    fn test_extract_token_scheme() {
        let request = request_with("Token test-token-123");
        assert_eq!(extract_token(&request), Some("test-token-123"));
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        assert_eq!(extract_token(&request_with("Basic credentials")), None);
        assert_eq!(extract_token(&request_with("Bearer ")), None);

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_token(&request), None);
    }

    #[test]
    fn test_authenticated_user_from_claims() {
        let now = Utc::now();
        let user = User {
            id: 42,
            email: "test@example.com".to_string(),
            name: "Test User".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        let claims = Claims::new(42, user.email.clone(), None, 24, "recipe-api");

        let authenticated = AuthenticatedUser::from((user, claims.clone()));
        assert_eq!(authenticated.id(), 42);
        assert_eq!(authenticated.claims.jti, claims.jti);
        assert_eq!(authenticated.claims.expires_at().timestamp(), claims.exp);
    }
}
