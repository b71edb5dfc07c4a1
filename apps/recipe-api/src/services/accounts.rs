//! Account service.
//!
//! Password hashing and token policy live here; the store only ever sees
//! hashes. Raw passwords and tokens are never logged.

use api_protocol::{
    CreateUserRequest, FIELD_BLANK, FIELD_REQUIRED, FieldErrors, TokenRequest, UpdateUserRequest,
};
use auth::{AuthError, Claims, JwtManager, hash_password, verify_password};
use entities::{MAX_TEXT_LENGTH, User, normalize_email};
use recipe_store::{AccountStore, NewUser, StoreError};

use crate::error::{ServerError, ServerResult};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// User registration, login, profile updates and logout.
pub struct AccountService<'a, S: AccountStore> {
    store: &'a S,
    jwt_manager: &'a JwtManager,
}

impl<'a, S: AccountStore> AccountService<'a, S> {
    /// Creates a service over the given store and token manager.
    pub fn new(store: &'a S, jwt_manager: &'a JwtManager) -> Self {
        Self { store, jwt_manager }
    }

    /// Registers a regular user.
    pub async fn create_user(&self, request: CreateUserRequest) -> ServerResult<User> {
        self.register(request, false).await
    }

    /// Registers a user with the staff and superuser flags set.
    pub async fn create_superuser(&self, request: CreateUserRequest) -> ServerResult<User> {
        self.register(request, true).await
    }

    async fn register(&self, request: CreateUserRequest, superuser: bool) -> ServerResult<User> {
        let mut errors = FieldErrors::new();

        let email = match request.email.as_deref().map(str::trim) {
            None => {
                errors.add("email", FIELD_REQUIRED);
                None
            }
            Some("") => {
                errors.add("email", FIELD_BLANK);
                None
            }
            Some(email) if !is_valid_email(email) => {
                errors.add("email", "Enter a valid email address.");
                None
            }
            Some(email) => Some(normalize_email(email)),
        };

        let password = match request.password {
            None => {
                errors.add("password", FIELD_REQUIRED);
                None
            }
            Some(password) => check_password(&mut errors, password),
        };

        let name = request.name.unwrap_or_default();
        if name.chars().count() > MAX_TEXT_LENGTH {
            errors.add(
                "name",
                format!("Ensure this field has no more than {MAX_TEXT_LENGTH} characters."),
            );
        }

        let (Some(email), Some(password)) = (email, password) else {
            return Err(ServerError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(ServerError::Validation(errors));
        }

        let new_user = NewUser {
            email,
            password_hash: hash_password(&password)?,
            name,
            is_staff: superuser,
            is_superuser: superuser,
        };

        let user = self
            .store
            .create_user(new_user)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists { .. } => {
                    ServerError::field("email", "user with this email already exists.")
                }
                e => e.into(),
            })?;

        tracing::info!(user_id = %user.id, superuser, "User created");
        Ok(user)
    }

    /// Checks credentials and issues a bearer token.
    ///
    /// Unknown email, wrong password and inactive account all produce the
    /// same error.
    pub async fn authenticate(&self, request: TokenRequest) -> ServerResult<String> {
        let mut errors = FieldErrors::new();
        for (field, value) in [("email", &request.email), ("password", &request.password)] {
            match value.as_deref() {
                None => errors.add(field, FIELD_REQUIRED),
                Some(v) if v.trim().is_empty() => errors.add(field, FIELD_BLANK),
                Some(_) => {}
            }
        }
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(ServerError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(ServerError::Validation(errors));
        }

        let email = normalize_email(&email);
        let Some(user) = self.store.get_user_by_email(&email).await? else {
            tracing::warn!("Rejected credentials for unknown account");
            return Err(ServerError::InvalidCredentials);
        };

        if !verify_password(&password, &user.password_hash)? || !user.can_authenticate() {
            tracing::warn!(user_id = %user.id, "Rejected credentials");
            return Err(ServerError::InvalidCredentials);
        }

        let name = (!user.name.is_empty()).then(|| user.name.clone());
        let token = self
            .jwt_manager
            .generate_token(user.id, user.email.clone(), name)?;

        tracing::info!(user_id = %user.id, "Token issued");
        Ok(token)
    }

    /// Resolves a bearer token to an active user.
    ///
    /// Checks signature, issuer, expiry and revocation before loading the
    /// user.
    pub async fn current_user(&self, token: &str) -> ServerResult<(User, Claims)> {
        let claims = self.jwt_manager.validate_token(token)?;

        if self.store.is_token_revoked(&claims.jti).await? {
            return Err(AuthError::TokenRevoked.into());
        }

        let user = self
            .store
            .get_user(claims.user_id()?)
            .await?
            .filter(User::can_authenticate)
            .ok_or(ServerError::AuthenticationRequired)?;

        Ok((user, claims))
    }

    /// Updates the caller's name and/or password. An empty password is
    /// ignored.
    pub async fn update_user(
        &self,
        mut user: User,
        request: UpdateUserRequest,
    ) -> ServerResult<User> {
        let mut errors = FieldErrors::new();

        if let Some(name) = request.name {
            if name.chars().count() > MAX_TEXT_LENGTH {
                errors.add(
                    "name",
                    format!("Ensure this field has no more than {MAX_TEXT_LENGTH} characters."),
                );
            }
            user.name = name;
        }

        let password = request
            .password
            .filter(|p| !p.is_empty())
            .and_then(|p| check_password(&mut errors, p));

        if !errors.is_empty() {
            return Err(ServerError::Validation(errors));
        }

        let password_changed = password.is_some();
        if let Some(password) = password {
            user.password_hash = hash_password(&password)?;
        }

        let user = self.store.update_user(user).await?;

        tracing::info!(user_id = %user.id, password_changed, "User updated");
        Ok(user)
    }

    /// Revokes a token until its natural expiry.
    pub async fn revoke_token(&self, user_id: i64, claims: &Claims) -> ServerResult<()> {
        self.store
            .revoke_token(&claims.jti, claims.expires_at())
            .await?;

        tracing::info!(user_id = %user_id, "Token revoked");
        Ok(())
    }
}

/// Accepts `local@domain` with non-empty parts and no whitespace.
fn is_valid_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
                && email.chars().count() <= MAX_TEXT_LENGTH
        }
        None => false,
    }
}

fn check_password(errors: &mut FieldErrors, password: String) -> Option<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
        );
        None
    } else {
        Some(password)
    }
}

#[cfg(test)]
mod tests {
    use auth::JwtConfig;
    use recipe_store::MemoryStore;

    use super::*;

    fn jwt_manager() -> JwtManager {
        JwtManager::new(JwtConfig::new("test-secret"))
    }

    fn signup(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            name: Some("Test Name".to_string()),
        }
    }

    fn login(email: &str, password: &str) -> TokenRequest {
        TokenRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn field_names(error: ServerError) -> Vec<String> {
        match error {
            ServerError::Validation(fields) => fields.fields().map(str::to_string).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_user_normalizes_email() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let samples = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];
        for (email, expected) in samples {
            let user = service.create_user(signup(email, "sample123")).await.unwrap();
            assert_eq!(user.email, expected);
        }
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let user = service
            .create_user(signup("test@example.com", "testpass123"))
            .await
            .unwrap();

        assert_ne!(user.password_hash, "testpass123");
        assert!(verify_password("testpass123", &user.password_hash).unwrap());
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let error = service.create_user(signup("", "test123")).await.unwrap_err();
        assert_eq!(field_names(error), vec!["email"]);

        let error = service
            .create_user(signup("no-at-sign", "test123"))
            .await
            .unwrap_err();
        assert_eq!(field_names(error), vec!["email"]);

        let error = service
            .create_user(signup("test@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(field_names(error), vec!["password"]);

        let error = service
            .create_user(CreateUserRequest::default())
            .await
            .unwrap_err();
        assert_eq!(field_names(error), vec!["email", "password"]);

        assert!(store.get_user_by_email("test@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        service
            .create_user(signup("test@example.com", "test123"))
            .await
            .unwrap();
        let error = service
            .create_user(signup("test@EXAMPLE.com", "other123"))
            .await
            .unwrap_err();
        assert_eq!(field_names(error), vec!["email"]);
    }

    #[tokio::test]
    async fn test_create_superuser() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let user = service
            .create_superuser(signup("admin@example.com", "test123"))
            .await
            .unwrap();
        assert!(user.is_staff);
        assert!(user.is_superuser);
    }

    #[tokio::test]
    async fn test_authenticate_and_resolve() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let created = service
            .create_user(signup("test@example.com", "goodpass"))
            .await
            .unwrap();
        let token = service
            .authenticate(login("test@EXAMPLE.com", "goodpass"))
            .await
            .unwrap();

        let (user, claims) = service.current_user(&token).await.unwrap();
        assert_eq!(user.id, created.id);
        assert_eq!(claims.email, "test@example.com");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let user = service
            .create_user(signup("test@example.com", "goodpass"))
            .await
            .unwrap();

        let wrong_password = service
            .authenticate(login("test@example.com", "badpass"))
            .await;
        assert!(matches!(wrong_password, Err(ServerError::InvalidCredentials)));

        let unknown = service
            .authenticate(login("nobody@example.com", "goodpass"))
            .await;
        assert!(matches!(unknown, Err(ServerError::InvalidCredentials)));

        let mut inactive = user.clone();
        inactive.is_active = false;
        store.update_user(inactive).await.unwrap();
        let inactive = service
            .authenticate(login("test@example.com", "goodpass"))
            .await;
        assert!(matches!(inactive, Err(ServerError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_blank_password_rejected_at_login() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let error = service
            .authenticate(login("test@example.com", ""))
            .await
            .unwrap_err();
        assert_eq!(field_names(error), vec!["password"]);
    }

    #[tokio::test]
    async fn test_update_user() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let user = service
            .create_user(signup("test@example.com", "oldpass"))
            .await
            .unwrap();
        let old_hash = user.password_hash.clone();

        let request = UpdateUserRequest {
            name: Some("Updated Name".to_string()),
            password: Some("newpassword123".to_string()),
        };
        let user = service.update_user(user, request).await.unwrap();

        assert_eq!(user.name, "Updated Name");
        assert_ne!(user.password_hash, old_hash);
        assert!(verify_password("newpassword123", &user.password_hash).unwrap());
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn test_update_user_ignores_empty_password() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let user = service
            .create_user(signup("test@example.com", "oldpass"))
            .await
            .unwrap();
        let old_hash = user.password_hash.clone();

        let request = UpdateUserRequest {
            name: None,
            password: Some(String::new()),
        };
        let user = service.update_user(user, request).await.unwrap();
        assert_eq!(user.password_hash, old_hash);
    }

    #[tokio::test]
    async fn test_revoked_token_rejected() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        service
            .create_user(signup("test@example.com", "goodpass"))
            .await
            .unwrap();
        let token = service
            .authenticate(login("test@example.com", "goodpass"))
            .await
            .unwrap();

        let (user, claims) = service.current_user(&token).await.unwrap();
        service.revoke_token(user.id, &claims).await.unwrap();

        let result = service.current_user(&token).await;
        assert!(matches!(
            result,
            Err(ServerError::Auth(AuthError::TokenRevoked))
        ));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let store = MemoryStore::new();
        let jwt = jwt_manager();
        let service = AccountService::new(&store, &jwt);

        let user = service
            .create_user(signup("test@example.com", "goodpass"))
            .await
            .unwrap();
        let foreign = JwtManager::new(JwtConfig::new("other-secret"))
            .generate_token(user.id, user.email.clone(), None)
            .unwrap();

        assert!(service.current_user(&foreign).await.is_err());
    }
}
