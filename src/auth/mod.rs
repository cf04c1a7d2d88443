/*!
 * # Authentication and Authorization Module
 *
 * Password sign-in backed by the app_user table (argon2 hashes), JWT
 * session tokens, and role-based gating (admin/viewer) read from the
 * profile table. The audit session id is carried inside the token so
 * subsequent requests can attribute actions without another lookup.
 */

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{
    app_user::{self, Entity as AppUser},
    profile::{self, Entity as Profile},
};
use crate::errors::ServiceError;
use crate::services::sessions::SessionContext;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_VIEWER: &str = "viewer";

pub fn is_known_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_VIEWER
}

/// JWT claims for a signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Audit session id, when the login opened one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<Uuid>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// The verified caller, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub session: Option<SessionContext>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Administrator role required".into(),
            ))
        }
    }
}

#[async_trait::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: &str, issuer: String, audience: String, token_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            token_ttl,
        }
    }
}

pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    pub fn hash_password(password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Password check for sign-in, returning the user and their role.
    /// Indistinguishable errors for unknown email and wrong password.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(app_user::Model, String), ServiceError> {
        let user = AppUser::find()
            .filter(app_user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::AuthError("Invalid email or password".into()))?;

        if !Self::verify_password(password, &user.password_hash) {
            return Err(ServiceError::AuthError("Invalid email or password".into()));
        }

        let role = self.role_of(user.id).await?;
        info!("User {} signed in", user.email);
        Ok((user, role))
    }

    /// Re-issues a token with the audit session id embedded.
    pub fn token_with_session(
        &self,
        user: &app_user::Model,
        role: &str,
        session: Option<SessionContext>,
    ) -> Result<String, ServiceError> {
        self.issue_token(user, role, session.map(|s| s.session_id))
    }

    pub async fn role_of(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let profile = Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(profile
            .map(|p| p.role)
            .unwrap_or_else(|| ROLE_VIEWER.to_string()))
    }

    fn issue_token(
        &self,
        user: &app_user::Model,
        role: &str,
        session_id: Option<Uuid>,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: role.to_string(),
            sid: session_id,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now
                + chrono::Duration::from_std(self.config.token_ttl)
                    .unwrap_or_else(|_| chrono::Duration::zero()))
            .timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.config.encoding)
            .map_err(|e| ServiceError::InternalError(format!("Token encoding failed: {}", e)))
    }

    /// Verifies a bearer token and reconstructs the caller.
    pub fn verify(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let data = decode::<Claims>(token, &self.config.decoding, &validation)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".into()))?;

        Ok(AuthUser {
            id: user_id,
            email: data.claims.email,
            role: data.claims.role,
            session: data.claims.sid.map(|session_id| SessionContext {
                session_id,
                user_id,
            }),
        })
    }

    /// Privileged user creation (admin only, checked by the caller):
    /// inserts the credential row and its profile.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: &str,
        display_name: Option<String>,
    ) -> Result<app_user::Model, ServiceError> {
        if !is_known_role(role) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown role {:?}",
                role
            )));
        }
        if !validator::validate_email(email) {
            return Err(ServiceError::ValidationError(
                "Invalid email address".into(),
            ));
        }
        if password.len() < 8 {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters".into(),
            ));
        }

        let existing = AppUser::find()
            .filter(app_user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "User {} already exists",
                email
            )));
        }

        let now = Utc::now();
        let user = app_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set(Self::hash_password(password)?),
            created_at: Set(now.into()),
        };
        let user = user
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let profile = profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            role: Set(role.to_string()),
            display_name: Set(display_name),
            created_at: Set(now.into()),
        };
        profile
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!("Created {} user {}", role, user.email);
        Ok(user)
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Middleware: verifies the bearer token and injects the caller into
/// request extensions.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;
    let user = auth.verify(&token)?;
    debug!("Authenticated {} ({})", user.email, user.role);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware: admin-gated routes (master data, user creation).
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;
    user.require_admin()?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_config() -> AuthConfig {
        AuthConfig::new(
            "an_extremely_long_but_test_only_jwt_secret_with_plenty_of_entropy_0987",
            "wims-api".into(),
            "wims-auth".into(),
            Duration::from_secs(3600),
        )
    }

    fn test_service() -> AuthService {
        // Token paths never touch the database.
        let db = sea_orm::DatabaseConnection::Disconnected;
        AuthService::new(test_config(), Arc::new(db))
    }

    fn test_user() -> app_user::Model {
        app_user::Model {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn password_hashing_round_trips() {
        let hash = AuthService::hash_password("correct horse battery").unwrap();
        assert!(AuthService::verify_password("correct horse battery", &hash));
        assert!(!AuthService::verify_password("wrong", &hash));
        assert!(!AuthService::verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn tokens_round_trip_with_session_context() {
        let service = test_service();
        let user = test_user();
        let session = SessionContext {
            session_id: Uuid::new_v4(),
            user_id: user.id,
        };
        let token = service
            .token_with_session(&user, ROLE_ADMIN, Some(session))
            .unwrap();

        let verified = service.verify(&token).unwrap();
        assert_eq!(verified.id, user.id);
        assert_eq!(verified.email, user.email);
        assert!(verified.is_admin());
        assert_eq!(
            verified.session.map(|s| s.session_id),
            Some(session.session_id)
        );
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let service = test_service();
        let user = test_user();
        let token = service
            .token_with_session(&user, ROLE_VIEWER, None)
            .unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert_matches!(
            service.verify(&tampered),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn viewer_cannot_pass_the_admin_gate() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "viewer@example.com".into(),
            role: ROLE_VIEWER.into(),
            session: None,
        };
        assert_matches!(user.require_admin(), Err(ServiceError::Forbidden(_)));
    }

    #[test]
    fn role_names_are_closed() {
        assert!(is_known_role(ROLE_ADMIN));
        assert!(is_known_role(ROLE_VIEWER));
        assert!(!is_known_role("superuser"));
    }
}
