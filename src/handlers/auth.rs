use crate::{
    auth::AuthUser,
    errors::ServiceError,
    events::Event,
    services::sessions::{ActionKind, SessionMeta},
    ApiResponse, AppState,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: String,
    pub display_name: Option<String>,
}

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes behind the auth middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/users", post(create_user))
}

fn session_meta(headers: &HeaderMap) -> SessionMeta {
    SessionMeta {
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim().to_string()),
        user_agent: headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// Password sign-in. Opens a best-effort audit session and embeds its id
/// in the issued token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in"),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ServiceError> {
    request.validate()?;

    let (user, role) = state
        .services
        .auth
        .verify_credentials(&request.email, &request.password)
        .await?;

    // Session tracking is telemetry; a failure must not block the login.
    let session = match state
        .services
        .sessions
        .start_session(user.id, session_meta(&headers))
        .await
    {
        Ok(session) => session,
        Err(e) => {
            warn!("Session tracking failed for {}: {}", user.email, e);
            None
        }
    };

    let token = state
        .services
        .auth
        .token_with_session(&user, &role, session)?;

    state
        .services
        .sessions
        .try_record_action(session.as_ref(), ActionKind::SignIn, json!({}))
        .await;

    let _ = state.event_sender.send(Event::UserSignedIn(user.id)).await;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: UserInfo {
            id: user.id,
            email: user.email,
            role,
        },
    })))
}

/// Ends the caller's audit session.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    if let Some(session) = user.session.as_ref() {
        state
            .services
            .sessions
            .try_record_action(Some(session), ActionKind::SignOut, json!({}))
            .await;
        if let Err(e) = state.services.sessions.end_session(session).await {
            warn!("Failed to end session for {}: {}", user.email, e);
        }
    }

    let _ = state.event_sender.send(Event::UserSignedOut(user.id)).await;

    Ok(Json(ApiResponse::success(())))
}

/// Who am I.
pub async fn session(user: AuthUser) -> Json<ApiResponse<UserInfo>> {
    Json(ApiResponse::success(UserInfo {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// Privileged user creation; administrators only.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created"),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 409, description = "User already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ServiceError> {
    user.require_admin()?;
    request.validate()?;

    let created = state
        .services
        .auth
        .create_user(
            &request.email,
            &request.password,
            &request.role,
            request.display_name,
        )
        .await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::CreateUser,
            json!({ "email": created.email }),
        )
        .await;

    let _ = state.event_sender.send(Event::UserCreated(created.id)).await;

    Ok(Json(ApiResponse::success(UserInfo {
        id: created.id,
        email: created.email,
        role: request.role,
    })))
}
