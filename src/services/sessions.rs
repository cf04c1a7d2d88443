//! Best-effort login session and user action audit. None of this is
//! correctness-critical: callers log failures and move on.

use crate::{
    db::DbPool,
    entities::{
        excluded_user::{self, Entity as ExcludedUser},
        user_action,
        user_session::{self, Entity as UserSession},
    },
    errors::ServiceError,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Explicit handle to the active audit session, created at login and
/// passed to every audit call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: Uuid,
}

/// The trackable actions. Anything outside this enum cannot be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SignIn,
    SignOut,
    CreateUser,
    ViewInventory,
    StartCount,
    CompleteCount,
    GenerateAdjustment,
    ViewMasterData,
    AddRecord,
    UpdateRecord,
    DeleteRecord,
    ViewTransactions,
    CreateTransaction,
    UpdateTransaction,
    DeleteTransaction,
    ViewReports,
    RunCustomerReport,
    RunItemReport,
    RunProductReport,
    RunWarehouseReport,
    RunNegativeReport,
    RunManualReport,
}

#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Mobile|iP(hone|od|ad)|Android|BlackBerry|IEMobile").unwrap());

/// Coarse device classification from the user agent string.
pub fn classify_device(user_agent: Option<&str>) -> &'static str {
    match user_agent {
        Some(ua) if MOBILE_RE.is_match(ua) => "mobile",
        _ => "desktop",
    }
}

#[derive(Clone)]
pub struct SessionTracker {
    db: Arc<DbPool>,
    debounce: Duration,
    creating: Arc<AtomicBool>,
}

impl SessionTracker {
    pub fn new(db: Arc<DbPool>, debounce: Duration) -> Self {
        Self {
            db,
            debounce,
            creating: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn is_excluded(&self, user_id: Uuid) -> Result<bool, ServiceError> {
        let excluded = ExcludedUser::find()
            .filter(excluded_user::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(excluded.is_some())
    }

    /// Opens (or reuses) an audit session for a user. Returns None when
    /// the user is excluded from tracking or another session creation is
    /// already underway. New sessions are written only after the debounce
    /// interval.
    #[instrument(skip(self, meta))]
    pub async fn start_session(
        &self,
        user_id: Uuid,
        meta: SessionMeta,
    ) -> Result<Option<SessionContext>, ServiceError> {
        if self.creating.swap(true, Ordering::SeqCst) {
            debug!("Session creation already in progress; skipping");
            return Ok(None);
        }

        let result = self.start_session_inner(user_id, meta).await;
        self.creating.store(false, Ordering::SeqCst);
        result
    }

    async fn start_session_inner(
        &self,
        user_id: Uuid,
        meta: SessionMeta,
    ) -> Result<Option<SessionContext>, ServiceError> {
        if self.is_excluded(user_id).await? {
            debug!("User {} excluded from tracking", user_id);
            return Ok(None);
        }

        // Reuse an active session when one exists.
        let active = UserSession::find()
            .filter(user_session::Column::UserId.eq(user_id))
            .filter(user_session::Column::EndedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if let Some(session) = active {
            return Ok(Some(SessionContext {
                session_id: session.id,
                user_id,
            }));
        }

        tokio::time::sleep(self.debounce).await;

        let session_id = Uuid::new_v4();
        let device_type = classify_device(meta.user_agent.as_deref());
        let session = user_session::ActiveModel {
            id: Set(session_id),
            user_id: Set(user_id),
            ip_address: Set(meta.ip_address),
            user_agent: Set(meta.user_agent),
            device_type: Set(Some(device_type.to_string())),
            started_at: Set(Utc::now().into()),
            ended_at: Set(None),
        };
        session
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Some(SessionContext {
            session_id,
            user_id,
        }))
    }

    /// Records one user action against an open session.
    pub async fn record_action(
        &self,
        ctx: &SessionContext,
        action: ActionKind,
        details: JsonValue,
    ) -> Result<(), ServiceError> {
        if self.is_excluded(ctx.user_id).await? {
            return Ok(());
        }

        let row = user_action::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(ctx.session_id),
            action_type: Set(action.to_string()),
            action_details: Set(details),
            created_at: Set(Utc::now().into()),
        };
        row.insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    /// Records an action, swallowing and logging any failure. Audit is
    /// telemetry, not a reason to fail the user's request.
    pub async fn try_record_action(
        &self,
        ctx: Option<&SessionContext>,
        action: ActionKind,
        details: JsonValue,
    ) {
        if let Some(ctx) = ctx {
            if let Err(e) = self.record_action(ctx, action, details).await {
                warn!("Failed to record {} action: {}", action, e);
            }
        }
    }

    /// Closes an open session; already-ended sessions are left untouched.
    pub async fn end_session(&self, ctx: &SessionContext) -> Result<(), ServiceError> {
        UserSession::update_many()
            .col_expr(
                user_session::Column::EndedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(user_session::Column::Id.eq(ctx.session_id))
            .filter(user_session::Column::EndedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }
}
