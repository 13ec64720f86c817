use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use ripple_types::api::UnreadCountResponse;
use ripple_types::models::Notification;

use crate::auth::{AppState, internal};
use crate::middleware::CurrentUser;

pub async fn list(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.notifications_for(me.id).map_err(internal)?;
    let notifications = rows
        .into_iter()
        .map(|r| r.into_model())
        .collect::<anyhow::Result<Vec<Notification>>>()
        .map_err(internal)?;
    Ok(Json(notifications))
}

pub async fn unread(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.unread_notifications_for(me.id).map_err(internal)?;
    let notifications = rows
        .into_iter()
        .map(|r| r.into_model())
        .collect::<anyhow::Result<Vec<Notification>>>()
        .map_err(internal)?;
    Ok(Json(notifications))
}

/// One bulk flip; there is no single-row read surface.
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.mark_all_notifications_read(me.id).map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always derived with COUNT(*), never stored.
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let unread_count = state.db.unread_notification_count(me.id).map_err(internal)?;
    Ok(Json(UnreadCountResponse { unread_count }))
}
