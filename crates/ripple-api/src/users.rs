use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use ripple_types::api::ProfileResponse;

use crate::auth::{AppState, internal};
use crate::middleware::CurrentUser;

pub async fn list(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let users: Vec<_> = state
        .db
        .list_users()
        .map_err(internal)?
        .into_iter()
        .filter(|u| u.id != me.id)
        .collect();
    Ok(Json(users))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .db
        .user_by_username(&username)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Private profiles expose their edges only to accepted followers and
    // themselves.
    let visible = !user.is_private
        || user.id == me.id
        || state
            .db
            .follow_status(me.id, user.id)
            .map_err(internal)?
            .as_deref()
            == Some("accepted");

    let (followers, following) = if visible {
        (
            state.db.followers(user.id).map_err(internal)?,
            state.db.following(user.id).map_err(internal)?,
        )
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(Json(ProfileResponse {
        user: user.item(),
        first_name: user.first_name,
        last_name: user.last_name,
        about: user.about,
        is_private: user.is_private,
        followers,
        following,
    }))
}
