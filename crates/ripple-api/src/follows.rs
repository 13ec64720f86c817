use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use ripple_db::models::NewNotification;
use ripple_types::api::{Decision, FollowAction, FollowDecisionRequest, FollowRequest};
use ripple_types::models::NotificationKind;

use crate::auth::{AppState, internal};
use crate::middleware::CurrentUser;

pub async fn follow(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.followed_id == me.id {
        return Err(StatusCode::BAD_REQUEST);
    }
    let target = state
        .db
        .user_by_id(req.followed_id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;

    match req.action {
        FollowAction::Follow => {
            // The server decides request-vs-follow from the target's
            // privacy; the client never chooses.
            let (status, kind, content) = if target.is_private {
                (
                    "pending",
                    NotificationKind::FollowRequest,
                    format!("{} sent you a follow request.", me.username),
                )
            } else {
                (
                    "accepted",
                    NotificationKind::Follow,
                    format!("{} Started Following You.", me.username),
                )
            };
            state
                .db
                .upsert_follow(me.id, target.id, status)
                .map_err(internal)?;
            crate::notify::create(
                &state,
                NewNotification {
                    notified_user_id: target.id,
                    notifying_user_id: me.id,
                    kind,
                    object_label: Some(me.username.clone()),
                    object_id: Some(me.id),
                    content,
                    notifying_avatar: me.avatar_url.clone(),
                },
            )
            .await
            .map_err(internal)?;
        }
        FollowAction::Unfollow => {
            state
                .db
                .delete_follow(me.id, target.id)
                .map_err(internal)?;
            crate::notify::retract(
                &state,
                me.id,
                target.id,
                NotificationKind::FOLLOW_FAMILY,
                Some(me.id),
                Some(&me.username),
            )
            .await
            .map_err(internal)?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn respond(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<FollowDecisionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let status = state
        .db
        .follow_status(req.follower_id, me.id)
        .map_err(internal)?;
    if status.as_deref() != Some("pending") {
        return Err(StatusCode::NOT_FOUND);
    }

    match req.action {
        Decision::Accept => state
            .db
            .upsert_follow(req.follower_id, me.id, "accepted")
            .map_err(internal)?,
        Decision::Decline => state
            .db
            .delete_follow(req.follower_id, me.id)
            .map_err(internal)?,
    }

    // Either way the request is resolved: the recipient's copy stops
    // being a pending follow_request.
    crate::notify::retype(
        &state,
        req.follower_id,
        me.id,
        &[NotificationKind::FollowRequest],
        NotificationKind::Follow,
    )
    .map_err(internal)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn followers(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = require_visible(&state, &me, &username)?;
    Ok(Json(state.db.followers(user).map_err(internal)?))
}

pub async fn following(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = require_visible(&state, &me, &username)?;
    Ok(Json(state.db.following(user).map_err(internal)?))
}

/// Private profiles expose their edges only to themselves and accepted
/// followers.
fn require_visible(
    state: &crate::auth::AppStateInner,
    me: &CurrentUser,
    username: &str,
) -> Result<i64, StatusCode> {
    let user = state
        .db
        .user_by_username(username)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    if user.is_private && user.id != me.id {
        let accepted = state
            .db
            .follow_status(me.id, user.id)
            .map_err(internal)?
            .as_deref()
            == Some("accepted");
        if !accepted {
            return Err(StatusCode::FORBIDDEN);
        }
    }
    Ok(user.id)
}
