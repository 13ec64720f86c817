use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use ripple_db::models::{GroupRow, NewNotification, parse_timestamp};
use ripple_types::api::{
    CancelInviteRequest, CreateGroupPostRequest, CreateGroupRequest, Decision,
    GroupDetailResponse, GroupResponse, InviteDecisionRequest, InviteRequest, JoinAction,
    JoinDecisionRequest, JoinRequest, RemoveMembersRequest,
};
use ripple_types::models::NotificationKind;

use crate::auth::{AppState, AppStateInner, internal};
use crate::middleware::CurrentUser;

pub async fn create(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let group_id = state
        .db
        .create_group(&req.name, req.description.as_deref(), me.id)
        .map_err(internal)?;

    for invitee in &req.invitee_ids {
        invite_user(&state, &me, group_id, &req.name, *invitee)
            .await
            .map_err(internal)?;
    }

    Ok(StatusCode::CREATED)
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let groups: Vec<GroupResponse> = state
        .db
        .list_groups()
        .map_err(internal)?
        .into_iter()
        .map(group_response)
        .collect();
    Ok(Json(groups))
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = state
        .db
        .group_by_id(group_id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let members = state.db.group_members(group_id).map_err(internal)?;
    let member_status = state.db.member_status(group_id, me.id).map_err(internal)?;
    Ok(Json(GroupDetailResponse {
        group: group_response(group),
        members,
        member_status,
    }))
}

pub async fn invite(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<InviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = require_group(&state, req.group_id)?;
    require_accepted_member(&state, req.group_id, me.id)?;

    for user_id in &req.user_ids {
        // Already-accepted members keep their status; everyone else
        // becomes invited.
        let status = state
            .db
            .member_status(req.group_id, *user_id)
            .map_err(internal)?;
        if status.as_deref() == Some("accepted") {
            continue;
        }
        invite_user(&state, &me, group.id, &group.name, *user_id)
            .await
            .map_err(internal)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_invite(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<CancelInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = require_group(&state, req.group_id)?;
    require_accepted_member(&state, req.group_id, me.id)?;

    let status = state
        .db
        .member_status(req.group_id, req.user_id)
        .map_err(internal)?;
    if status.as_deref() != Some("invited") {
        return Err(StatusCode::NOT_FOUND);
    }

    state
        .db
        .remove_member(req.group_id, req.user_id)
        .map_err(internal)?;
    crate::notify::retract_received(
        &state,
        req.user_id,
        &[NotificationKind::GroupInvitation],
        Some(group.id),
        Some(&group.name),
    )
    .await
    .map_err(internal)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn respond_invite(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<InviteDecisionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = require_group(&state, req.group_id)?;
    let status = state
        .db
        .member_status(req.group_id, me.id)
        .map_err(internal)?;
    if status.as_deref() != Some("invited") {
        return Err(StatusCode::NOT_FOUND);
    }

    match req.action {
        Decision::Accept => state
            .db
            .set_member_status(req.group_id, me.id, "accepted")
            .map_err(internal)?,
        Decision::Decline => state
            .db
            .remove_member(req.group_id, me.id)
            .map_err(internal)?,
    }

    // The invitation is resolved either way; the inviter is not part of
    // the request payload, so match on the recipient side.
    crate::notify::retract_received(
        &state,
        me.id,
        &[NotificationKind::GroupInvitation],
        Some(group.id),
        Some(&group.name),
    )
    .await
    .map_err(internal)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn join(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = require_group(&state, req.group_id)?;
    if group.creator_id == me.id {
        return Err(StatusCode::BAD_REQUEST);
    }

    match req.action {
        JoinAction::Join => {
            let status = state
                .db
                .member_status(req.group_id, me.id)
                .map_err(internal)?;
            if status.is_some() {
                return Err(StatusCode::CONFLICT);
            }
            state
                .db
                .set_member_status(req.group_id, me.id, "requested")
                .map_err(internal)?;
            crate::notify::create(
                &state,
                NewNotification {
                    notified_user_id: group.creator_id,
                    notifying_user_id: me.id,
                    kind: NotificationKind::GroupJoinRequest,
                    object_label: Some(group.name.clone()),
                    object_id: Some(group.id),
                    content: format!("{} requests to join '{}' group", me.username, group.name),
                    notifying_avatar: me.avatar_url.clone(),
                },
            )
            .await
            .map_err(internal)?;
        }
        JoinAction::Unjoin => {
            state
                .db
                .remove_member(req.group_id, me.id)
                .map_err(internal)?;
            // Benign no-op when the membership was already accepted
            crate::notify::retract(
                &state,
                me.id,
                group.creator_id,
                &[NotificationKind::GroupJoinRequest],
                Some(group.id),
                Some(&group.name),
            )
            .await
            .map_err(internal)?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn respond_join(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<JoinDecisionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = require_group(&state, req.group_id)?;
    if group.creator_id != me.id {
        return Err(StatusCode::FORBIDDEN);
    }
    let status = state
        .db
        .member_status(req.group_id, req.user_id)
        .map_err(internal)?;
    if status.as_deref() != Some("requested") {
        return Err(StatusCode::NOT_FOUND);
    }

    match req.action {
        Decision::Accept => state
            .db
            .set_member_status(req.group_id, req.user_id, "accepted")
            .map_err(internal)?,
        Decision::Decline => state
            .db
            .remove_member(req.group_id, req.user_id)
            .map_err(internal)?,
    }

    crate::notify::retract(
        &state,
        req.user_id,
        me.id,
        &[NotificationKind::GroupJoinRequest],
        Some(group.id),
        Some(&group.name),
    )
    .await
    .map_err(internal)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_members(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<RemoveMembersRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let group = require_group(&state, req.group_id)?;
    if group.creator_id != me.id {
        return Err(StatusCode::FORBIDDEN);
    }
    for user_id in &req.user_ids {
        if *user_id == me.id {
            continue;
        }
        state
            .db
            .remove_member(req.group_id, *user_id)
            .map_err(internal)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<CreateGroupPostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let group = require_group(&state, req.group_id)?;
    require_accepted_member(&state, req.group_id, me.id)?;

    let post_id = state
        .db
        .insert_post(me.id, Some(group.id), &req.content, "public")
        .map_err(internal)?;

    for member in state.db.accepted_member_ids(group.id).map_err(internal)? {
        crate::notify::create(
            &state,
            NewNotification {
                notified_user_id: member,
                notifying_user_id: me.id,
                kind: NotificationKind::Post,
                object_label: Some("post".into()),
                object_id: Some(post_id),
                content: format!(
                    "{} added a new post in '{}' group.",
                    me.username, group.name
                ),
                notifying_avatar: me.avatar_url.clone(),
            },
        )
        .await
        .map_err(internal)?;
    }

    Ok(StatusCode::CREATED)
}

pub async fn posts(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    require_group(&state, group_id)?;
    require_accepted_member(&state, group_id, me.id)?;

    let rows = state.db.group_posts(group_id).map_err(internal)?;
    let posts = rows
        .into_iter()
        .map(|row| crate::posts::post_response(&state, me.id, row))
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(internal)?;
    Ok(Json(posts))
}

async fn invite_user(
    state: &AppStateInner,
    me: &CurrentUser,
    group_id: i64,
    group_name: &str,
    user_id: i64,
) -> anyhow::Result<()> {
    state.db.set_member_status(group_id, user_id, "invited")?;
    crate::notify::create(
        state,
        NewNotification {
            notified_user_id: user_id,
            notifying_user_id: me.id,
            kind: NotificationKind::GroupInvitation,
            object_label: Some(group_name.to_string()),
            object_id: Some(group_id),
            content: format!("{} invited you to '{}' group", me.username, group_name),
            notifying_avatar: me.avatar_url.clone(),
        },
    )
    .await
}

pub(crate) fn require_group(state: &AppStateInner, group_id: i64) -> Result<GroupRow, StatusCode> {
    state
        .db
        .group_by_id(group_id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)
}

pub(crate) fn require_accepted_member(
    state: &AppStateInner,
    group_id: i64,
    user_id: i64,
) -> Result<(), StatusCode> {
    let status = state.db.member_status(group_id, user_id).map_err(internal)?;
    if status.as_deref() == Some("accepted") {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

fn group_response(row: GroupRow) -> GroupResponse {
    GroupResponse {
        id: row.id,
        name: row.name,
        description: row.description,
        creator_id: row.creator_id,
        created_at: parse_timestamp(&row.created_at),
    }
}
