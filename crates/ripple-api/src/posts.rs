use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use ripple_db::models::{NewNotification, PostRow, parse_timestamp};
use ripple_types::api::{CreatePostRequest, PostPrivacy, PostResponse};
use ripple_types::models::NotificationKind;

use crate::auth::{AppState, AppStateInner, internal};
use crate::middleware::CurrentUser;

pub async fn create(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let privacy = privacy_tag(req.privacy);
    let post_id = state
        .db
        .insert_post(me.id, None, &req.content, privacy)
        .map_err(internal)?;

    // Who hears about it depends on privacy: selected viewers get both the
    // viewer row and the notification; everyone else notifies accepted
    // followers.
    let recipients = match req.privacy {
        PostPrivacy::Selected => {
            for viewer_id in &req.viewer_ids {
                state
                    .db
                    .insert_post_viewer(post_id, *viewer_id)
                    .map_err(internal)?;
            }
            req.viewer_ids.clone()
        }
        _ => state.db.accepted_follower_ids(me.id).map_err(internal)?,
    };

    for recipient in recipients {
        crate::notify::create(
            &state,
            NewNotification {
                notified_user_id: recipient,
                notifying_user_id: me.id,
                kind: NotificationKind::Post,
                object_label: Some("post".into()),
                object_id: Some(post_id),
                content: format!("{} added a new post.", me.username),
                notifying_avatar: me.avatar_url.clone(),
            },
        )
        .await
        .map_err(internal)?;
    }

    Ok(StatusCode::CREATED)
}

pub async fn feed(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.visible_posts(me.id).map_err(internal)?;
    let posts = rows
        .into_iter()
        .map(|row| post_response(&state, me.id, row))
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(internal)?;
    Ok(Json(posts))
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .post_by_id(post_id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    if !can_view(&state, me.id, &row).map_err(internal)? {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(post_response(&state, me.id, row).map_err(internal)?))
}

/// Single-post visibility mirrors the feed query: own posts always, group
/// posts for accepted members, otherwise by privacy.
fn can_view(state: &AppStateInner, viewer_id: i64, post: &PostRow) -> anyhow::Result<bool> {
    if post.author_id == viewer_id {
        return Ok(true);
    }
    if let Some(group_id) = post.group_id {
        let status = state.db.member_status(group_id, viewer_id)?;
        return Ok(status.as_deref() == Some("accepted"));
    }
    match post.privacy.as_str() {
        "public" => Ok(true),
        "followers" => Ok(state
            .db
            .follow_status(viewer_id, post.author_id)?
            .as_deref()
            == Some("accepted")),
        "selected" => state.db.is_post_viewer(post.id, viewer_id),
        _ => Ok(false),
    }
}

pub(crate) fn post_response(
    state: &AppStateInner,
    viewer_id: i64,
    row: PostRow,
) -> anyhow::Result<PostResponse> {
    let reactions = state.db.reaction_counts(Some(row.id), None)?;
    let user_reaction = state.db.user_reaction(viewer_id, Some(row.id), None)?;
    Ok(PostResponse {
        id: row.id,
        author_id: row.author_id,
        author_username: row.author_username,
        group_id: row.group_id,
        content: row.content,
        privacy: row.privacy,
        created_at: parse_timestamp(&row.created_at),
        reactions,
        user_reaction,
    })
}

fn privacy_tag(privacy: PostPrivacy) -> &'static str {
    match privacy {
        PostPrivacy::Public => "public",
        PostPrivacy::Followers => "followers",
        PostPrivacy::Selected => "selected",
    }
}
