use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use ripple_db::models::{NewNotification, parse_timestamp};
use ripple_types::api::{CommentResponse, CreateCommentRequest};
use ripple_types::models::NotificationKind;

use crate::auth::{AppState, internal};
use crate::middleware::CurrentUser;

pub async fn create(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let author_id = state
        .db
        .post_author(req.post_id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;

    state
        .db
        .insert_comment(req.post_id, me.id, &req.content)
        .map_err(internal)?;

    crate::notify::create(
        &state,
        NewNotification {
            notified_user_id: author_id,
            notifying_user_id: me.id,
            kind: NotificationKind::Comment,
            object_label: Some("post".into()),
            object_id: Some(req.post_id),
            content: format!("{} Commented on your Post.", me.username),
            notifying_avatar: me.avatar_url.clone(),
        },
    )
    .await
    .map_err(internal)?;

    Ok(StatusCode::CREATED)
}

pub async fn for_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.comments_for_post(post_id).map_err(internal)?;
    let comments: Vec<CommentResponse> = rows
        .into_iter()
        .map(|row| CommentResponse {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            content: row.content,
            created_at: parse_timestamp(&row.created_at),
        })
        .collect();
    Ok(Json(comments))
}
