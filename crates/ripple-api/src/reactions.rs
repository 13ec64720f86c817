use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use ripple_db::models::{NewNotification, ReactionOutcome};
use ripple_types::api::{ReactRequest, ReactResponse};
use ripple_types::models::NotificationKind;

use crate::auth::{AppState, internal};
use crate::middleware::CurrentUser;

/// Toggle semantics: first react creates, the same value again removes, a
/// different value swaps in place. The notification follows the row —
/// Created notifies the owner, Removed retracts, Updated leaves the
/// existing notification alone (its content names no value).
pub async fn react(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<ReactRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let (owner_id, object_label) = match (req.post_id, req.comment_id) {
        (Some(post_id), None) => (
            state
                .db
                .post_author(post_id)
                .map_err(internal)?
                .ok_or(StatusCode::NOT_FOUND)?,
            "post",
        ),
        (None, Some(comment_id)) => (
            state
                .db
                .comment_author(comment_id)
                .map_err(internal)?
                .ok_or(StatusCode::NOT_FOUND)?,
            "comment",
        ),
        _ => return Err(StatusCode::BAD_REQUEST),
    };
    let object_id = req.post_id.or(req.comment_id);

    let outcome = state
        .db
        .apply_reaction(me.id, req.post_id, req.comment_id, &req.value)
        .map_err(internal)?;

    match outcome {
        ReactionOutcome::Created => {
            crate::notify::create(
                &state,
                NewNotification {
                    notified_user_id: owner_id,
                    notifying_user_id: me.id,
                    kind: NotificationKind::Reaction,
                    object_label: Some(object_label.into()),
                    object_id,
                    content: if object_label == "post" {
                        format!("{} Reacted on your Post.", me.username)
                    } else {
                        format!("{} Reacted on your Comment.", me.username)
                    },
                    notifying_avatar: me.avatar_url.clone(),
                },
            )
            .await
            .map_err(internal)?;
        }
        ReactionOutcome::Removed => {
            crate::notify::retract(
                &state,
                me.id,
                owner_id,
                &[NotificationKind::Reaction],
                object_id,
                Some(object_label),
            )
            .await
            .map_err(internal)?;
        }
        ReactionOutcome::Updated => {}
    }

    let reactions = state
        .db
        .reaction_counts(req.post_id, req.comment_id)
        .map_err(internal)?;
    let user_reaction = state
        .db
        .user_reaction(me.id, req.post_id, req.comment_id)
        .map_err(internal)?;

    Ok(Json(ReactResponse {
        reactions,
        user_reaction,
    }))
}
