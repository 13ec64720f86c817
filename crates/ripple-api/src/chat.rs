use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use ripple_types::api::{ChatThread, MarkChatReadRequest, SendChatRequest};
use ripple_types::models::ChatMessage;
use ripple_types::push::PushMessage;

use crate::auth::{AppState, AppStateInner, internal};
use crate::groups::require_accepted_member;
use crate::middleware::CurrentUser;

pub async fn send(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<SendChatRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() || req.content.len() > 2000 {
        return Err(StatusCode::BAD_REQUEST);
    }

    match (req.receiver_id, req.group_id) {
        (Some(receiver_id), None) => {
            if receiver_id == me.id {
                return Err(StatusCode::BAD_REQUEST);
            }
            // Direct chat requires an accepted relationship in either
            // direction.
            if !state
                .db
                .users_connected(me.id, receiver_id)
                .map_err(internal)?
            {
                return Err(StatusCode::FORBIDDEN);
            }

            let message = insert_off_runtime(&state, me.id, Some(receiver_id), None, req.content)
                .await?;
            fan_out_direct(&state, &message).await.map_err(internal)?;
            Ok((StatusCode::CREATED, Json(message)))
        }
        (None, Some(group_id)) => {
            require_accepted_member(&state, group_id, me.id)?;

            let message =
                insert_off_runtime(&state, me.id, None, Some(group_id), req.content).await?;
            let members = state.db.accepted_member_ids(group_id).map_err(internal)?;
            fan_out_group(&state, &message, &members)
                .await
                .map_err(internal)?;
            Ok((StatusCode::CREATED, Json(message)))
        }
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

/// Run the hot-path insert off the async runtime.
async fn insert_off_runtime(
    state: &AppState,
    sender_id: i64,
    receiver_id: Option<i64>,
    group_id: Option<i64>,
    content: String,
) -> Result<ChatMessage, StatusCode> {
    let db_state = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db_state
            .db
            .insert_message(sender_id, receiver_id, group_id, &content)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(internal)?;
    Ok(row.into_model())
}

/// Push to both parties, one unread marker for the receiver. The sender
/// echo lets a multi-tab client converge without refetching.
pub async fn fan_out_direct(state: &AppStateInner, message: &ChatMessage) -> anyhow::Result<()> {
    let receiver_id = message
        .receiver_id
        .ok_or_else(|| anyhow::anyhow!("direct fan-out without receiver"))?;

    state.db.create_chat_markers(message.id, &[receiver_id])?;

    let text = serde_json::to_string(&PushMessage::Chat(message.clone()))?;
    state.registry.unicast(message.sender_id, text.clone()).await;
    state.registry.unicast(receiver_id, text).await;
    Ok(())
}

/// Push to every accepted member including the sender; markers for
/// everyone except the sender, who has no unread state for their own
/// message.
pub async fn fan_out_group(
    state: &AppStateInner,
    message: &ChatMessage,
    member_ids: &[i64],
) -> anyhow::Result<()> {
    let marked: Vec<i64> = member_ids
        .iter()
        .copied()
        .filter(|&id| id != message.sender_id)
        .collect();
    state.db.create_chat_markers(message.id, &marked)?;

    let text = serde_json::to_string(&PushMessage::Chat(message.clone()))?;
    for &member in member_ids {
        state.registry.unicast(member, text.clone()).await;
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectChatQuery {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChatQuery {
    pub group_id: i64,
}

pub async fn direct_history(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Query(query): Query<DirectChatQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .direct_history(me.id, query.user_id)
        .map_err(internal)?;
    let messages: Vec<ChatMessage> = rows.into_iter().map(|r| r.into_model()).collect();
    Ok(Json(messages))
}

pub async fn group_history(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Query(query): Query<GroupChatQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    require_accepted_member(&state, query.group_id, me.id)?;
    let rows = state.db.group_history(query.group_id).map_err(internal)?;
    let messages: Vec<ChatMessage> = rows.into_iter().map(|r| r.into_model()).collect();
    Ok(Json(messages))
}

/// Thread list: every direct conversation and joined group collapsed to
/// its latest message plus the viewer's unread marker count.
pub async fn threads(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut threads = Vec::new();

    for row in state.db.latest_direct_messages(me.id).map_err(internal)? {
        let peer_id = if row.sender_id == me.id {
            row.receiver_id.unwrap_or(row.sender_id)
        } else {
            row.sender_id
        };
        let peer = state
            .db
            .user_by_id(peer_id)
            .map_err(internal)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
        let unread = state
            .db
            .unread_direct_markers(me.id, peer_id)
            .map_err(internal)?;
        threads.push(ChatThread {
            peer: Some(peer.item()),
            group_id: None,
            last_message: row.into_model(),
            unread,
        });
    }

    for row in state.db.latest_group_messages(me.id).map_err(internal)? {
        let group_id = row
            .group_id
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
        let unread = state
            .db
            .unread_group_markers(me.id, group_id)
            .map_err(internal)?;
        threads.push(ChatThread {
            peer: None,
            group_id: Some(group_id),
            last_message: row.into_model(),
            unread,
        });
    }

    threads.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
    Ok(Json(threads))
}

/// Thread-level read marking: opening a thread clears every marker the
/// viewer holds for it.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<MarkChatReadRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    match (req.peer_id, req.group_id) {
        (Some(peer_id), None) => state
            .db
            .delete_direct_markers(me.id, peer_id)
            .map_err(internal)?,
        (None, Some(group_id)) => state
            .db
            .delete_group_markers(me.id, group_id)
            .map_err(internal)?,
        _ => return Err(StatusCode::BAD_REQUEST),
    }
    Ok(StatusCode::NO_CONTENT)
}
