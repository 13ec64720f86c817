use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use ripple_db::models::{NewNotification, parse_timestamp};
use ripple_types::api::{CreateEventRequest, EventItem, EventRespondRequest, EventResponse};
use ripple_types::models::NotificationKind;

use crate::auth::{AppState, internal};
use crate::groups::{require_accepted_member, require_group};
use crate::middleware::CurrentUser;

pub async fn create(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let group = require_group(&state, req.group_id)?;
    require_accepted_member(&state, req.group_id, me.id)?;

    let event_id = state
        .db
        .insert_event(
            group.id,
            me.id,
            &req.title,
            req.description.as_deref(),
            &req.event_date.to_rfc3339(),
        )
        .map_err(internal)?;

    for member in state.db.accepted_member_ids(group.id).map_err(internal)? {
        crate::notify::create(
            &state,
            NewNotification {
                notified_user_id: member,
                notifying_user_id: me.id,
                kind: NotificationKind::EventCreation,
                object_label: Some(group.name.clone()),
                object_id: Some(event_id),
                content: format!(
                    "{} from {} is inviting you to {}.",
                    me.username, group.name, req.title
                ),
                notifying_avatar: me.avatar_url.clone(),
            },
        )
        .await
        .map_err(internal)?;
    }

    Ok(StatusCode::CREATED)
}

pub async fn for_group(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    require_group(&state, group_id)?;
    require_accepted_member(&state, group_id, me.id)?;

    let rows = state.db.events_for_group(group_id).map_err(internal)?;
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let user_response = state
            .db
            .event_responses(row.id)
            .map_err(internal)?
            .into_iter()
            .find(|(uid, _)| *uid == me.id)
            .map(|(_, response)| response);
        events.push(EventItem {
            id: row.id,
            group_id: row.group_id,
            creator_id: row.creator_id,
            title: row.title,
            description: row.description,
            event_date: parse_timestamp(&row.event_date),
            created_at: parse_timestamp(&row.created_at),
            user_response,
        });
    }
    Ok(Json(events))
}

pub async fn respond(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Json(req): Json<EventRespondRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let event = state
        .db
        .event_by_id(req.event_id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    require_accepted_member(&state, event.group_id, me.id)?;

    let response = match req.response {
        EventResponse::Going => "going",
        EventResponse::NotGoing => "not_going",
    };
    state
        .db
        .respond_event(event.id, me.id, response)
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}
