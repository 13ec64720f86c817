use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ripple_api::auth::{self, AppState, AppStateInner, SESSION_COOKIE};
use ripple_api::middleware::require_auth;
use ripple_api::{chat, comments, events, follows, groups, notifications, posts, reactions, users};
use ripple_gateway::{Registry, connection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=debug,tower_http=debug".into()),
        )
        .init();

    let db_path = std::env::var("RIPPLE_DB_PATH").unwrap_or_else(|_| "ripple.db".into());
    let host = std::env::var("RIPPLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RIPPLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let db = ripple_db::Database::open(&PathBuf::from(&db_path))?;
    let registry = Registry::new();
    let state: AppState = Arc::new(AppStateInner { db, registry });

    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/logout", post(auth::logout))
        .route("/api/check-session", get(auth::check_session))
        .route("/api/users", get(users::list))
        .route("/api/user/{username}", get(users::profile))
        .route("/api/follow", post(follows::follow))
        .route("/api/follow-requests", post(follows::respond))
        .route("/api/followers/{username}", get(follows::followers))
        .route("/api/following/{username}", get(follows::following))
        .route("/api/post", post(posts::create))
        .route("/api/posts", get(posts::feed))
        .route("/api/post/{id}", get(posts::detail))
        .route("/api/post/{id}/comments", get(comments::for_post))
        .route("/api/comment", post(comments::create))
        .route("/api/react", post(reactions::react))
        .route("/api/group/create", post(groups::create))
        .route("/api/groups", get(groups::list))
        .route("/api/group/{id}", get(groups::detail))
        .route("/api/group/post", post(groups::create_post))
        .route("/api/group/{id}/posts", get(groups::posts))
        .route("/api/group/invite", post(groups::invite))
        .route("/api/group/cancel-invite", post(groups::cancel_invite))
        .route("/api/group/invite/respond", post(groups::respond_invite))
        .route("/api/group/join", post(groups::join))
        .route("/api/group/join/respond", post(groups::respond_join))
        .route("/api/group/members/remove", post(groups::remove_members))
        .route("/api/event", post(events::create))
        .route("/api/group/{id}/events", get(events::for_group))
        .route("/api/event/respond", post(events::respond))
        .route("/api/chat/send", post(chat::send))
        .route("/api/chat", get(chat::direct_history))
        .route("/api/chat-group", get(chat::group_history))
        .route("/api/chats", get(chat::threads))
        .route("/api/chat/mark-read", post(chat::mark_read))
        .route("/api/notifications", get(notifications::list))
        .route("/api/new-notifications", get(notifications::unread))
        .route("/api/notifications/read", post(notifications::mark_all_read))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let ws_route = Router::new().route("/ws", get(ws_upgrade));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ripple server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The upgrade authenticates with the same session cookie as the HTTP
/// surface; an unauthenticated socket is never registered.
async fn ws_upgrade(
    State(state): State<AppState>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let user = state
        .db
        .session_user(&token)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let registry = state.registry.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_socket(socket, registry, user.id, user.username)
    }))
}
