use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::error;
use uuid::Uuid;

use ripple_db::Database;
use ripple_gateway::Registry;
use ripple_types::api::{LoginRequest, SessionResponse, SignupRequest};

use crate::middleware::CurrentUser;

pub const SESSION_COOKIE: &str = "session_id";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub registry: Registry,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !req.email.contains('@') {
        return Err(StatusCode::BAD_REQUEST);
    }

    if state
        .db
        .user_by_username(&req.username)
        .map_err(internal)?
        .is_some()
    {
        return Err(StatusCode::CONFLICT);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .to_string();

    let user_id = state
        .db
        .create_user(
            &req.username,
            &req.email,
            &password_hash,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
            req.avatar_url.as_deref(),
            req.is_private,
        )
        .map_err(internal)?;

    let (jar, response) = start_session(&state, jar, user_id).map_err(internal)?;
    Ok((StatusCode::CREATED, jar, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .db
        .user_by_username(&req.username)
        .map_err(internal)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let (jar, response) = start_session(&state, jar, user.id).map_err(internal)?;
    Ok((jar, Json(response)))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, StatusCode> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.db.delete_session(cookie.value()).map_err(internal)?;
    }
    Ok((jar.remove(Cookie::from(SESSION_COOKIE)), StatusCode::NO_CONTENT))
}

pub async fn check_session(
    Extension(user): Extension<CurrentUser>,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: ripple_types::models::UserItem {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
        },
    })
}

fn start_session(
    state: &AppStateInner,
    jar: CookieJar,
    user_id: i64,
) -> anyhow::Result<(CookieJar, SessionResponse)> {
    let token = Uuid::new_v4().to_string();
    state.db.create_session(&token, user_id)?;

    let user = state
        .db
        .user_by_id(user_id)?
        .ok_or_else(|| anyhow::anyhow!("session user {} vanished", user_id))?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), SessionResponse { user: user.item() }))
}

pub(crate) fn internal(e: anyhow::Error) -> StatusCode {
    error!("Request failed: {:#}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}
