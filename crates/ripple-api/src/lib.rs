pub mod auth;
pub mod chat;
pub mod comments;
pub mod events;
pub mod follows;
pub mod groups;
pub mod middleware;
pub mod notifications;
pub mod notify;
pub mod posts;
pub mod reactions;
pub mod users;

pub use auth::{AppState, AppStateInner};
