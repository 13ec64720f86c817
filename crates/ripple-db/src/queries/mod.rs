mod chat;
mod comments;
mod events;
mod follows;
mod groups;
mod notifications;
mod posts;
mod reactions;
mod sessions;
mod users;
