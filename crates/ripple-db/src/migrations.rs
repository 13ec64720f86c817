use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT,
            last_name   TEXT,
            avatar_url  TEXT,
            about       TEXT,
            is_private  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS follows (
            follower_id INTEGER NOT NULL REFERENCES users(id),
            followed_id INTEGER NOT NULL REFERENCES users(id),
            status      TEXT NOT NULL CHECK (status IN ('pending', 'accepted')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (follower_id, followed_id)
        );

        CREATE TABLE IF NOT EXISTS groups (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            description TEXT,
            creator_id  INTEGER NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id    INTEGER NOT NULL REFERENCES groups(id),
            user_id     INTEGER NOT NULL REFERENCES users(id),
            status      TEXT NOT NULL CHECK (status IN ('invited', 'requested', 'accepted')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY,
            author_id   INTEGER NOT NULL REFERENCES users(id),
            group_id    INTEGER REFERENCES groups(id),
            content     TEXT NOT NULL,
            privacy     TEXT NOT NULL DEFAULT 'public'
                        CHECK (privacy IN ('public', 'followers', 'selected')),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS post_viewers (
            post_id     INTEGER NOT NULL REFERENCES posts(id),
            user_id     INTEGER NOT NULL REFERENCES users(id),
            PRIMARY KEY (post_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id          INTEGER PRIMARY KEY,
            post_id     INTEGER NOT NULL REFERENCES posts(id),
            author_id   INTEGER NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        CREATE TABLE IF NOT EXISTS reactions (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            post_id     INTEGER REFERENCES posts(id),
            comment_id  INTEGER REFERENCES comments(id),
            value       TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_reactions_user_post
            ON reactions(user_id, post_id) WHERE post_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_reactions_user_comment
            ON reactions(user_id, comment_id) WHERE comment_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS notifications (
            id                INTEGER PRIMARY KEY,
            notified_user_id  INTEGER NOT NULL REFERENCES users(id),
            notifying_user_id INTEGER NOT NULL REFERENCES users(id),
            kind              TEXT NOT NULL,
            object_label      TEXT,
            object_id         INTEGER,
            content           TEXT NOT NULL,
            is_read           INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL,
            notifying_avatar  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(notified_user_id, is_read, created_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_retract
            ON notifications(notifying_user_id, notified_user_id, kind, object_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY,
            sender_id   INTEGER NOT NULL REFERENCES users(id),
            receiver_id INTEGER REFERENCES users(id),
            group_id    INTEGER REFERENCES groups(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            CHECK ((receiver_id IS NULL) != (group_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_direct
            ON messages(sender_id, receiver_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_group
            ON messages(group_id, created_at);

        CREATE TABLE IF NOT EXISTS chat_notifications (
            message_id       INTEGER NOT NULL REFERENCES messages(id),
            notified_user_id INTEGER NOT NULL REFERENCES users(id),
            PRIMARY KEY (message_id, notified_user_id)
        );

        CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY,
            group_id    INTEGER NOT NULL REFERENCES groups(id),
            creator_id  INTEGER NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            description TEXT,
            event_date  TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS event_responses (
            event_id    INTEGER NOT NULL REFERENCES events(id),
            user_id     INTEGER NOT NULL REFERENCES users(id),
            response    TEXT NOT NULL CHECK (response IN ('going', 'not_going')),
            PRIMARY KEY (event_id, user_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
