use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::like_pattern;

/// A message joined with its author and room.
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_name: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub username: String,
    pub user_avatar: Option<String>,
    pub body: String,
    pub updated: OffsetDateTime,
    pub created: OffsetDateTime,
}

const MESSAGE_SELECT: &str = "SELECT m.id, m.room_id, r.name AS room_name, m.user_id, u.name AS user_name,
        u.username, u.avatar AS user_avatar, m.body, m.updated, m.created
    FROM messages m
    JOIN rooms r ON r.id = m.room_id
    JOIN users u ON u.id = m.user_id";

// v7 ids sort by creation time
const NEWEST_FIRST: &str = "ORDER BY m.id DESC";

/// Stores the message and makes its author a participant of the room.
pub async fn post(db_pool: &SqlitePool, room_id: Uuid, user_id: Uuid, body: &str) -> sqlx::Result<Uuid> {
    let id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO messages (id,user_id,room_id,body,updated,created) VALUES (?,?,?,?,?,?)")
        .bind(id)
        .bind(user_id)
        .bind(room_id)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT OR IGNORE INTO room_participants (room_id,user_id) VALUES (?,?)")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(id)
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Message>> {
    sqlx::query_as(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn delete(db_pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM messages WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn in_room(db_pool: &SqlitePool, room_id: Uuid) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(&format!("{MESSAGE_SELECT} WHERE m.room_id = ? {NEWEST_FIRST}"))
        .bind(room_id)
        .fetch_all(db_pool)
        .await
}

pub async fn by_user(db_pool: &SqlitePool, user_id: Uuid) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(&format!("{MESSAGE_SELECT} WHERE m.user_id = ? {NEWEST_FIRST}"))
        .bind(user_id)
        .fetch_all(db_pool)
        .await
}

/// Messages posted in rooms whose topic name contains `query`.
pub async fn by_topic(db_pool: &SqlitePool, query: &str) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(&format!(
        r"{MESSAGE_SELECT}
        JOIN topics t ON t.id = r.topic_id
        WHERE t.name LIKE ? ESCAPE '\'
        {NEWEST_FIRST}"
    ))
    .bind(like_pattern(query))
    .fetch_all(db_pool)
    .await
}

pub async fn recent(db_pool: &SqlitePool, limit: Option<i64>) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(&format!("{MESSAGE_SELECT} {NEWEST_FIRST} LIMIT ?"))
        .bind(limit.unwrap_or(-1))
        .fetch_all(db_pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, rooms::{self, RoomFields}, testing, topics};

    async fn room(db_pool: &SqlitePool, host_id: Uuid, topic: &str) -> Uuid {
        let topic_id = topics::get_or_create(db_pool, topic).await.unwrap();
        rooms::create(db_pool, host_id, RoomFields { name: "room", description: None, topic_id })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn posting_adds_author_to_participants_once() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        let guest = testing::user(&db_pool, "guest").await;
        let room_id = room(&db_pool, host, "Music").await;

        assert!(rooms::participants(&db_pool, room_id).await.unwrap().is_empty());

        post(&db_pool, room_id, guest, "hello").await.unwrap();
        post(&db_pool, room_id, guest, "hello again").await.unwrap();

        let participants = rooms::participants(&db_pool, room_id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].id, guest);
        assert_eq!(rooms::find(&db_pool, room_id).await.unwrap().unwrap().participant_count, 1);
    }

    #[tokio::test]
    async fn room_messages_are_newest_first() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        let room_id = room(&db_pool, host, "Music").await;

        for body in ["one", "two", "three"] {
            post(&db_pool, room_id, host, body).await.unwrap();
        }

        let bodies: Vec<String> = in_room(&db_pool, room_id).await.unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, ["three", "two", "one"]);
        assert_eq!(recent(&db_pool, Some(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_single_message() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        let room_id = room(&db_pool, host, "Music").await;
        let keep = post(&db_pool, room_id, host, "keep").await.unwrap();
        let drop = post(&db_pool, room_id, host, "drop").await.unwrap();

        let found = find(&db_pool, drop).await.unwrap().unwrap();
        assert_eq!(found.user_id, host);
        assert_eq!(found.username, "host");
        assert_eq!(found.room_name, "room");

        assert!(delete(&db_pool, drop).await.unwrap());
        assert!(find(&db_pool, drop).await.unwrap().is_none());
        assert!(find(&db_pool, keep).await.unwrap().is_some());
        assert_eq!(by_user(&db_pool, host).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn by_topic_filters_on_room_topic() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        let music = room(&db_pool, host, "Music").await;
        let rust = room(&db_pool, host, "Rust").await;
        post(&db_pool, music, host, "la la").await.unwrap();
        post(&db_pool, rust, host, "borrowck").await.unwrap();

        let found = by_topic(&db_pool, "MUS").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body, "la la");
        assert_eq!(by_topic(&db_pool, "").await.unwrap().len(), 2);
    }
}
