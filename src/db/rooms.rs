use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::like_pattern;

/// A room joined with its host and topic.
#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub host_id: Option<Uuid>,
    pub host_name: Option<String>,
    pub host_username: Option<String>,
    pub host_avatar: Option<String>,
    pub topic_id: Option<Uuid>,
    pub topic_name: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub participant_count: i64,
    pub updated: OffsetDateTime,
    pub created: OffsetDateTime,
}

impl Room {
    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_id == Some(user_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar: Option<String>,
}

pub struct RoomFields<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub topic_id: Uuid,
}

const ROOM_SELECT: &str = "SELECT r.id, r.host_id, u.name AS host_name, u.username AS host_username,
        u.avatar AS host_avatar, r.topic_id, t.name AS topic_name, r.name, r.description,
        (SELECT COUNT(*) FROM room_participants p WHERE p.room_id = r.id) AS participant_count,
        r.updated, r.created
    FROM rooms r
    LEFT JOIN users u ON u.id = r.host_id
    LEFT JOIN topics t ON t.id = r.topic_id";

pub async fn create(db_pool: &SqlitePool, host_id: Uuid, fields: RoomFields<'_>) -> sqlx::Result<Uuid> {
    let id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();
    sqlx::query("INSERT INTO rooms (id,host_id,topic_id,name,description,updated,created) VALUES (?,?,?,?,?,?,?)")
        .bind(id)
        .bind(host_id)
        .bind(fields.topic_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(now)
        .bind(now)
        .execute(db_pool)
        .await?;
    Ok(id)
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Room>> {
    sqlx::query_as(&format!("{ROOM_SELECT} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn update(db_pool: &SqlitePool, id: Uuid, fields: RoomFields<'_>) -> sqlx::Result<()> {
    sqlx::query("UPDATE rooms SET topic_id=?, name=?, description=?, updated=? WHERE id=?")
        .bind(fields.topic_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Deletes the room; its messages and participant links go with it.
pub async fn delete(db_pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM rooms WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Rooms whose topic, name or description contains `query`, most recently updated first.
pub async fn search(db_pool: &SqlitePool, query: &str) -> sqlx::Result<Vec<Room>> {
    sqlx::query_as(&format!(
        r"{ROOM_SELECT}
        WHERE t.name LIKE ?1 ESCAPE '\' OR r.name LIKE ?1 ESCAPE '\' OR r.description LIKE ?1 ESCAPE '\'
        ORDER BY r.updated DESC, r.created DESC"
    ))
    .bind(like_pattern(query))
    .fetch_all(db_pool)
    .await
}

pub async fn hosted_by(db_pool: &SqlitePool, user_id: Uuid) -> sqlx::Result<Vec<Room>> {
    sqlx::query_as(&format!("{ROOM_SELECT} WHERE r.host_id = ? ORDER BY r.updated DESC, r.created DESC"))
        .bind(user_id)
        .fetch_all(db_pool)
        .await
}

pub async fn count(db_pool: &SqlitePool) -> sqlx::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}

pub async fn participants(db_pool: &SqlitePool, room_id: Uuid) -> sqlx::Result<Vec<Participant>> {
    sqlx::query_as(
        "SELECT u.id, u.name, u.username, u.avatar
        FROM room_participants p JOIN users u ON u.id = p.user_id
        WHERE p.room_id = ?
        ORDER BY u.username",
    )
    .bind(room_id)
    .fetch_all(db_pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, messages, testing, topics};

    async fn room(db_pool: &SqlitePool, host_id: Uuid, name: &str, topic: &str, description: Option<&str>) -> Uuid {
        let topic_id = topics::get_or_create(db_pool, topic).await.unwrap();
        create(db_pool, host_id, RoomFields { name, description, topic_id }).await.unwrap()
    }

    #[tokio::test]
    async fn create_with_new_topic_makes_one_topic_and_one_room() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;

        let id = room(&db_pool, host, "Let's learn", "Python", None).await;
        assert_eq!(count(&db_pool).await.unwrap(), 1);
        assert_eq!(topics::all(&db_pool).await.unwrap().len(), 1);

        let found = find(&db_pool, id).await.unwrap().unwrap();
        assert_eq!(found.name, "Let's learn");
        assert_eq!(found.topic_name.as_deref(), Some("Python"));
        assert_eq!(found.host_username.as_deref(), Some("host"));
        assert!(found.is_host(host));
        assert_eq!(found.participant_count, 0);

        room(&db_pool, host, "Again", "Python", None).await;
        let topics = topics::all(&db_pool).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].room_count, 2);
    }

    #[tokio::test]
    async fn search_matches_topic_name_and_description() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        room(&db_pool, host, "Jazz night", "Music", None).await;
        room(&db_pool, host, "Borrow checker", "Rust", Some("lifetimes and MUSIC")).await;
        room(&db_pool, host, "Snakes", "Python", Some("pip")).await;

        let names = |rooms: Vec<Room>| rooms.into_iter().map(|r| r.name).collect::<Vec<_>>();
        let mut music = names(search(&db_pool, "music").await.unwrap());
        music.sort();
        assert_eq!(music, ["Borrow checker", "Jazz night"]);
        assert_eq!(names(search(&db_pool, "SNAKE").await.unwrap()), ["Snakes"]);
        assert_eq!(search(&db_pool, "").await.unwrap().len(), 3);
        assert!(search(&db_pool, "haskell").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        let guest = testing::user(&db_pool, "guest").await;
        let doomed = room(&db_pool, host, "Doomed", "Misc", None).await;
        let kept = room(&db_pool, host, "Kept", "Misc", None).await;

        messages::post(&db_pool, doomed, guest, "first").await.unwrap();
        messages::post(&db_pool, doomed, host, "second").await.unwrap();
        messages::post(&db_pool, kept, guest, "stays").await.unwrap();

        assert!(delete(&db_pool, doomed).await.unwrap());
        assert!(!delete(&db_pool, doomed).await.unwrap());
        assert!(find(&db_pool, doomed).await.unwrap().is_none());
        assert!(messages::in_room(&db_pool, doomed).await.unwrap().is_empty());
        assert!(participants(&db_pool, doomed).await.unwrap().is_empty());
        assert_eq!(messages::recent(&db_pool, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_changes_topic() {
        let db_pool = connect_in_memory().await.unwrap();
        let host = testing::user(&db_pool, "host").await;
        let id = room(&db_pool, host, "Room", "Old", None).await;

        let topic_id = topics::get_or_create(&db_pool, "New").await.unwrap();
        update(&db_pool, id, RoomFields { name: "Renamed", description: Some("desc"), topic_id }).await.unwrap();

        let found = find(&db_pool, id).await.unwrap().unwrap();
        assert_eq!(found.name, "Renamed");
        assert_eq!(found.description.as_deref(), Some("desc"));
        assert_eq!(found.topic_name.as_deref(), Some("New"));
        assert!(found.updated >= found.created);
        assert_eq!(hosted_by(&db_pool, host).await.unwrap().len(), 1);
    }
}
