use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::like_pattern;

#[derive(Debug, Clone, FromRow)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub room_count: i64,
}

/// Returns the id of the topic called `name`, creating it first if needed.
pub async fn get_or_create(db_pool: &SqlitePool, name: &str) -> sqlx::Result<Uuid> {
    let name = name.trim();
    sqlx::query("INSERT INTO topics (id,name) VALUES (?,?) ON CONFLICT(name) DO NOTHING")
        .bind(Uuid::now_v7())
        .bind(name)
        .execute(db_pool)
        .await?;

    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM topics WHERE name=?")
        .bind(name)
        .fetch_one(db_pool)
        .await?;
    Ok(id)
}

/// Topics whose name contains `query`, with how many rooms use each.
pub async fn search(db_pool: &SqlitePool, query: &str, limit: Option<i64>) -> sqlx::Result<Vec<Topic>> {
    sqlx::query_as(
        r"SELECT t.id, t.name, COUNT(r.id) AS room_count
        FROM topics t LEFT JOIN rooms r ON r.topic_id = t.id
        WHERE t.name LIKE ? ESCAPE '\'
        GROUP BY t.id, t.name
        ORDER BY t.name
        LIMIT ?",
    )
    .bind(like_pattern(query))
    .bind(limit.unwrap_or(-1))
    .fetch_all(db_pool)
    .await
}

pub async fn all(db_pool: &SqlitePool) -> sqlx::Result<Vec<Topic>> {
    search(db_pool, "", None).await
}
