use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub password_hash: String,
    pub created: OffsetDateTime,
}

impl User {
    pub fn avatar_url(&self) -> String {
        avatar_url(self.avatar.as_deref())
    }
}

pub fn avatar_url(avatar: Option<&str>) -> String {
    match avatar {
        Some(file) => format!("/media/{file}"),
        None => "/static/avatar.svg".to_owned(),
    }
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// `avatar: None` keeps the current picture.
pub struct ProfileUpdate<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub bio: Option<&'a str>,
    pub avatar: Option<&'a str>,
}

const USER_COLUMNS: &str = "id,name,username,email,bio,avatar,password_hash,created";

pub async fn create(db_pool: &SqlitePool, new_user: NewUser<'_>) -> sqlx::Result<User> {
    let user = User {
        id: Uuid::now_v7(),
        name: new_user.name.to_owned(),
        username: new_user.username.to_lowercase(),
        email: new_user.email.to_lowercase(),
        bio: None,
        avatar: None,
        password_hash: new_user.password_hash.to_owned(),
        created: OffsetDateTime::now_utc(),
    };

    sqlx::query("INSERT INTO users (id,name,username,email,password_hash,created) VALUES (?,?,?,?,?,?)")
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created)
        .execute(db_pool)
        .await?;

    Ok(user)
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn find_by_email(db_pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email=?"))
        .bind(email.trim().to_lowercase())
        .fetch_optional(db_pool)
        .await
}

/// Whether another user (not `except`) already holds this username.
pub async fn username_taken(db_pool: &SqlitePool, username: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username=?")
        .bind(username.to_lowercase())
        .fetch_optional(db_pool)
        .await?;
    Ok(row.is_some_and(|(id,)| Some(id) != except))
}

pub async fn email_taken(db_pool: &SqlitePool, email: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email=?")
        .bind(email.to_lowercase())
        .fetch_optional(db_pool)
        .await?;
    Ok(row.is_some_and(|(id,)| Some(id) != except))
}

pub async fn update_profile(db_pool: &SqlitePool, id: Uuid, update: ProfileUpdate<'_>) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE users SET name=?, username=?, email=?, bio=?, avatar=COALESCE(?, avatar) WHERE id=?",
    )
    .bind(update.name)
    .bind(update.username.to_lowercase())
    .bind(update.email.to_lowercase())
    .bind(update.bio)
    .bind(update.avatar)
    .bind(id)
    .execute(db_pool)
    .await?;
    Ok(())
}
