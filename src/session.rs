//! Session keys, flash messages and the extractors that resolve the logged-in user.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, AppState, db::users::{self, User}, res};

pub const USER_ID: &str = "user_id";
pub const FLASHES: &str = "flashes";

pub async fn flash(session: &Session, message: impl Into<String>) -> Result<(), tower_sessions::session::Error> {
    let mut flashes = session.get::<Vec<String>>(FLASHES).await?.unwrap_or_default();
    flashes.push(message.into());
    session.insert(FLASHES, flashes).await
}

pub async fn take_flashes(session: &Session) -> Result<Vec<String>, tower_sessions::session::Error> {
    Ok(session.remove::<Vec<String>>(FLASHES).await?.unwrap_or_default())
}

pub async fn log_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await
}

/// The logged-in user, if the session names one that still exists.
pub async fn current_user(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<User>> {
    let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
        return Ok(None);
    };

    let user = users::find(db_pool, user_id).await?;
    if user.is_none() {
        session.remove::<Uuid>(USER_ID).await?;
    }
    Ok(user)
}

/// Only lets through paths on this site, so `return_url` can't bounce users elsewhere.
///
/// Browsers drop tabs and newlines from URLs and read `\` as `/`, so any of
/// those anywhere in the path could turn it into `//host`.
pub fn safe_return_url(return_url: Option<&str>) -> &str {
    match return_url {
        Some(url)
            if url.starts_with('/')
                && !url.starts_with("//")
                && !url.contains(|c: char| c == '\\' || c.is_ascii_control()) =>
        {
            url
        }
        _ => "/",
    }
}

/// Whoever is looking at the page, logged in or not.
pub struct Viewer {
    pub session: Session,
    pub user: Option<User>,
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|user| user.id)
    }

    pub async fn page(&self, title: &str, content: &str) -> AppResult<Response> {
        page(&self.session, self.user.as_ref(), title, content).await
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let user = current_user(&session, &state.db_pool)
            .await
            .map_err(IntoResponse::into_response)?;

        Ok(Viewer { session, user })
    }
}

/// A logged-in user. Anonymous requests are sent to the login page and come
/// back here afterwards.
pub struct AuthUser {
    pub session: Session,
    pub user: User,
}

impl AuthUser {
    pub async fn page(&self, title: &str, content: &str) -> AppResult<Response> {
        page(&self.session, Some(&self.user), title, content).await
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Viewer { session, user } = Viewer::from_request_parts(parts, state).await?;

        match user {
            Some(user) => Ok(AuthUser { session, user }),
            None => Err(Redirect::to(&format!(
                "/login/?return_url={}",
                res::query_encode(parts.uri.path())
            ))
            .into_response()),
        }
    }
}

async fn page(session: &Session, user: Option<&User>, title: &str, content: &str) -> AppResult<Response> {
    let flashes = take_flashes(session).await?;
    Ok(Html(res::layout(title, user, &flashes, content)).into_response())
}
