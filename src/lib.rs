pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod forms;
pub mod index;
pub mod profiles;
pub mod res;
pub mod rooms;
pub mod session;
pub mod topics;

use std::sync::Arc;

use axum::{Router, extract::FromRef, routing::get};
use sqlx::SqlitePool;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

pub use appresult::{AppError, AppResult};
pub use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(state.config.session_idle));

    let media = ServeDir::new(&state.config.media_dir);

    Router::new()
        .route("/", get(index::home))
        .route("/activity", get(index::activity))
        .route("/topics/", get(topics::topics))
        .route("/static/{file}", get(res::static_file))
        .merge(auth::router())
        .merge(rooms::router())
        .merge(profiles::router())
        .nest_service("/media", media)
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
