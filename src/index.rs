use axum::{
    debug_handler,
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    db::{messages, rooms, topics},
    include_res,
    res::{escape, render},
    rooms::{msg::activity_feed, room_item},
    session::Viewer,
    topics::topic_sidebar,
};

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    pub(crate) q: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn home(
    Query(SearchQuery { q }): Query<SearchQuery>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let q = q.unwrap_or_default();
    let viewer_id = viewer.user_id();

    let found = rooms::search(&db_pool, &q).await?;
    let topics = topics::search(&db_pool, "", Some(5)).await?;
    let total_rooms = rooms::count(&db_pool).await?;
    let feed = messages::by_topic(&db_pool, &q).await?;

    let room_items: String = if found.is_empty() {
        "<p class=\"empty\">No rooms found.</p>".to_owned()
    } else {
        found.iter().map(|room| room_item(room, viewer_id)).collect()
    };

    let content = render(include_res!(str, "/pages/home.html"), &[
        ("q", &escape(&q)),
        ("room_count", &found.len().to_string()),
        ("rooms", &room_items),
        ("topics", &topic_sidebar(&topics, total_rooms)),
        ("activity", &activity_feed(&feed, viewer_id)),
    ]);
    viewer.page("Home", &content).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn activity(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let feed = messages::recent(&db_pool, None).await?;

    let content = render(include_res!(str, "/pages/activity.html"), &[
        ("activity", &activity_feed(&feed, viewer.user_id())),
    ]);
    viewer.page("Recent activity", &content).await
}
