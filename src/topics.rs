use axum::{
    debug_handler,
    extract::{Query, State},
    response::Response,
};
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    db::{rooms, topics::{self, Topic}},
    include_res,
    index::SearchQuery,
    res::{escape, query_encode, render},
    session::Viewer,
};

/// Topic browser, filtered by `q`.
#[debug_handler(state = AppState)]
pub(crate) async fn topics(
    Query(SearchQuery { q }): Query<SearchQuery>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let q = q.unwrap_or_default();
    let topics = topics::search(&db_pool, &q, None).await?;
    let room_count = rooms::count(&db_pool).await?;

    let content = render(include_res!(str, "/pages/topics.html"), &[
        ("q", &escape(&q)),
        ("topics", &topic_list(&topics, room_count)),
    ]);
    viewer.page("Topics", &content).await
}

/// Sidebar list: "All" followed by each topic with its room count.
pub(crate) fn topic_sidebar(topics: &[Topic], room_count: i64) -> String {
    render(include_res!(str, "/pages/topic_sidebar.html"), &[
        ("topics", &topic_list(topics, room_count)),
    ])
}

fn topic_list(topics: &[Topic], room_count: i64) -> String {
    let mut items = render(include_res!(str, "/pages/topic_item.html"), &[
        ("q", ""),
        ("name", "All"),
        ("count", &room_count.to_string()),
    ]);

    for topic in topics {
        items += &render(include_res!(str, "/pages/topic_item.html"), &[
            ("q", &query_encode(&topic.name)),
            ("name", &escape(&topic.name)),
            ("count", &topic.room_count.to_string()),
        ]);
    }
    items
}
