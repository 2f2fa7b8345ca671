use axum::{
    debug_handler,
    extract::{Path, State},
    response::Response,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    db::{messages, rooms, topics, users},
    include_res,
    res::{self, escape, markdown, render},
    rooms::{msg::activity_feed, room_item},
    session::Viewer,
    topics::topic_sidebar,
};

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(user_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(user) = users::find(&db_pool, user_id).await? else {
        return Ok(res::not_found());
    };

    let hosted = rooms::hosted_by(&db_pool, user_id).await?;
    let feed = messages::by_user(&db_pool, user_id).await?;
    let topics = topics::all(&db_pool).await?;
    let room_count = rooms::count(&db_pool).await?;
    let viewer_id = viewer.user_id();

    let room_items: String = if hosted.is_empty() {
        "<p class=\"empty\">No rooms yet.</p>".to_owned()
    } else {
        hosted.iter().map(|room| room_item(room, viewer_id)).collect()
    };

    let edit = if viewer_id == Some(user.id) {
        r#"<a class="button" href="/update-user/">Edit profile</a>"#
    } else {
        ""
    };

    let content = render(include_res!(str, "/pages/profile.html"), &[
        ("avatar", &escape(&user.avatar_url())),
        ("name", &escape(&user.name)),
        ("username", &escape(&user.username)),
        ("bio", &user.bio.as_deref().map(markdown).unwrap_or_default()),
        ("edit", edit),
        ("rooms", &room_items),
        ("activity", &activity_feed(&feed, viewer_id)),
        ("topics", &topic_sidebar(&topics, room_count)),
    ]);

    viewer.page(&format!("@{}", user.username), &content).await
}
