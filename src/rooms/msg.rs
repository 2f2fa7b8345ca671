use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    db::{messages::{self, Message}, users},
    include_res,
    res::{self, escape, markdown, render, timesince},
    session::AuthUser,
};

use super::confirm_delete;

/// A message as shown inside its room.
pub(crate) fn msg_to_html(message: &Message, viewer_id: Option<Uuid>) -> String {
    render(include_res!(str, "/pages/message.html"), &[
        ("id", &message.id.to_string()),
        ("user_id", &message.user_id.to_string()),
        ("username", &escape(&message.username)),
        ("avatar", &escape(&users::avatar_url(message.user_avatar.as_deref()))),
        ("timesince", &timesince(message.created)),
        ("body", &markdown(&message.body)),
        ("delete", &delete_link(message, viewer_id)),
    ])
}

/// A message in an activity feed, naming the room it was posted in.
pub(crate) fn activity_item(message: &Message, viewer_id: Option<Uuid>) -> String {
    render(include_res!(str, "/pages/activity_item.html"), &[
        ("user_id", &message.user_id.to_string()),
        ("username", &escape(&message.username)),
        ("avatar", &escape(&users::avatar_url(message.user_avatar.as_deref()))),
        ("timesince", &timesince(message.created)),
        ("room_id", &message.room_id.to_string()),
        ("room_name", &escape(&message.room_name)),
        ("body", &markdown(&message.body)),
        ("delete", &delete_link(message, viewer_id)),
    ])
}

pub(crate) fn activity_feed(feed: &[Message], viewer_id: Option<Uuid>) -> String {
    if feed.is_empty() {
        return "<p class=\"empty\">No activity yet.</p>".to_owned();
    }
    feed.iter().map(|message| activity_item(message, viewer_id)).collect()
}

fn delete_link(message: &Message, viewer_id: Option<Uuid>) -> String {
    if viewer_id == Some(message.user_id) {
        format!(r#"<a class="delete" href="/delete-message/{}/">Delete</a>"#, message.id)
    } else {
        String::new()
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_message_page(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Response> {
    let Some(message) = messages::find(&db_pool, id).await? else {
        return Ok(res::not_found());
    };
    if message.user_id != auth.user.id {
        return Ok(res::not_allowed());
    }

    confirm_delete(&auth, &message.body, &format!("/room/{}/", message.room_id)).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_message(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Response> {
    let Some(message) = messages::find(&db_pool, id).await? else {
        return Ok(res::not_found());
    };
    if message.user_id != auth.user.id {
        return Ok(res::not_allowed());
    }

    messages::delete(&db_pool, id).await?;
    Ok(Redirect::to(&format!("/room/{}/", message.room_id)).into_response())
}
