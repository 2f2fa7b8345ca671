mod edit;
pub(crate) mod msg;
mod room;

use axum::{Router, response::Response, routing::get};

use crate::{
    AppResult, AppState,
    db::{rooms::Room, users},
    include_res,
    res::{escape, render, timesince},
    session::AuthUser,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/room/{id}/", get(room::room).post(room::post_message))
        .route("/create-room/", get(edit::create_room_page).post(edit::create_room))
        .route("/update-room/{id}/", get(edit::update_room_page).post(edit::update_room))
        .route("/delete-room/{id}/", get(edit::delete_room_page).post(edit::delete_room))
        .route("/delete-message/{id}/", get(msg::delete_message_page).post(msg::delete_message))
}

/// A room card for the home and profile feeds.
pub(crate) fn room_item(room: &Room, viewer_id: Option<uuid::Uuid>) -> String {
    render(include_res!(str, "/pages/room_item.html"), &[
        ("id", &room.id.to_string()),
        ("host", &host_link(room)),
        ("avatar", &escape(&users::avatar_url(room.host_avatar.as_deref()))),
        ("timesince", &timesince(room.created)),
        ("name", &escape(&room.name)),
        ("topic", &escape(room.topic_name.as_deref().unwrap_or(""))),
        ("participant_count", &room.participant_count.to_string()),
        ("manage", &manage_links(room, viewer_id)),
    ])
}

/// Edit/delete links, only for the room's host.
pub(crate) fn manage_links(room: &Room, viewer_id: Option<uuid::Uuid>) -> String {
    if viewer_id.is_some_and(|id| room.is_host(id)) {
        format!(
            r#"<a href="/update-room/{id}/">Edit</a> <a href="/delete-room/{id}/">Delete</a>"#,
            id = room.id
        )
    } else {
        String::new()
    }
}

pub(crate) fn host_link(room: &Room) -> String {
    match (room.host_id, &room.host_username) {
        (Some(id), Some(username)) => format!(r#"<a href="/profile/{id}/">@{}</a>"#, escape(username)),
        _ => "<span>@deleted</span>".to_owned(),
    }
}

/// "Are you sure" page shared by room and message deletion.
pub(crate) async fn confirm_delete(auth: &AuthUser, item: &str, back: &str) -> AppResult<Response> {
    let content = render(include_res!(str, "/pages/delete.html"), &[
        ("item", &escape(item)),
        ("back", &escape(back)),
    ]);
    auth.page("Delete", &content).await
}
