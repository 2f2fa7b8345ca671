use axum::{
    Form, debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    db::{messages, rooms, users},
    forms::MessageForm,
    include_res,
    res::{self, escape, markdown, render, timesince},
    session::{self, AuthUser, Viewer},
};

use super::{host_link, manage_links, msg};

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(room) = rooms::find(&db_pool, room_id).await? else {
        return Ok(res::not_found());
    };

    let room_messages = messages::in_room(&db_pool, room_id).await?;
    let participants = rooms::participants(&db_pool, room_id).await?;
    let viewer_id = viewer.user_id();

    let messages: String = room_messages
        .iter()
        .map(|message| msg::msg_to_html(message, viewer_id))
        .collect();

    let participant_items: String = participants
        .iter()
        .map(|p| {
            render(include_res!(str, "/pages/participant.html"), &[
                ("id", &p.id.to_string()),
                ("avatar", &escape(&users::avatar_url(p.avatar.as_deref()))),
                ("name", &escape(&p.name)),
                ("username", &escape(&p.username)),
            ])
        })
        .collect();

    let compose = if viewer.user.is_some() {
        include_res!(str, "/pages/compose.html")
    } else {
        ""
    };

    let content = render(include_res!(str, "/pages/room.html"), &[
        ("name", &escape(&room.name)),
        ("topic", &escape(room.topic_name.as_deref().unwrap_or(""))),
        ("description", &room.description.as_deref().map(markdown).unwrap_or_default()),
        ("host", &host_link(&room)),
        ("timesince", &timesince(room.created)),
        ("manage", &manage_links(&room, viewer_id)),
        ("messages", &messages),
        ("compose", compose),
        ("participant_count", &participants.len().to_string()),
        ("participants", &participant_items),
    ]);

    viewer.page(&room.name, &content).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_message(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Form(MessageForm { body }): Form<MessageForm>,
) -> AppResult<Response> {
    if rooms::find(&db_pool, room_id).await?.is_none() {
        return Ok(res::not_found());
    }

    let body = body.trim();
    if body.is_empty() {
        session::flash(&auth.session, "Message can't be empty").await?;
    } else {
        messages::post(&db_pool, room_id, auth.user.id, body).await?;
    }

    Ok(Redirect::to(&format!("/room/{room_id}/")).into_response())
}
