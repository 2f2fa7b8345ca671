use axum::{
    Form, debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    db::{rooms::{self, RoomFields}, topics},
    forms::RoomForm,
    include_res,
    res::{self, escape, render},
    session::{self, AuthUser},
};

use super::confirm_delete;

#[debug_handler(state = AppState)]
pub(crate) async fn create_room_page(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Response> {
    show_room_form(&db_pool, &auth, "Create room", &RoomForm::default()).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_room(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Form(form): Form<RoomForm>,
) -> AppResult<Response> {
    let form = match form.clean() {
        Ok(form) => form,
        Err((form, errors)) => {
            for error in errors {
                session::flash(&auth.session, error.to_string()).await?;
            }
            return show_room_form(&db_pool, &auth, "Create room", &form).await;
        }
    };

    let topic_id = topics::get_or_create(&db_pool, &form.topic).await?;
    let room_id = rooms::create(&db_pool, auth.user.id, RoomFields {
        name: &form.name,
        description: form.description(),
        topic_id,
    })
    .await?;

    tracing::info!(%room_id, host = %auth.user.username, topic = %form.topic, "room created");
    Ok(Redirect::to("/").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_room_page(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Response> {
    let Some(room) = rooms::find(&db_pool, room_id).await? else {
        return Ok(res::not_found());
    };
    if !room.is_host(auth.user.id) {
        return Ok(res::not_allowed());
    }

    let form = RoomForm {
        name: room.name,
        topic: room.topic_name.unwrap_or_default(),
        description: room.description.unwrap_or_default(),
    };
    show_room_form(&db_pool, &auth, "Update room", &form).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_room(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Form(form): Form<RoomForm>,
) -> AppResult<Response> {
    let Some(room) = rooms::find(&db_pool, room_id).await? else {
        return Ok(res::not_found());
    };
    if !room.is_host(auth.user.id) {
        return Ok(res::not_allowed());
    }

    let form = match form.clean() {
        Ok(form) => form,
        Err((form, errors)) => {
            for error in errors {
                session::flash(&auth.session, error.to_string()).await?;
            }
            return show_room_form(&db_pool, &auth, "Update room", &form).await;
        }
    };

    let topic_id = topics::get_or_create(&db_pool, &form.topic).await?;
    rooms::update(&db_pool, room_id, RoomFields {
        name: &form.name,
        description: form.description(),
        topic_id,
    })
    .await?;

    Ok(Redirect::to("/").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_room_page(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Response> {
    let Some(room) = rooms::find(&db_pool, room_id).await? else {
        return Ok(res::not_found());
    };
    if !room.is_host(auth.user.id) {
        return Ok(res::not_allowed());
    }

    confirm_delete(&auth, &room.name, &format!("/room/{room_id}/")).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_room(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Response> {
    let Some(room) = rooms::find(&db_pool, room_id).await? else {
        return Ok(res::not_found());
    };
    if !room.is_host(auth.user.id) {
        return Ok(res::not_allowed());
    }

    rooms::delete(&db_pool, room_id).await?;
    tracing::info!(%room_id, host = %auth.user.username, "room deleted");

    Ok(Redirect::to("/").into_response())
}

async fn show_room_form(db_pool: &SqlitePool, auth: &AuthUser, heading: &str, form: &RoomForm) -> AppResult<Response> {
    let topic_options: String = topics::all(db_pool)
        .await?
        .iter()
        .map(|topic| format!("<option value=\"{}\"></option>", escape(&topic.name)))
        .collect();

    let content = render(include_res!(str, "/pages/room_form.html"), &[
        ("heading", &escape(heading)),
        ("name", &escape(&form.name)),
        ("topic", &escape(&form.topic)),
        ("description", &escape(&form.description)),
        ("topic_options", &topic_options),
    ]);
    auth.page(heading, &content).await
}
