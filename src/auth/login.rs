use axum::{
    Form, debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    db::users,
    forms::LoginForm,
    include_res,
    res::{escape, render},
    session::{self, Viewer, safe_return_url},
};

use super::password;

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    viewer: Viewer,
) -> AppResult<Response> {
    if viewer.user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    show_login(&viewer, "", return_url.as_deref()).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(LoginForm { email, password, return_url }): Form<LoginForm>,
) -> AppResult<Response> {
    if viewer.user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let email = email.trim().to_lowercase();
    let Some(user) = users::find_by_email(&db_pool, &email).await? else {
        session::flash(&viewer.session, "Email doesn't exist").await?;
        return show_login(&viewer, &email, return_url.as_deref()).await;
    };

    if !password::verify(password, user.password_hash.clone()).await? {
        tracing::warn!(username = %user.username, "failed login");
        session::flash(&viewer.session, "Username or password doesn't exist").await?;
        return show_login(&viewer, &email, return_url.as_deref()).await;
    }

    session::log_in(&viewer.session, &user).await?;
    tracing::info!(username = %user.username, "logged in");

    Ok(Redirect::to(safe_return_url(return_url.as_deref())).into_response())
}

async fn show_login(viewer: &Viewer, email: &str, return_url: Option<&str>) -> AppResult<Response> {
    let content = render(include_res!(str, "/pages/login.html"), &[
        ("email", &escape(email)),
        ("return_url", &escape(safe_return_url(return_url))),
    ]);
    viewer.page("Login", &content).await
}
