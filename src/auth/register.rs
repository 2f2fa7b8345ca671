use axum::{
    Form, debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    db::users::{self, NewUser},
    forms::{self, RegisterForm},
    include_res,
    res::{escape, render},
    session::{self, Viewer},
};

use super::password;

#[debug_handler(state = AppState)]
pub(crate) async fn register_page(viewer: Viewer) -> AppResult<Response> {
    show_register(&viewer, &RegisterForm::default()).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let (form, errors) = match form.clean() {
        Ok(form) => {
            let errors = forms::unique_errors(&db_pool, &form.username, &form.email, None).await?;
            (form, errors)
        }
        Err(invalid) => invalid,
    };

    if !errors.is_empty() {
        session::flash(&viewer.session, "An error occurred during registration").await?;
        for error in errors {
            session::flash(&viewer.session, error.to_string()).await?;
        }
        return show_register(&viewer, &form).await;
    }

    let password_hash = password::hash(form.password1.clone()).await?;
    let user = users::create(&db_pool, NewUser {
        name: &form.name,
        username: &form.username,
        email: &form.email,
        password_hash: &password_hash,
    })
    .await?;

    tracing::info!(username = %user.username, "registered");
    session::log_in(&viewer.session, &user).await?;

    Ok(Redirect::to("/").into_response())
}

async fn show_register(viewer: &Viewer, form: &RegisterForm) -> AppResult<Response> {
    let content = render(include_res!(str, "/pages/register.html"), &[
        ("name", &escape(&form.name)),
        ("username", &escape(&form.username)),
        ("email", &escape(&form.email)),
    ]);
    viewer.page("Register", &content).await
}
