mod login;
mod logout;
pub mod password;
mod register;

use axum::{Router, routing::get};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login/", get(login::login_page).post(login::login))
        .route("/logout/", get(logout::logout))
        .route("/register/", get(register::register_page).post(register::register))
}
