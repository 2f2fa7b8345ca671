mod page;
mod update;

use axum::{Router, routing::get};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{id}/", get(page::profile))
        .route("/update-user/", get(update::update_user_page).post(update::update_user))
}
