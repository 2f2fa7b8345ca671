use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::res;

pub type AppResult<T> = Result<T, AppError>;

/// Anything a handler can fail with that isn't a rendered form error.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(sqlx::Error::RowNotFound) = self.0.downcast_ref::<sqlx::Error>() {
            return res::not_found();
        }

        // broken or oversized upload bodies are the client's fault
        if let Some(err) = self.0.downcast_ref::<MultipartError>() {
            tracing::warn!(error = %err.body_text(), "bad multipart body");
            return (err.status(), err.body_text()).into_response();
        }

        tracing::error!(error = ?self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_are_not_found() {
        let response = AppError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_failures_are_opaque() {
        let response = AppError::from(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
