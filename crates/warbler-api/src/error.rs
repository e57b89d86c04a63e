use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::views;

pub const LOGIN_PATH: &str = "/login";

pub type AppResult<T> = Result<T, AppError>;

/// Terminal failures of a request. None of them leave partial writes behind.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("login required")]
    AuthenticationRequired,

    #[error("Access unauthorized.")]
    Forbidden,

    #[error("Not found.")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("CSRF token missing or invalid.")]
    CsrfMismatch,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// `302 Found` to `location`. axum's `Redirect` only offers 303/307/308.
pub fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthenticationRequired => StatusCode::FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::CsrfMismatch => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::AuthenticationRequired => found(LOGIN_PATH),
            AppError::Internal(e) => {
                error!("internal error: {:#}", e);
                (status, Html(views::error_page(status, "Something went wrong."))).into_response()
            }
            other => (status, Html(views::error_page(status, &other.to_string()))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_required_redirects_to_login() {
        let resp = AppError::AuthenticationRequired.into_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], LOGIN_PATH);
    }

    #[test]
    fn statuses() {
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::CsrfMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
