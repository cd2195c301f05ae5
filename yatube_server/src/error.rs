use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use yatube_core::{
    entity::prelude::DbErr,
    service::{
        comments::CommentsServiceError, feed::FeedServiceError, follows::FollowsServiceError,
        groups::GroupsServiceError, posts::PostsServiceError, users::UsersServiceError,
    },
};

use crate::routes::found;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Failed to store upload: {0}")]
    Media(#[from] std::io::Error),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Resource not found")]
    NotFound,

    /// Input a service refused, with its message.
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Anonymous request to a protected route. Carries the full login
    /// location, `next` included.
    #[error("Login required")]
    LoginRequired { location: String },

    /// Authenticated but not allowed; the requester is sent elsewhere
    /// instead of seeing an error page.
    #[error("Forbidden")]
    Forbidden { redirect_to: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::LoginRequired { location } => return found(location),
            AppError::Forbidden { redirect_to } => return found(redirect_to),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::Invalid(message) => (StatusCode::BAD_REQUEST, message.as_str()),
            AppError::Multipart(e) => {
                tracing::warn!(error = %e, "rejected multipart body");
                let status = e.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    (status, "Upload too large")
                } else {
                    (StatusCode::BAD_REQUEST, "Malformed form submission")
                }
            }
            AppError::Database(e) => {
                tracing::error!(error = ?e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
            AppError::Media(e) => {
                tracing::error!(error = ?e, "media storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<UsersServiceError> for AppError {
    fn from(error: UsersServiceError) -> Self {
        match error {
            UsersServiceError::DbError(e) => AppError::Database(e),
            UsersServiceError::UserNotFound => AppError::NotFound,
            UsersServiceError::UsernameTaken | UsersServiceError::InvalidUsername => {
                AppError::Invalid(error.to_string())
            }
        }
    }
}

impl From<GroupsServiceError> for AppError {
    fn from(error: GroupsServiceError) -> Self {
        match error {
            GroupsServiceError::DbError(e) => AppError::Database(e),
            GroupsServiceError::GroupNotFound => AppError::NotFound,
            GroupsServiceError::SlugTaken
            | GroupsServiceError::InvalidSlug
            | GroupsServiceError::InvalidTitle => AppError::Invalid(error.to_string()),
        }
    }
}

impl From<FeedServiceError> for AppError {
    fn from(error: FeedServiceError) -> Self {
        match error {
            FeedServiceError::DbError(e) => AppError::Database(e),
            FeedServiceError::GroupNotFound
            | FeedServiceError::UserNotFound
            | FeedServiceError::PostNotFound => AppError::NotFound,
        }
    }
}

impl From<CommentsServiceError> for AppError {
    fn from(error: CommentsServiceError) -> Self {
        match error {
            CommentsServiceError::DbError(e) => AppError::Database(e),
            CommentsServiceError::PostNotFound => AppError::NotFound,
        }
    }
}

impl From<FollowsServiceError> for AppError {
    fn from(error: FollowsServiceError) -> Self {
        match error {
            FollowsServiceError::DbError(e) => AppError::Database(e),
            FollowsServiceError::UserNotFound => AppError::NotFound,
        }
    }
}

impl From<PostsServiceError> for AppError {
    fn from(error: PostsServiceError) -> Self {
        match error {
            PostsServiceError::DbError(e) => AppError::Database(e),
            PostsServiceError::Media(e) => AppError::Media(e),
            PostsServiceError::PostNotFound => AppError::NotFound,
            // Handlers check authorship first and redirect to the post;
            // reaching this means the check was skipped.
            PostsServiceError::Unauthorized => AppError::Forbidden {
                redirect_to: "/".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_not_404() {
        let taken = AppError::from(UsersServiceError::UsernameTaken);
        let slug = AppError::from(GroupsServiceError::InvalidSlug);
        let missing = AppError::from(GroupsServiceError::GroupNotFound);

        assert!(matches!(&taken, AppError::Invalid(m) if m == "username already taken"));
        assert_eq!(taken.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(slug.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
