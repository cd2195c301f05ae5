pub mod auth;
pub mod feeds;
pub mod follow;
pub mod posts;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use yatube_core::ids::PostId;

use crate::{error::AppError, AppState};

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.yatube.config.max_upload_bytes;

    Router::new()
        .merge(feed_routes())
        .merge(post_routes(upload_limit))
        .merge(follow_routes())
        .nest("/auth", auth_routes())
        .fallback(not_found)
        .with_state(state)
}

pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(feeds::index))
        .route("/group/{slug}/", get(feeds::group_posts))
        .route("/profile/{username}/", get(feeds::profile))
        .route("/posts/{post_id}/", get(feeds::post_detail))
        .route("/follow/", get(feeds::follow_index))
}

/// Post forms carry images, so they get `upload_limit` instead of axum's
/// 2 MiB default.
pub fn post_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/create/", get(posts::create_form).post(posts::create_post))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form).post(posts::edit_post),
        )
        .route(
            "/posts/{post_id}/comment/",
            get(posts::comment_redirect).post(posts::add_comment),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
}

pub fn follow_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile/{username}/follow/",
            get(follow::profile_follow).post(follow::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follow::profile_unfollow).post(follow::profile_unfollow),
        )
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login/", get(auth::login))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Ids that do not parse can't name a post.
pub(crate) fn parse_post_id(raw: &str) -> Result<PostId, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub(crate) fn post_url(post_id: PostId) -> String {
    format!("/posts/{post_id}/")
}
