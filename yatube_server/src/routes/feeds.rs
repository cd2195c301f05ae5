use axum::{
    extract::{Path, RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use yatube_core::{
    cache::{CachedPage, PageCache},
    pagination::Page,
    service::feed::{GroupFeed, PostDetail, PostView, ProfileFeed},
    Yatube,
};

use crate::{
    error::AppError,
    extractors::{AuthUser, MaybeUser, PageQuery},
    routes::parse_post_id,
};

const JSON_CONTENT_TYPE: &str = "application/json";

fn cached_response(page: CachedPage) -> Response {
    ([(header::CONTENT_TYPE, page.content_type)], page.body).into_response()
}

/// Global feed. The whole body is cached per query string for the cache TTL,
/// so new posts can take that long to show up here.
pub async fn index(
    State(yatube): State<Yatube>,
    State(cache): State<PageCache>,
    RawQuery(query): RawQuery,
    PageQuery(request): PageQuery,
) -> Result<Response, AppError> {
    let key = PageCache::key("/", query.as_deref());

    if let Some(page) = cache.get(&key).await {
        return Ok(cached_response(page));
    }

    let page = yatube.feed.index(&request).await?;
    let body = match serde_json::to_vec(&page) {
        Ok(body) => Bytes::from(body),
        // Not cacheable as bytes; serve it uncached.
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize index page");
            return Ok(Json(page).into_response());
        }
    };

    let cached = CachedPage {
        content_type: JSON_CONTENT_TYPE.to_string(),
        body,
    };
    cache.set(key, cached.clone()).await;

    Ok(cached_response(cached))
}

pub async fn group_posts(
    State(yatube): State<Yatube>,
    Path(slug): Path<String>,
    PageQuery(request): PageQuery,
) -> Result<Json<GroupFeed>, AppError> {
    Ok(Json(yatube.feed.group(&slug, &request).await?))
}

pub async fn profile(
    State(yatube): State<Yatube>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    PageQuery(request): PageQuery,
) -> Result<Json<ProfileFeed>, AppError> {
    let viewer = viewer.map(|user| user.id);
    Ok(Json(yatube.feed.profile(&username, viewer, &request).await?))
}

pub async fn post_detail(
    State(yatube): State<Yatube>,
    Path(post_id): Path<String>,
) -> Result<Json<PostDetail>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    Ok(Json(yatube.feed.detail(post_id).await?))
}

/// Posts by the authors the requester follows.
pub async fn follow_index(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    PageQuery(request): PageQuery,
) -> Result<Json<Page<PostView>>, AppError> {
    Ok(Json(yatube.feed.follow(user.id, &request).await?))
}
