//! Request context: who is asking, and which feed page.
//!
//! The `sessionid` cookie is looked up in the [`SessionStore`]. A token that
//! is unknown, or whose user has since been deleted, counts as anonymous.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::{header, request::Parts},
};
use cookie::Cookie;
use yatube_core::{
    config::YatubeConfig, entity::prelude::UserModel, pagination::PageRequest,
    sessions::SESSION_COOKIE, Yatube,
};

use crate::error::AppError;

fn session_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

async fn resolve_user(parts: &Parts, yatube: &Yatube) -> Result<Option<UserModel>, AppError> {
    let Some(token) = session_token(parts) else {
        return Ok(None);
    };
    let Some(user_id) = yatube.sessions.user(&token).await else {
        return Ok(None);
    };

    match yatube.users.get(user_id).await {
        Ok(user) => Ok(Some(user)),
        Err(yatube_core::service::users::UsersServiceError::UserNotFound) => {
            yatube.sessions.close(&token).await;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// `<login_url>?next=<path>`. Slashes in `next` stay readable.
pub fn login_location(config: &YatubeConfig, next: &str) -> String {
    let next = urlencoding::encode(next).replace("%2F", "/");
    format!("{}?next={next}", config.login_url)
}

/// The requesting user, if any.
pub struct MaybeUser(pub Option<UserModel>);

impl<S> FromRequestParts<S> for MaybeUser
where
    Yatube: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let yatube = Yatube::from_ref(state);
        Ok(MaybeUser(resolve_user(parts, &yatube).await?))
    }
}

/// The requesting user; anonymous requests are sent to the login page.
pub struct AuthUser(pub UserModel);

impl<S> FromRequestParts<S> for AuthUser
where
    Yatube: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let yatube = Yatube::from_ref(state);

        match resolve_user(parts, &yatube).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path());

                Err(AppError::LoginRequired {
                    location: login_location(&yatube.config, next),
                })
            }
        }
    }
}

/// `?page=` for the feeds. A repeated parameter takes its last value and
/// a query that doesn't parse at all means the first page.
pub struct PageQuery(pub PageRequest);

impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();

        let page = pairs
            .into_iter()
            .rev()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value);

        Ok(PageQuery(PageRequest { page }))
    }
}
