use axum::{
    extract::{Path, State},
    response::Response,
};
use yatube_core::{service::follows::FollowOutcome, Yatube};

use crate::{
    error::AppError,
    extractors::AuthUser,
    routes::{found, profile_url},
};

/// Follows `username` and goes back to their profile. Following yourself
/// or someone you already follow changes nothing.
pub async fn profile_follow(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let (author, outcome) = yatube.follows.follow(user.id, &username).await?;

    if outcome == FollowOutcome::SelfFollow {
        tracing::debug!(user_id = %user.id, "ignored self-follow");
    }

    Ok(found(&profile_url(&author.username)))
}

pub async fn profile_unfollow(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let (author, _) = yatube.follows.unfollow(user.id, &username).await?;
    Ok(found(&profile_url(&author.username)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use yatube_core::entity::prelude::*;

    use crate::test_utils::{body_json, create_post, redirect_location, test_app};

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let app = test_app().await;
        let (user, cookie) = app.login("FollowName").await;
        let (author, _) = app.login("another").await;

        let first = app.get("/profile/another/follow/", Some(&cookie)).await;
        let again = app.get("/profile/another/follow/", Some(&cookie)).await;

        assert_eq!(redirect_location(&first), "/profile/another/");
        assert_eq!(redirect_location(&again), "/profile/another/");
        assert_eq!(Follow::find().count(&app.yatube.db).await.unwrap(), 1);
        assert!(app.yatube.follows.is_following(user.id, author.id).await.unwrap());

        let profile = body_json(app.get("/profile/another/", Some(&cookie)).await).await;
        assert_eq!(profile["following"], true);

        let response = app.get("/profile/another/unfollow/", Some(&cookie)).await;
        assert_eq!(redirect_location(&response), "/profile/another/");
        assert_eq!(Follow::find().count(&app.yatube.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_self_follow_does_nothing() {
        let app = test_app().await;
        let (_, cookie) = app.login("auth").await;

        let response = app.get("/profile/auth/follow/", Some(&cookie)).await;

        assert_eq!(redirect_location(&response), "/profile/auth/");
        assert_eq!(Follow::find().count(&app.yatube.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follow_guards() {
        let app = test_app().await;
        let (_, cookie) = app.login("auth").await;
        app.login("another").await;

        let anonymous = app.get("/profile/another/follow/", None).await;
        assert_eq!(
            redirect_location(&anonymous),
            "/auth/login/?next=/profile/another/follow/"
        );

        let missing = app.get("/profile/ghost/follow/", Some(&cookie)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(Follow::find().count(&app.yatube.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_post_reaches_followers_only() {
        let app = test_app().await;
        let (author, _) = app.login("auth").await;
        let (_, follower) = app.login("follower").await;
        let (_, stranger) = app.login("stranger").await;
        app.get("/profile/auth/follow/", Some(&follower)).await;

        create_post(&app.yatube, &author, "for followers").await;

        let followed = body_json(app.get("/follow/", Some(&follower)).await).await;
        let not_followed = body_json(app.get("/follow/", Some(&stranger)).await).await;

        assert_eq!(followed["items"][0]["text"], "for followers");
        assert_eq!(not_followed["items"].as_array().unwrap().len(), 0);
    }
}
