use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use yatube_core::{
    config::YatubeConfig,
    entity::prelude::{PostModel, UserModel},
    forms::CleanedPostForm,
    ids::PostId,
    models,
    sessions::SESSION_COOKIE,
    Yatube,
};

use crate::{app, AppState};

/// 2x1 transparent GIF.
pub const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

const BOUNDARY: &str = "yatube-test-boundary";

pub struct TestApp {
    pub yatube: Yatube,
    router: Router,
}

/// A full router over a fresh in-memory database and a scratch media root.
pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

/// Like [`test_app`], with the config adjusted before the router is built.
pub async fn test_app_with(configure: impl FnOnce(&mut YatubeConfig)) -> TestApp {
    let db = models::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    models::migrate_up(&db)
        .await
        .expect("Failed to run migrations");

    let data_dir = std::env::temp_dir().join(format!("yatube-server-{}", PostId::new()));
    let mut config = YatubeConfig::new(data_dir);
    configure(&mut config);
    let yatube = Yatube::with_db(config, db);
    let router = app(AppState::new(yatube.clone()));

    TestApp { yatube, router }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestApp {
    /// Creates a user and a session for them; returns the cookie to send.
    pub async fn login(&self, username: &str) -> (UserModel, String) {
        let user = self
            .yatube
            .users
            .create_user(username)
            .await
            .expect("Failed to create user");
        let token = self.yatube.sessions.open(user.id).await;
        (user, format!("{SESSION_COOKIE}={token}"))
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    fn request(method: Method, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let request = Self::request(Method::GET, uri, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        parts: &[Part<'_>],
    ) -> Response<Body> {
        let request = Self::request(Method::POST, uri, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
        let request = Self::request(Method::POST, uri, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

/// Asserts a `302 Found` and returns its `Location`.
pub fn redirect_location(response: &Response<Body>) -> String {
    assert_eq!(response.status(), StatusCode::FOUND);
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn create_post(yatube: &Yatube, author: &UserModel, text: &str) -> PostModel {
    yatube
        .posts
        .create_post(
            author.id,
            CleanedPostForm {
                text: text.to_string(),
                group: None,
                image: None,
            },
        )
        .await
        .expect("Failed to create post")
}
