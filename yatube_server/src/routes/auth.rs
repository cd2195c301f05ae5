use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use yatube_core::config::YatubeConfig;

#[derive(Deserialize)]
pub struct LoginParams {
    pub next: Option<String>,
}

#[derive(Serialize)]
pub struct LoginPage {
    pub login_url: String,
    pub next: Option<String>,
}

/// Where anonymous users land. Signing in itself happens elsewhere; this
/// only reports where they were headed.
pub async fn login(
    State(config): State<YatubeConfig>,
    Query(params): Query<LoginParams>,
) -> Json<LoginPage> {
    Json(LoginPage {
        login_url: config.login_url,
        next: params.next,
    })
}
