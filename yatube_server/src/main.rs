use anyhow::Context;
use yatube_core::{config, Yatube};
use yatube_server::{app, setup_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let settings = config::get_or_init()
        .await
        .context("failed to load config")?;
    let bind_addr = settings.bind_addr.clone();

    let yatube = Yatube::start(settings)
        .await
        .context("failed to start yatube core")?;
    let app = app(AppState::new(yatube));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
