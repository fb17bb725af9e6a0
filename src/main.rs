use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use shuttle_runtime::{SecretStore, Secrets};

use cinema_booking::{build_router, config::AppConfig, store::MongoStore};

#[shuttle_runtime::main]
async fn main(#[Secrets] secret_store: SecretStore) -> shuttle_axum::ShuttleAxum {
    let config = AppConfig::from_secrets(&secret_store)?;

    let store = MongoStore::connect(&config.mongodb_uri, &config.database)
        .await
        .context("failed to connect to MongoDB")?;

    let origin = config
        .app_url
        .parse::<HeaderValue>()
        .with_context(|| format!("APP_URL `{}` is not a valid origin", config.app_url))?;

    tracing::info!(database = %config.database, origin = %config.app_url, "starting cinema booking API");

    let app = build_router(Arc::new(store), Some(origin));
    Ok(app.into())
}
