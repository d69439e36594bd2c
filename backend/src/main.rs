use std::{sync::Arc, time::Duration};

use anyhow::Result;
use backend::{axum_http::http_serve, config::config_loader};
use crates::infra::db::postgres::postgres_connection::{self, PoolSettings};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Subscription service exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let pool_settings = PoolSettings {
        max_connections: dotenvy_env.database.max_connections,
        statement_timeout: Duration::from_secs(dotenvy_env.database.statement_timeout),
    };
    let postgres_pool =
        postgres_connection::establish_connection(&dotenvy_env.database.url, &pool_settings)?;
    info!(
        max_connections = pool_settings.max_connections,
        "Postgres connection has been established"
    );

    http_serve::start(Arc::new(dotenvy_env), Arc::new(postgres_pool)).await?;

    Ok(())
}
