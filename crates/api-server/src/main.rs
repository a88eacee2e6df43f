use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http;
use shared::config::{ApiConfig, load_dotenv};
use shared::llm::{GroqGateway, GroqGatewayConfig};
use shared::repos::Store;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "api_server=debug,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url, config.database_max_connections).await {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let llm_config = match GroqGatewayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read groq config: {err}");
            std::process::exit(1);
        }
    };

    let llm = match GroqGateway::new(llm_config) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build groq gateway: {err}");
            std::process::exit(1);
        }
    };

    let app = http::build_router(http::AppState {
        store: Arc::new(store),
        llm: Arc::new(llm),
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
