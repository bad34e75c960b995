use bookstore_checkout::adapter::driven::{
    MySqlBookRepository, MySqlCartRepository, MySqlOrderRepository, MySqlUnitOfWork,
    MySqlUserRepository,
};
use bookstore_checkout::adapter::driver::{create_router, AppState};
use bookstore_checkout::adapter::{DatabaseConfig, DatabaseMigration, ServerConfig};
use bookstore_checkout::application::service::{CartApplicationService, OrderApplicationService};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// SIGINT または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("received SIGTERM, starting graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DatabaseConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, database = %config.database, "database configuration loaded");

    // 接続プールを作成
    // 各コネクションで行ロック待ちの上限を設定する
    let lock_wait_timeout_secs = config.lock_wait_timeout_secs;
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let sql = format!(
                    "SET SESSION innodb_lock_wait_timeout = {}",
                    lock_wait_timeout_secs
                );
                sqlx::query(&sql).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&config.connection_string())
        .await?;
    tracing::info!("database pool created");

    DatabaseMigration::new(pool.clone()).run().await?;

    let user_repository = Arc::new(MySqlUserRepository::new(pool.clone()));
    let book_repository = Arc::new(MySqlBookRepository::new(pool.clone()));
    let cart_repository = Arc::new(MySqlCartRepository::new(pool.clone()));
    let order_repository = Arc::new(MySqlOrderRepository::new(pool.clone()));
    let unit_of_work = Arc::new(MySqlUnitOfWork::new(pool.clone()));

    let cart_service = CartApplicationService::new(
        user_repository.clone(),
        book_repository,
        cart_repository,
        unit_of_work.clone(),
    );
    let order_service = OrderApplicationService::new(user_repository, order_repository, unit_of_work);

    let app_state = AppState {
        cart_service: Arc::new(cart_service),
        order_service: Arc::new(order_service),
    };

    let app = create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    let addr = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "starting checkout API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}
