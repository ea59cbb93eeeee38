use fitness_studio_booking::adapter::driven::{
    InMemoryStore, LogNotifier, MySqlBookingRepository, MySqlClassRepository, SystemClock,
    TracingLogger,
};
use fitness_studio_booking::adapter::driver::rest_api::{create_router, AppStateInner};
use fitness_studio_booking::adapter::{AppConfig, DatabaseConfig, DatabaseMigration, StorageBackend};
use fitness_studio_booking::application::service::{
    BookingApplicationService, BookingQueryService, ClassQueryService,
    ClassScheduleApplicationService,
};
use fitness_studio_booking::application::ConfirmationLinkBuilder;
use fitness_studio_booking::domain::port::{
    BookingNotifier, BookingRepository, ClassCatalogRepository, Clock, Logger,
};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!("=== フィットネススタジオ予約システム REST API ===");

    // ストレージを選択
    let (booking_repository, class_repository): (
        Arc<dyn BookingRepository>,
        Arc<dyn ClassCatalogRepository>,
    ) = match config.storage {
        StorageBackend::MySql => {
            let db_config = DatabaseConfig::from_env()?;
            tracing::info!(
                host = %db_config.host,
                port = db_config.port,
                "データベース設定を読み込みました"
            );

            let pool = MySqlPoolOptions::new()
                .max_connections(db_config.max_connections)
                .connect(&db_config.connection_string())
                .await?;

            DatabaseMigration::new(pool.clone()).run().await?;
            tracing::info!("データベースマイグレーションを実行しました");

            let bookings: Arc<dyn BookingRepository> =
                Arc::new(MySqlBookingRepository::new(pool.clone()));
            let classes: Arc<dyn ClassCatalogRepository> = Arc::new(MySqlClassRepository::new(pool));
            (bookings, classes)
        }
        StorageBackend::Memory => {
            tracing::warn!("インメモリストアで起動します（再起動でデータは消えます）");
            let store = Arc::new(InMemoryStore::with_default_catalog());
            let bookings: Arc<dyn BookingRepository> = store.clone();
            let classes: Arc<dyn ClassCatalogRepository> = store;
            (bookings, classes)
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let notifier: Arc<dyn BookingNotifier> = Arc::new(LogNotifier::new());

    // アプリケーションサービスを作成
    let booking_service = BookingApplicationService::new(
        booking_repository.clone(),
        class_repository.clone(),
        notifier,
        clock.clone(),
        logger.clone(),
        ConfirmationLinkBuilder::new(config.public_base_url.clone()),
    );
    let class_schedule_service = ClassScheduleApplicationService::new(class_repository.clone(), logger);
    let booking_query_service = BookingQueryService::new(
        booking_repository.clone(),
        class_repository.clone(),
        clock.clone(),
    );
    let class_query_service = ClassQueryService::new(class_repository, booking_repository, clock.clone());

    let app_state = AppStateInner {
        booking_service: Arc::new(booking_service),
        class_schedule_service: Arc::new(class_schedule_service),
        booking_query_service: Arc::new(booking_query_service),
        class_query_service: Arc::new(class_query_service),
        clock,
    };

    // REST APIルーターを作成
    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, base_url = %config.public_base_url, "REST APIサーバーが起動しました");

    axum::serve(listener, app).await?;

    Ok(())
}
