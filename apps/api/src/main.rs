use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::consistency::SlotClaimService;
use notification_cell::services::queue::RedisQueueService;
use notification_cell::services::worker::NotificationWorkerService;
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting school bookings API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create shared state
    let state = Arc::new(config);

    // Background email worker, only when a queue is configured. The HTTP
    // surface never depends on it.
    if state.is_queue_configured() {
        match RedisQueueService::from_config(&state) {
            Ok(queue) => {
                let worker = NotificationWorkerService::new(&state, Arc::new(queue));
                tokio::spawn(async move {
                    if let Err(e) = worker.start().await {
                        error!("Notification worker stopped: {}", e);
                    }
                });
                info!("Notification worker started");
            }
            Err(e) => error!("Failed to start notification worker: {}", e),
        }
    } else {
        info!("REDIS_URL not set, notification queue disabled");
    }

    // Janitor for scheduling locks left behind by crashed bookings
    {
        let config = Arc::clone(&state);
        tokio::spawn(async move {
            let claims = SlotClaimService::new(&config);
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                if let Err(e) = claims.cleanup_expired_locks().await {
                    error!("Scheduling lock cleanup failed: {}", e);
                }
            }
        });
    }

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
