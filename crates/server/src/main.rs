//! Unipoll server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::HeaderValue, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unipoll_api::{middleware::AppState, router as api_router};
use unipoll_common::Config;
use unipoll_core::{
    AuthService, CommentService, IdpClient, ReportService, SurveyService, TokenService,
    UserService,
};
use unipoll_db::repositories::{
    CommentRepository, NotificationRepository, ReportRepository, ResponseRepository,
    SurveyRepository, TokenRepository, UserRepository,
};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unipoll=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting unipoll server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = unipoll_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    unipoll_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let survey_repo = SurveyRepository::new(Arc::clone(&db));
    let response_repo = ResponseRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let token_repo = TokenRepository::new(Arc::clone(&db));

    // Initialize services
    let token_service = TokenService::new(token_repo, config.auth.clone());
    let idp_client = IdpClient::new(&config.idp);
    let auth_service = AuthService::new(idp_client, user_repo.clone(), token_service);
    let user_service = UserService::new(
        user_repo.clone(),
        survey_repo.clone(),
        response_repo.clone(),
        comment_repo.clone(),
        notification_repo.clone(),
    );
    let survey_service = SurveyService::new(
        survey_repo.clone(),
        response_repo.clone(),
        user_repo.clone(),
    );
    let comment_service = CommentService::new(
        comment_repo.clone(),
        survey_repo.clone(),
        user_repo,
        notification_repo.clone(),
    );
    let report_service =
        ReportService::new(report_repo, survey_repo, comment_repo, notification_repo);

    // Create app state
    let state = AppState {
        auth_service,
        user_service,
        survey_service,
        comment_service,
        report_service,
    };

    // CORS: restrict to the configured origin when one is set
    let cors = match config.server.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    // Build router
    let app = Router::new()
        .merge(api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            unipoll_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
