//! Signoff Control Plane Server
//!
//! An async Rust server that runs the approval workflow engine: versioned
//! workflow definitions, approval instances, decision recording,
//! resubmission chains and the audit trail.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signoff_control_plane::{
    config::{AppConfig, DatabaseConfig},
    db::{create_pool, schema},
    handlers,
    services::{
        ApprovalService, AuditService, DelegationService, ResubmissionService, WorkflowService,
    },
    state::AppState,
    ResultExt,
};

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,signoff_control_plane=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router with all routes.
fn build_router(
    state: AppState,
    workflow_service: WorkflowService,
    approval_service: ApprovalService,
    resubmission_service: ResubmissionService,
    audit_service: AuditService,
    delegation_service: DelegationService,
) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Health and database routes
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .route("/api/db/validate", get(handlers::database::validate))
        .with_state(state);

    // Workflow definition routes
    let workflow_routes = Router::new()
        .route("/api/workflows", post(handlers::workflow::create))
        .route("/api/workflows", get(handlers::workflow::list))
        .route("/api/workflows/{workflow_id}", get(handlers::workflow::get))
        .with_state(workflow_service);

    // Approval instance routes
    let approval_routes = Router::new()
        .route("/api/requests", post(handlers::approval::submit_request))
        .route("/api/instances", post(handlers::approval::create_instance))
        .route(
            "/api/instances/{instance_id}",
            get(handlers::approval::get_instance),
        )
        .route(
            "/api/instances/{instance_id}/actions",
            post(handlers::approval::record_action),
        )
        .with_state(approval_service);

    // Resubmission routes
    let resubmission_routes = Router::new()
        .route(
            "/api/instances/{instance_id}/resubmit",
            post(handlers::approval::resubmit),
        )
        .with_state(resubmission_service);

    // Audit and notification routes
    let audit_routes = Router::new()
        .route(
            "/api/instances/{instance_id}/audit",
            get(handlers::audit::list_for_instance),
        )
        .route(
            "/api/instances/{instance_id}/notifications",
            get(handlers::audit::list_notifications),
        )
        .with_state(audit_service);

    // Delegation routes
    let delegation_routes = Router::new()
        .route("/api/delegations", post(handlers::delegation::create))
        .with_state(delegation_service);

    Router::new()
        .merge(health_routes)
        .merge(workflow_routes)
        .merge(approval_routes)
        .merge(resubmission_routes)
        .merge(audit_routes)
        .merge(delegation_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Signoff Control Plane"
    );

    // Load configuration
    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load database config, using defaults");
        DatabaseConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        database = %db_config.database,
        "Configuration loaded"
    );

    // Connect to database
    let db_pool = create_pool(&db_config)
        .await
        .log("Failed to connect to Postgres")?;
    tracing::info!("Database connection established");

    if app_config.auto_init_schema {
        schema::init_schema(&db_pool)
            .await
            .log("Failed to initialize database schema")?;
        tracing::info!("Database schema initialized");
    }

    // Build services
    let workflow_service = WorkflowService::new(db_pool.clone());
    let approval_service = ApprovalService::new(db_pool.clone());
    let resubmission_service =
        ResubmissionService::new(db_pool.clone(), approval_service.clone());
    let audit_service = AuditService::new(db_pool.clone());
    let delegation_service = DelegationService::new(db_pool.clone());

    let state = AppState::new(db_pool, app_config.clone());

    let app = build_router(
        state,
        workflow_service,
        approval_service,
        resubmission_service,
        audit_service,
        delegation_service,
    );

    let addr: SocketAddr = app_config.bind_address().parse()?;
    tracing::info!(%addr, "Listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
