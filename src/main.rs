use std::panic;
use std::sync::Arc;

use note_collab::{
    clients::AppServiceClient,
    config::Config,
    create_app,
    db::{dbnotes::DbNotes, memory::MemoryNotes, DocumentStore, PermissionOracle},
    ws::broker::Broker,
    AppState,
};
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "note_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.auth_jwt_secret.is_none() {
        warn!("No JWT secret configured - every WebSocket connection will be refused");
    }

    // Document store: Postgres when configured, process memory otherwise
    let mut db_notes: Option<Arc<DbNotes>> = None;
    if let Some(db_url) = &config.db_url {
        match DbNotes::new(db_url).await {
            Ok(db) => {
                info!("Database initialized successfully");
                db_notes = Some(Arc::new(db));
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
            }
        }
    }

    let (store, local_oracle): (Arc<dyn DocumentStore>, Arc<dyn PermissionOracle>) = match db_notes {
        Some(db) => (db.clone() as Arc<dyn DocumentStore>, db as Arc<dyn PermissionOracle>),
        None => {
            warn!("No database available - notes are kept in memory and lost on restart");
            let memory = Arc::new(MemoryNotes::new());
            (memory.clone() as Arc<dyn DocumentStore>, memory as Arc<dyn PermissionOracle>)
        }
    };

    // Permission oracle: the notes application's API when configured, the store otherwise
    let oracle: Arc<dyn PermissionOracle> = match (&config.permission_service_url, &config.auth_jwt_secret) {
        (Some(url), Some(secret)) => {
            match AppServiceClient::new(url.clone(), secret.clone(), config.service_name.clone(), config.upstream_timeout()) {
                Ok(client) => {
                    info!("Checking permissions against {}", url);
                    Arc::new(client)
                }
                Err(e) => {
                    error!("Failed to build permission client: {}", e);
                    local_oracle
                }
            }
        }
        _ => local_oracle,
    };

    let broker = Arc::new(Broker::new(oracle, store, config.upstream_timeout()));
    let address = config.server_address();
    let state = AppState::new(config, broker);
    let app_routes = create_app(state);

    // Start the HTTP/WebSocket server
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
