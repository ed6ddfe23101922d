use std::net::SocketAddr;
use std::sync::Arc;

use atithi_api::{app, state::{AppState, AuthSettings}};
use atithi_core::document::UploadOptions;
use atithi_registration::SessionRegistry;
use atithi_store::{CloudinaryClient, FirestoreClient, MemoryScratchStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atithi_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = atithi_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Atithi API on port {}", config.server.port);

    // Hosted collaborators: configured once, reused read-only
    let documents = Arc::new(CloudinaryClient::new(&config.media));
    let guests = Arc::new(FirestoreClient::new(&config.records));
    let scratch = Arc::new(MemoryScratchStore::new());

    let registry = SessionRegistry::new(
        documents,
        guests.clone(),
        scratch,
        config.uploads.clone(),
        UploadOptions {
            folder: config.media.folder.clone(),
            resource_type_hint: "auto".to_string(),
        },
    );

    let app_state = AppState {
        registry: Arc::new(registry),
        guests,
        auth: AuthSettings {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            admin_email: config.auth.admin_email.clone(),
            admin_password: config.auth.admin_password.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
