//! Serve command - runs the caching daemon and its lookup API.

use std::{sync::Arc, time::Duration};

use accountd::{AccountStore, HttpDirectoryClient};
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::cli::ServeArgs;

/// Upper bound on a single HTTP request to the directory. The store's own
/// fetch timeout usually fires first.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Run the accountd daemon
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("accountd=info".parse().unwrap()),
        )
        .init();

    let client = HttpDirectoryClient::new(&args.directory_url, REQUEST_TIMEOUT)?;
    tracing::info!("Using directory at {}", client.base_url());

    let config = args.store_config();
    tracing::debug!(?config, "Starting account store");
    let store = Arc::new(AccountStore::start(Arc::new(client), config).await);

    let status = store.status();
    if status.ready {
        tracing::info!(
            "Account cache ready: {} users, {} groups",
            status.users,
            status.groups
        );
    } else {
        tracing::warn!("Initial account fetch failed; serving an empty cache until a refresh succeeds");
    }

    let app = api::router(store.clone());

    // Bind server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    println!("accountd listening on http://{local_addr}");
    println!();
    println!("Available endpoints:");
    println!("  GET /users                   - All cached users");
    println!("  GET /users/name/{{name}}       - User by name");
    println!("  GET /users/uid/{{uid}}         - User by UID");
    println!("  GET /users/name/{{name}}/keys  - Authorized keys of a user");
    println!("  GET /groups                  - All cached groups");
    println!("  GET /groups/name/{{name}}      - Group by name");
    println!("  GET /groups/gid/{{gid}}        - Group by GID");
    println!("  GET /names                   - Every user and group name");
    println!("  GET /names/{{name}}            - Whether a name is known");
    println!("  GET /health                  - Cache status");
    println!();
    println!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to set up SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to set up SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
                _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
            }
        })
        .await?;

    store.shutdown();
    println!("Server shut down");
    Ok(())
}
