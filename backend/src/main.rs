//! Main entry point for the Acexis backend.
//!
//! This file loads configuration, connects the stores and the mailer, builds
//! the GraphQL schema and serves it with Axum until a shutdown signal arrives.

use std::{net::SocketAddr, sync::Arc};

use adapters::{MemcachedCache, SmtpMailer, SmtpSettings};
use anyhow::Context;
use tokio::{net::TcpListener, signal::ctrl_c};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backend::{
    api::{self, SchemaDeps},
    auth::AuthService,
    config::Config,
    database,
    middleware::PersistedQueryStore,
    services::{
        gateway::{Gateway, GatewayOptions},
        pubsub::Broker,
        validation::{default_registry, ValidationPipe},
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(environment = config.environment.as_str(), "Configuration loaded");

    let database = database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    let mailer = SmtpMailer::new(SmtpSettings::gmail(
        config.mail.user.clone(),
        config.mail.pass.clone(),
        config.mail.template_path.clone(),
    ));
    let auth = Arc::new(AuthService::new(
        config.secret_key.clone(),
        database.users.clone(),
        Arc::new(mailer),
    ));

    let options = GatewayOptions::from_config(&config);
    let persisted_queries: Arc<dyn PersistedQueryStore> =
        Arc::new(MemcachedCache::new(options.persisted_queries.clone()));

    let schema = api::build_schema(
        SchemaDeps {
            database,
            auth: auth.clone(),
            pipe: ValidationPipe::new(default_registry()),
            persisted_queries: Some(persisted_queries),
        },
        &options,
    );

    let path = options.path.clone();
    let gateway = Arc::new(Gateway::new(options, auth, Broker::default()));
    let app = api::routes::router(AppState { schema, gateway })
        .context("invalid CORS origin")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("🚀 Server ready at http://{}:{}{}", config.domain, config.port, path);
    info!("🚀 Subscriptions ready at ws://{}:{}{}", config.domain, config.port, path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
