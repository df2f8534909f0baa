//! # Helpdesk Binary
//!
//! Assembles the ticketing API from the adapters enabled at compile time
//! and the backend chosen in configuration.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use api_adapters::{build_router, AppState};
use auth_adapters::{AccessTokenAuthenticator, Argon2Credentials};
use configs::{DatabaseBackend, DatabaseSettings, LogFormat, LogSettings, Settings};
use domains::TicketEvent;
use services::{AccountService, TicketService};
use storage_adapters::media_local::LocalAttachmentStorage;
use storage_adapters::{BroadcastEventBus, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    // 1. Persistence
    let repos = open_repositories(&settings.database).await?;

    // 2. Attachments and events
    let attachments = Arc::new(LocalAttachmentStorage::new(settings.media.root.clone()));
    let bus = BroadcastEventBus::default();
    spawn_event_log(bus.subscribe());

    // 3. Credentials
    let hasher = Arc::new(Argon2Credentials::new());
    let auth = Arc::new(AccessTokenAuthenticator::new(repos.users.clone(), hasher.clone()));

    let tickets = TicketService::new(
        repos.tickets.clone(),
        repos.users.clone(),
        repos.groups.clone(),
        repos.types.clone(),
        attachments,
        Arc::new(bus),
    );
    let accounts = AccountService::new(repos.users.clone(), repos.groups.clone(), hasher);
    let app = build_router(AppState::new(tickets, accounts, auth));

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, backend = ?settings.database.backend, "helpdesk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;
    info!("helpdesk stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn open_repositories(db: &DatabaseSettings) -> anyhow::Result<Repositories> {
    match db.backend {
        DatabaseBackend::Memory => {
            warn!("using the in-memory backend, data is lost on exit");
            Ok(Repositories::in_memory())
        }
        #[cfg(feature = "db-postgres")]
        DatabaseBackend::Postgres => {
            use secrecy::ExposeSecret;
            use storage_adapters::postgres;

            let url = db
                .url
                .as_ref()
                .context("database.url is required for the postgres backend")?;
            let pool = postgres::connect(url.expose_secret(), db.max_connections)
                .await
                .context("connecting to postgres")?;
            postgres::run_migrations(&pool)
                .await
                .context("applying schema")?;
            Ok(Repositories::postgres(pool))
        }
        #[cfg(not(feature = "db-postgres"))]
        DatabaseBackend::Postgres => {
            anyhow::bail!("this build has no postgres support, rebuild with the db-postgres feature")
        }
    }
}

/// Writes every ticket event to the log until the bus closes.
fn spawn_event_log(mut events: broadcast::Receiver<TicketEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(event = event.name(), ticket_uid = event.ticket_uid(), "ticket event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
