//! Seeds a fresh Postgres database with an administrator, a support group
//! and the default ticket types. Safe to run more than once.
//!
//! ```text
//! seed <admin-username> <admin-password>
//! ```
//!
//! Both arguments fall back to `SEED_ADMIN_USERNAME` / `SEED_ADMIN_PASSWORD`.

use std::sync::Arc;

use anyhow::{bail, Context};
use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth_adapters::Argon2Credentials;
use configs::{DatabaseBackend, Settings};
use domains::{DomainError, NewUser, Role};
use services::{AccountService, TicketService};
use storage_adapters::media_local::LocalAttachmentStorage;
use storage_adapters::{postgres, BroadcastEventBus, Repositories};

const DEFAULT_GROUP: &str = "Support";
const DEFAULT_TYPES: [&str; 2] = ["Issue", "Task"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let username = args
        .next()
        .or_else(|| std::env::var("SEED_ADMIN_USERNAME").ok())
        .unwrap_or_else(|| "admin".to_string());
    let password = args
        .next()
        .or_else(|| std::env::var("SEED_ADMIN_PASSWORD").ok())
        .context("admin password missing: pass it as the second argument or set SEED_ADMIN_PASSWORD")?;

    let settings = Settings::load().context("loading settings")?;
    if settings.database.backend != DatabaseBackend::Postgres {
        bail!("seeding needs HELPDESK__DATABASE__BACKEND=postgres, the memory backend does not persist");
    }
    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url is required for the postgres backend")?;
    let pool = postgres::connect(url.expose_secret(), settings.database.max_connections).await?;
    postgres::run_migrations(&pool).await?;
    let repos = Repositories::postgres(pool);

    let hasher = Arc::new(Argon2Credentials::new());
    let accounts = AccountService::new(repos.users.clone(), repos.groups.clone(), hasher);
    let tickets = TicketService::new(
        repos.tickets.clone(),
        repos.users.clone(),
        repos.groups.clone(),
        repos.types.clone(),
        Arc::new(LocalAttachmentStorage::new(settings.media.root.clone())),
        Arc::new(BroadcastEventBus::default()),
    );

    // 1. Administrator
    let admin = match accounts
        .register(NewUser {
            username: username.clone(),
            fullname: "Administrator".into(),
            email: format!("{username}@localhost"),
            role: Role::Admin,
            password,
        })
        .await
    {
        Ok(user) => {
            info!(username = %user.username, "admin created");
            user
        }
        Err(DomainError::Conflict(_)) => {
            info!(username = %username, "admin already present");
            repos
                .users
                .find_by_username(&username.trim().to_lowercase())
                .await?
                .context("admin vanished while seeding")?
        }
        Err(err) => return Err(err.into()),
    };

    // 2. A group the admin can see tickets in
    if repos.groups.list_for_member(admin.id).await?.is_empty() {
        let group = accounts.create_group(DEFAULT_GROUP, vec![admin.id]).await?;
        info!(group = %group.name, "group created");
    }

    // 3. Ticket types
    for name in DEFAULT_TYPES {
        match tickets.create_type(name).await {
            Ok(ticket_type) => info!(name = %ticket_type.name, "ticket type created"),
            Err(DomainError::Conflict(_)) => info!(name, "ticket type already present"),
            Err(err) => return Err(err.into()),
        }
    }

    println!("Seeded admin '{}' ({})", admin.username, admin.id);
    Ok(())
}
