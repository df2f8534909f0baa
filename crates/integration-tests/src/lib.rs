//! Shared fixture for the cross-crate tests: every service wired over the
//! in-memory adapters, with a small directory already in place.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use auth_adapters::{AccessTokenAuthenticator, Argon2Credentials};
use domains::{
    CredentialHasher, Group, GroupRepository, NewTicket, Role, TicketType, User, UserRepository,
};
use services::{AccountService, TicketService, TicketView};
use storage_adapters::media_local::LocalAttachmentStorage;
use storage_adapters::{BroadcastEventBus, Repositories};

pub struct TestApp {
    pub repos: Repositories,
    pub bus: BroadcastEventBus,
    pub tickets: TicketService,
    pub accounts: AccountService,
    pub auth: Arc<AccessTokenAuthenticator>,
    pub media_root: PathBuf,
    /// Admin, member of `support`.
    pub admin: User,
    /// Support agent, member of `support`.
    pub agent: User,
    /// Plain user, member of `support` only.
    pub customer: User,
    /// Plain user outside every group.
    pub outsider: User,
    pub support: Group,
    pub issue_type: TicketType,
}

impl TestApp {
    pub async fn new() -> Self {
        let repos = Repositories::in_memory();
        let bus = BroadcastEventBus::default();
        let hasher = Arc::new(Argon2Credentials::new());
        let media_root = std::env::temp_dir().join(format!("helpdesk-it-{}", Uuid::new_v4()));

        let tickets = TicketService::new(
            repos.tickets.clone(),
            repos.users.clone(),
            repos.groups.clone(),
            repos.types.clone(),
            Arc::new(LocalAttachmentStorage::new(media_root.clone())),
            Arc::new(bus.clone()),
        );
        let accounts = AccountService::new(repos.users.clone(), repos.groups.clone(), hasher.clone());
        let auth = Arc::new(AccessTokenAuthenticator::new(repos.users.clone(), hasher.clone()));

        let admin = insert_user(&repos, hasher.as_ref(), "admin", Role::Admin).await;
        let agent = insert_user(&repos, hasher.as_ref(), "agent", Role::Support).await;
        let customer = insert_user(&repos, hasher.as_ref(), "customer", Role::User).await;
        let outsider = insert_user(&repos, hasher.as_ref(), "outsider", Role::User).await;

        let support = Group {
            id: Uuid::new_v4(),
            name: "Support".into(),
            members: vec![admin.id, agent.id, customer.id],
            created_at: Utc::now(),
        };
        repos.groups.insert(&support).await.expect("insert group");
        let issue_type = tickets.create_type("Issue").await.expect("create type");

        Self {
            repos,
            bus,
            tickets,
            accounts,
            auth,
            media_root,
            admin,
            agent,
            customer,
            outsider,
            support,
            issue_type,
        }
    }

    /// Fixture users carry the access token `"<username>-token"`.
    pub fn token_for(user: &User) -> String {
        format!("{}-token", user.username)
    }

    pub async fn open_ticket(&self, by: &User, subject: &str) -> TicketView {
        self.tickets
            .create(
                by,
                NewTicket {
                    subject: subject.into(),
                    issue: format!("Details about {subject}"),
                    ..NewTicket::default()
                },
            )
            .await
            .expect("create ticket")
    }

    #[cfg(feature = "web-axum")]
    pub fn router(&self) -> axum::Router {
        api_adapters::build_router(api_adapters::AppState::new(
            self.tickets.clone(),
            self.accounts.clone(),
            self.auth.clone(),
        ))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

async fn insert_user(repos: &Repositories, hasher: &dyn CredentialHasher, name: &str, role: Role) -> User {
    let mut user = User {
        id: Uuid::new_v4(),
        username: name.into(),
        fullname: format!("{}{}", name[..1].to_uppercase(), &name[1..]),
        email: format!("{name}@example.com"),
        role,
        password_hash: String::new(),
        access_token_digest: None,
        created_at: Utc::now(),
    };
    let token = TestApp::token_for(&user);
    user.access_token_digest = Some(hasher.digest_token(&token));
    repos.users.insert(&user).await.expect("insert user");
    user
}
