//! One bundle of repository handles per database backend, so binaries and
//! tests wire services the same way.

use std::sync::Arc;

use domains::{GroupRepository, TicketRepository, TicketTypeRepository, UserRepository};

use crate::memory::{
    MemoryGroupRepository, MemoryTicketRepository, MemoryTicketTypeRepository, MemoryUserRepository,
};

#[derive(Clone)]
pub struct Repositories {
    pub tickets: Arc<dyn TicketRepository>,
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub types: Arc<dyn TicketTypeRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            tickets: Arc::new(MemoryTicketRepository::new()),
            users: Arc::new(MemoryUserRepository::new()),
            groups: Arc::new(MemoryGroupRepository::new()),
            types: Arc::new(MemoryTicketTypeRepository::new()),
        }
    }

    #[cfg(feature = "db-postgres")]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        use crate::postgres::{
            PgGroupRepository, PgTicketRepository, PgTicketTypeRepository, PgUserRepository,
        };
        Self {
            tickets: Arc::new(PgTicketRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            groups: Arc::new(PgGroupRepository::new(pool.clone())),
            types: Arc::new(PgTicketTypeRepository::new(pool)),
        }
    }
}
