//! Database service layer
//!
//! Bundles one handle per repository so services depend on the traits, not on
//! a concrete backend.

use std::sync::Arc;

use crate::database::connection::{self, DatabasePool};
use crate::database::memory::InMemoryDatabase;
use crate::database::repositories::*;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct DatabaseService {
    pub events: Arc<dyn EventRepository>,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub payment_proofs: Arc<dyn PaymentProofRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub rsvps: Arc<dyn RsvpRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pool: Option<DatabasePool>,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: Arc::new(PgEventRepository::new(pool.clone())),
            organizations: Arc::new(PgOrganizationRepository::new(pool.clone())),
            registrations: Arc::new(PgRegistrationRepository::new(pool.clone())),
            payment_proofs: Arc::new(PgPaymentProofRepository::new(pool.clone())),
            tickets: Arc::new(PgTicketRepository::new(pool.clone())),
            rsvps: Arc::new(PgRsvpRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Back every repository with the same in-memory tables
    pub fn in_memory(db: Arc<InMemoryDatabase>) -> Self {
        Self {
            events: db.clone(),
            organizations: db.clone(),
            registrations: db.clone(),
            payment_proofs: db.clone(),
            tickets: db.clone(),
            rsvps: db.clone(),
            profiles: db,
            pool: None,
        }
    }

    pub fn pool(&self) -> Option<&DatabasePool> {
        self.pool.as_ref()
    }

    /// Ping the backing store; the in-memory backend is always healthy
    pub async fn health_check(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => connection::health_check(pool).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("backend", &if self.pool.is_some() { "postgres" } else { "memory" })
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_service_is_healthy() {
        let service = DatabaseService::in_memory(Arc::new(InMemoryDatabase::new()));
        assert!(service.pool().is_none());
        assert!(service.health_check().await.is_ok());
        assert_eq!(format!("{service:?}"), "DatabaseService { backend: \"memory\" }");
    }
}
