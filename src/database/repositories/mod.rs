//! Database repositories module
//!
//! One narrow trait per entity with a PostgreSQL implementation each; the
//! in-memory gateway in [`crate::database::memory`] implements the same traits.

pub mod user;
pub mod event;
pub mod organization;
pub mod registration;
pub mod ticket;

// Re-export repositories
pub use user::{PgProfileRepository, ProfileRepository};
pub use event::{EventRepository, PgEventRepository};
pub use organization::{OrganizationRepository, PgOrganizationRepository};
pub use registration::{PgRegistrationRepository, RegistrationRepository};
pub use ticket::{
    PaymentProofRepository, PgPaymentProofRepository, PgRsvpRepository, PgTicketRepository, RsvpRepository,
    TicketRepository,
};
