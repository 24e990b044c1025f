//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod registration;
pub mod ticket;
pub mod rsvp;

// Re-export commonly used models
pub use user::{Profile, ProfileBackfill};
pub use event::{Event, EventType, Organization, OrganizationRole};
pub use registration::{
    ApproveRegistrationsRequest, EventPaymentProof, EventRegistration, NewRegistration, Participant,
    ParticipantsQuery, RegisterEventRequest, RegistrationStatus,
};
pub use ticket::{EventTicket, TicketDetails};
pub use rsvp::{EventRsvp, RsvpRequest, RsvpStatus};
