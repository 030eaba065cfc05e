//! Valuation requests and contact registrations captured by the lead forms.
//!
//! Storage sits behind the repository traits; the service binary supplies
//! in-memory implementations and tests bring their own.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Contact, ContactDetails, ContactId, ContactInterest, Property, PropertyId, Valuation,
    ValuationId, ValuationOutcome, ValuationStatus, ValuationSubmission,
};
pub use repository::{ContactRepository, PropertyRepository, RepositoryError, ValuationRepository};
pub use router::valuation_router;
pub use service::{LeadServiceError, ValuationLeadService};
