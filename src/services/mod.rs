pub mod lead;
pub mod lead_service;

pub use lead::{Lead, LeadSource, LeadStatus};
pub use lead_service::{LeadQueryService, LeadServiceError};
