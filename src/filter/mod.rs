pub mod secure;

pub use secure::{EmptyReason, FilterError, FilterOutcome, SecureFilterBuilder, SecureFilterExpression};
