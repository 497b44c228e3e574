pub mod client;
pub mod error;
pub mod retry;
pub mod schema;
pub mod token;

pub use client::{CrmExecute, CrmRequest, CrmResponse, DynamicsClient};
pub use error::{CrmError, ParsedError};
pub use retry::RetryPolicy;
pub use token::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
