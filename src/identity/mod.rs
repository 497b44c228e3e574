pub mod directory;
pub mod resolver;
pub mod types;

pub use directory::InitiativeDirectory;
pub use resolver::{GroupResolver, InitiativeMapping};
pub use types::{GroupMapping, GroupType, Initiative};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// The caller's groups map to no initiative. Always a hard authorization
    /// failure, never defaulted.
    #[error("No initiative assigned for the presented groups")]
    NoInitiativeAssigned,

    /// Missing, placeholder, or disabled initiative configuration. The inner
    /// detail is for server-side logs only; callers see a generic
    /// configuration-error message.
    #[error("Invalid initiative configuration: {0}")]
    InvalidInitiativeConfig(String),

    #[error("Failed to load initiative configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to parse initiative configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Syntactic GUID check, strict hyphenated 8-4-4-4-12 form. `Uuid` alone
/// would also accept the un-hyphenated simple form, which the identity
/// provider never emits.
pub fn is_guid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}
