pub mod expr;
pub mod query;

pub use expr::{any_expr, comparison, contains, date_range, escape_quotes, in_list, quoted, validate_identifier, CompareOp};
pub use query::QueryOptions;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ODataError {
    #[error("Invalid field identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Empty value list for field: {0}")]
    EmptyValueList(String),
}
