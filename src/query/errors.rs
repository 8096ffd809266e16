//! Query building errors

use thiserror::Error;

/// Result type for query building
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while turning a query string into a composed query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Query string is structurally invalid
    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),

    /// Value cannot be cast to the declared field type
    #[error("Cast to {kind} failed for value \"{value}\" at path \"{field}\"")]
    Cast {
        field: String,
        kind: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_message() {
        let err = QueryError::Cast {
            field: "price".to_string(),
            kind: "Number",
            value: "cheap".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cast to Number failed for value \"cheap\" at path \"price\""
        );
    }
}
