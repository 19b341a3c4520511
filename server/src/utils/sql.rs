//! SQL utility functions

/// Quote an identifier for SQLite (`"name"`), doubling embedded quotes
///
/// # Example
///
/// ```
/// use querygate_server::utils::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("created_at"), "\"created_at\"");
/// assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated list of `n` bind placeholders
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
