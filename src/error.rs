//! Error types for the data warehouse bridge.
//!
//! Every fallible operation returns one of these kinds; the session layer is
//! the single place where they are turned into user-visible display lines.

use crate::db::DbError;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for command parsing, option handling and query building.
#[derive(Error, Debug)]
pub enum Error {
    /// A value token appeared before any recognized keyword.
    #[error("Cannot decide what option '{word}' belongs to.")]
    StructuralParse { word: String },

    /// A flag-only option carried an unexpected value.
    #[error("The {option} option does not take a value (found '{value}').")]
    OptionValue { option: String, value: String },

    /// Username, password or database missing at CREATE time.
    #[error("Database credentials are missing!")]
    Credential,

    /// Table name empty or containing whitespace.
    #[error("Could not parse the table name (found \"{table}\"). Are you missing a 'using' keyword or mis-typed the one after the table name?")]
    TableName { table: String },

    /// A label selection names a column that was not probed.
    #[error("Cannot label '{column}': it is not a column of the query.")]
    LabelTarget { column: String },

    /// Connecting to the database failed.
    #[error("Error connecting to the database with {username}@{database}: {source}")]
    Connect {
        username: String,
        database: String,
        source: DbError,
    },

    /// The probe statement could not be described.
    #[error("Error reading column definitions with\n{sql}: {source}")]
    Probe { sql: String, source: DbError },

    /// Running the data query failed.
    #[error("Error querying data with\n{sql}: {source}")]
    Query { sql: String, source: DbError },

    /// Running the wrapping count query failed.
    #[error("Error querying row count with\n{sql}: {source}")]
    RowCount { sql: String, source: DbError },

    /// Loading a label mapping from an auxiliary table failed.
    #[error("Error querying labels for {target} with\n{sql}: {source}")]
    LabelLoad {
        target: String,
        sql: String,
        source: DbError,
    },

    /// Writing the command log failed.
    #[error("Error writing the command log: {0}")]
    PlanLog(#[from] std::io::Error),
}

impl Error {
    /// Create a structural parse error for a stray value token.
    pub fn structural_parse(word: impl Into<String>) -> Self {
        Self::StructuralParse { word: word.into() }
    }

    /// Create an option value error for a flag that carried a value.
    pub fn option_value(option: impl Into<String>, value: impl Into<String>) -> Self {
        Self::OptionValue {
            option: option.into(),
            value: value.into(),
        }
    }
}
