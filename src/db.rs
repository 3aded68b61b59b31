//! Database collaborator contract.
//!
//! The bridge never talks to the wire itself. It consumes a client through
//! the [`DwClient`] trait: `describe` probes the shape of a statement without
//! fetching rows, and `select` binds positional string parameters and streams
//! every result row into a callback. Connection lifetime belongs to the
//! client; a query owns exactly one client for its own lifetime.

use chrono::NaiveDateTime;
use std::future::Future;
use std::io;
use thiserror::Error;

/// Result type alias for database operations.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Error type for failures inside the database collaborator.
#[derive(Error, Debug)]
pub enum DbError {
    /// I/O error during network communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection refused by the server.
    #[error("Connection refused: {message}")]
    ConnectionRefused { message: String },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Server-side statement error.
    #[error("ORA-{code:05}: {message}")]
    Oracle { code: u32, message: String },

    /// Type conversion error while reading a column value.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },
}

impl DbError {
    /// Create a server-side statement error.
    pub fn oracle(code: u32, message: impl Into<String>) -> Self {
        Self::Oracle {
            code,
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }
}

/// Native column type as reported by the schema probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Date,
    Timestamp,
    Varchar2,
    Number,
    Integer,
    /// Anything the bridge has no dedicated mapping for.
    Other,
}

/// Column metadata captured from a probe statement.
///
/// Copied out of the result-set description so it stays valid after the
/// statement is closed. Immutable once probed.
#[derive(Debug, Clone)]
pub struct DbColumnMetaData {
    /// Column name as stored in the catalog.
    pub name: String,
    /// Whether the name must be double-quoted in SQL (mixed-case names).
    pub requires_quoting: bool,
    /// Native type of the column.
    pub native_type: NativeType,
    /// Byte size, for character types.
    pub size: i32,
    /// Numeric precision.
    pub precision: i32,
    /// Numeric scale.
    pub scale: i32,
}

impl DbColumnMetaData {
    /// Create metadata for a named column, deriving the quoting requirement.
    ///
    /// A name that is not already all-uppercase was created quoted and has to
    /// go back into SQL with double quotes and exact casing.
    pub fn new(name: impl Into<String>, native_type: NativeType) -> Self {
        let name = name.into();
        let requires_quoting = name != name.to_uppercase();
        Self {
            name,
            requires_quoting,
            native_type,
            size: 0,
            precision: 0,
            scale: 0,
        }
    }

    /// Set character size.
    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    /// Set numeric precision and scale.
    pub fn with_precision(mut self, precision: i32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

/// Positional access to one result row.
///
/// Positions are 1-based, matching the column ordinals of the projection.
pub trait DbRow {
    /// Whether the value at `pos` is NULL.
    fn is_null(&self, pos: usize) -> bool;

    /// Read the value at `pos` as a double.
    fn get_f64(&self, pos: usize) -> DbResult<f64>;

    /// Read the value at `pos` as text. NULL reads as an empty string.
    fn get_string(&self, pos: usize) -> DbResult<String>;

    /// Read the value at `pos` as a date/time (DATE and TIMESTAMP columns).
    fn get_datetime(&self, pos: usize) -> DbResult<NaiveDateTime>;
}

/// The external database client consumed by the bridge.
///
/// Implementations run each statement to completion before returning; the
/// bridge never issues concurrent statements on one client.
pub trait DwClient: Sized + Send {
    /// Open a connection with the given credentials.
    fn connect(
        username: &str,
        password: &str,
        database: &str,
    ) -> impl Future<Output = DbResult<Self>> + Send;

    /// Probe a statement's result shape without fetching rows.
    fn describe(&mut self, sql: &str) -> impl Future<Output = DbResult<Vec<DbColumnMetaData>>> + Send;

    /// Execute a query, binding `params` positionally as strings, and invoke
    /// `on_row` once per result row. Resources are released on completion or
    /// error.
    fn select<F>(
        &mut self,
        sql: &str,
        params: &[String],
        on_row: F,
    ) -> impl Future<Output = DbResult<()>> + Send
    where
        F: FnMut(&dyn DbRow) -> DbResult<()> + Send;
}
