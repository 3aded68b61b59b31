//! Data warehouse bridge for Stata.
//!
//! Turns a compact `DEFAULTS`/`CREATE`/`LOAD` command string into a typed
//! data-loading plan: it parses the mixed positional/keyword grammar, probes
//! the target table's columns through an external database client, maps the
//! native types to Stata storage types and display formats, loads
//! variable-name and value labels from the warehouse label tables, writes a
//! `.do` file of plan directives and streams the query rows into a
//! caller-supplied variable store.
//!
//! # Example
//!
//! ```no_run
//! use dwuse::{DwClient, Session, VariableStore};
//!
//! async fn run<C: DwClient, S: VariableStore>(store: &mut S) {
//!     let mut session = Session::<C>::new();
//!     let args: Vec<String> = [
//!         "CREATE", "using", "SALES", "username", "scott",
//!         "password", "tiger", "database", "dw", "limit", "100",
//!     ]
//!     .iter()
//!     .map(|w| w.to_string())
//!     .collect();
//!     for line in session.dispatch(&args, store).await {
//!         println!("{line}");
//!     }
//! }
//! ```

pub mod column;
pub mod db;
pub mod error;
pub mod options;
pub mod parser;
pub mod plan;
pub mod query;
pub mod session;
pub mod stata;
pub mod translate;

// Re-export main types
pub use column::DwColumn;
pub use db::{DbColumnMetaData, DbError, DbResult, DbRow, DwClient, NativeType};
pub use error::{Error, Result};
pub use options::{UseOptions, VariableCasing};
pub use parser::{parse_use_command, OptionMap, OptionParser, KEYWORDS};
pub use plan::{plan_directives, CommandLog, COMMAND_LOG_FILE};
pub use query::DwUseQuery;
pub use session::{Session, VariableStore};
pub use stata::{map_type, StataType};
pub use translate::Translator;
