//! Session context and command dispatch.
//!
//! One session holds at most one set of default options and one built query
//! between command invocations; installing a new one releases the previous
//! one (and its connection) deterministically. Every command entry point
//! converts any error into display lines for the host runtime; nothing
//! propagates, because an uncaught failure would take the host down with it.

use crate::error::{Error, Result};
use crate::db::DwClient;
use crate::options::UseOptions;
use crate::parser::parse_use_command;
use crate::plan::{plan_directives, CommandLog, COMMAND_LOG_FILE};
use crate::query::DwUseQuery;
use std::path::PathBuf;
use tracing::info;

/// The external variable store rows are loaded into.
///
/// Variable and observation indices are 1-based, matching the host's
/// storage interface.
pub trait VariableStore: Send {
    /// Store a numeric cell.
    fn store_number(&mut self, var: usize, obs: usize, value: f64);

    /// Store a string cell.
    fn store_string(&mut self, var: usize, obs: usize, value: &str);
}

/// Session state carried across command invocations.
pub struct Session<C: DwClient> {
    defaults: Option<UseOptions>,
    query: Option<DwUseQuery<C>>,
    log_path: PathBuf,
}

impl<C: DwClient> Default for Session<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DwClient> Session<C> {
    /// Create an empty session writing the command log to its fixed name.
    pub fn new() -> Self {
        Self {
            defaults: None,
            query: None,
            log_path: PathBuf::from(COMMAND_LOG_FILE),
        }
    }

    /// Create a session writing the command log to a custom location.
    pub fn with_log_path(log_path: impl Into<PathBuf>) -> Self {
        Self {
            defaults: None,
            query: None,
            log_path: log_path.into(),
        }
    }

    /// Route a raw command to its handler by the leading mode word.
    ///
    /// Always returns display lines; errors never escape to the caller.
    pub async fn dispatch<S: VariableStore>(
        &mut self,
        args: &[String],
        store: &mut S,
    ) -> Vec<String> {
        let Some(mode) = args.first() else {
            return usage();
        };
        let mode = mode.to_uppercase();
        let words = preprocess_args(&args[1..]);
        info!(mode = %mode, "dispatching command");
        match mode.as_str() {
            "DEFAULTS" => self.set_defaults(&words),
            "CREATE" => self.create(&words).await,
            "LOAD" => self.load(store).await,
            _ => vec![format!("Unknown mode {}. Use DEFAULTS, CREATE or LOAD!", mode)],
        }
    }

    /// Parse and store session-wide default options.
    pub fn set_defaults(&mut self, words: &[String]) -> Vec<String> {
        match parse_use_command(words) {
            Ok(map) => {
                self.defaults = Some(UseOptions::new(map));
                Vec::new()
            }
            Err(err) => vec![format!("Error: {}", err)],
        }
    }

    /// Build a query from the command, emit the plan and install the query.
    ///
    /// A failed CREATE leaves the previously installed query untouched. The
    /// options echo is printed as soon as the command parses, so the user
    /// sees it even when a later stage errors.
    pub async fn create(&mut self, words: &[String]) -> Vec<String> {
        let mut display = Vec::new();
        if let Err(err) = self.try_create(words, &mut display).await {
            display.push(format!("Error: {}", err));
        }
        display
    }

    async fn try_create(&mut self, words: &[String], display: &mut Vec<String>) -> Result<()> {
        let mut options = UseOptions::new(parse_use_command(words)?);
        if let Some(defaults) = &self.defaults {
            options.add_defaults(defaults);
        }

        display.push("Options: ".to_string());
        for (key, value) in options.options() {
            display.push(format!("   {}: {}", key, value));
        }

        if options.database().is_empty()
            || options.username().is_empty()
            || options.password().is_empty()
        {
            return Err(Error::Credential);
        }
        let table = options.table().to_string();
        if table.is_empty() || table.contains(char::is_whitespace) {
            return Err(Error::TableName { table });
        }
        options.validate()?;

        let with_data = !options.is_null_data();
        let log_commands = options.is_log_commands();

        let mut query = DwUseQuery::<C>::build(options).await?;
        let row_count = query.row_count().await?;

        let directives = plan_directives(&table, query.columns(), row_count, with_data);
        if log_commands {
            let mut log = CommandLog::create(&self.log_path)?;
            for line in &directives {
                log.write_line(line)?;
            }
            display.push(format!(
                "Saved commands needed to create the dataset into the file \"{}\" in the Stata directory. ",
                self.log_path.display()
            ));
        }

        // everything succeeded, replace (and drop) the previous query
        self.query = Some(query);
        Ok(())
    }

    /// Stream the previously built query's rows into the variable store.
    pub async fn load<S: VariableStore>(&mut self, store: &mut S) -> Vec<String> {
        match &mut self.query {
            Some(query) => match query.load_into(store).await {
                Ok(rows) => {
                    info!(rows, "loaded dataset");
                    Vec::new()
                }
                Err(err) => vec![format!("Error: {}", err)],
            },
            None => vec!["First you have to CREATE a dataset. ".to_string()],
        }
    }

    /// The currently installed query, if a CREATE succeeded.
    pub fn query(&self) -> Option<&DwUseQuery<C>> {
        self.query.as_ref()
    }

    /// The currently stored defaults, if any.
    pub fn defaults(&self) -> Option<&UseOptions> {
        self.defaults.as_ref()
    }
}

/// Undo the host's argument mangling before parsing.
///
/// Backticks stand in for double quotes (the host's argument syntax eats
/// real ones), and a parenthesized filter arrives as one fused `if <expr>`
/// token that has to be split back apart.
fn preprocess_args(args: &[String]) -> Vec<String> {
    let mut words = Vec::with_capacity(args.len());
    for arg in args {
        let arg = arg.replace('`', "\"");
        let fused_if = arg
            .get(..3)
            .map(|prefix| prefix.eq_ignore_ascii_case("if "))
            .unwrap_or(false);
        if fused_if {
            words.push("if".to_string());
            words.push(arg[3..].to_string());
        } else {
            words.push(arg);
        }
    }
    words
}

fn usage() -> Vec<String> {
    vec![
        "DW use bridge usage: ".to_string(),
        "0. Store default values for common options: ".to_string(),
        "    DEFAULTS username <user> password <pass> database <db> ".to_string(),
        "1. CREATE reads the table definition and prepares a command file to create the variables: ".to_string(),
        "    CREATE <table> ".to_string(),
        "    CREATE [<varlist>] [if <expr>] using <table> [nulldata] [lowercase|uppercase] [label_variable [<varlist>]] [label_values [<varlist>]] username <user> password <pass> database <db> [limit <n>] ".to_string(),
        format!("2. Execute the logged commands with \"do {}\". ", COMMAND_LOG_FILE),
        "3. LOAD fills the created dataset. ".to_string(),
    ]
}
