//! Typed view over the parsed option map.

use crate::error::{Error, Result};
use crate::parser::OptionMap;
use std::collections::BTreeSet;

/// Casing rule for the final variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableCasing {
    Original,
    Uppercase,
    Lowercase,
}

/// Typed accessors, validation and default-merging over a parsed option map.
///
/// Read-only after construction except for [`UseOptions::add_defaults`].
#[derive(Debug, Clone)]
pub struct UseOptions {
    options: OptionMap,
}

impl UseOptions {
    /// Wrap a parsed option map.
    pub fn new(options: OptionMap) -> Self {
        Self { options }
    }

    /// The raw parsed options, for echoing back to the user.
    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    fn get_option(&self, name: &str) -> &str {
        self.options.get(name).map(String::as_str).unwrap_or("")
    }

    /// Split an option value on whitespace after removing commas.
    fn get_option_as_list(&self, name: &str, to_uppercase: bool) -> Vec<String> {
        let mut opt = self.get_option(name).replace(',', "");
        if to_uppercase {
            // e.g. for membership checks against probed column names
            opt = opt.to_uppercase();
        }
        opt.split_whitespace().map(|w| w.to_string()).collect()
    }

    pub fn username(&self) -> &str {
        self.get_option("username")
    }

    pub fn password(&self) -> &str {
        self.get_option("password")
    }

    pub fn database(&self) -> &str {
        self.get_option("database")
    }

    /// The database table to query.
    pub fn table(&self) -> &str {
        self.get_option("using").trim()
    }

    /// Columns to fetch from the table; empty means all of them.
    pub fn variables(&self) -> Vec<String> {
        self.get_option_as_list("variables", false)
    }

    /// The `if` expression rewritten into an SQL filter.
    ///
    /// Literal substitutions, applied in this order: `|` to ` or `, `&` to
    /// ` and `, `==` to `=`. No other escaping.
    pub fn where_sql(&self) -> String {
        let filter = self.get_option("if");
        filter
            .replace('|', " or ")
            .replace('&', " and ")
            .replace("==", "=")
    }

    /// Structure-only mode: no data rows are fetched or generated.
    pub fn is_null_data(&self) -> bool {
        self.has_option("nulldata")
    }

    /// Row limit; 0 when absent or unparsable.
    pub fn limit(&self) -> i64 {
        self.get_option("limit").trim().parse().unwrap_or(0)
    }

    /// Casing of the final variable names; `uppercase` wins over `lowercase`.
    pub fn variable_casing(&self) -> VariableCasing {
        if self.has_option("uppercase") {
            VariableCasing::Uppercase
        } else if self.has_option("lowercase") {
            VariableCasing::Lowercase
        } else {
            VariableCasing::Original
        }
    }

    /// Whether variable names should get labels attached.
    pub fn is_label_variables(&self) -> bool {
        self.has_option("label_variable")
    }

    /// Which variables to label; empty combined with the flag means all.
    pub fn label_variables(&self) -> BTreeSet<String> {
        self.get_option_as_list("label_variable", true)
            .into_iter()
            .collect()
    }

    /// Whether column values should get labels attached.
    pub fn is_label_values(&self) -> bool {
        self.has_option("label_values")
    }

    /// Which columns to value-label; empty combined with the flag means all.
    pub fn label_values(&self) -> BTreeSet<String> {
        self.get_option_as_list("label_values", true)
            .into_iter()
            .collect()
    }

    /// Whether the generated plan directives go to the command log.
    ///
    /// Labeling cannot be expressed through macro variables, so the log is
    /// always on.
    pub fn is_log_commands(&self) -> bool {
        true
    }

    /// Reject flag-only options that absorbed a following token.
    pub fn validate(&self) -> Result<()> {
        for flag in ["lowercase", "uppercase", "nulldata"] {
            let value = self.get_option(flag);
            if !value.is_empty() {
                return Err(Error::option_value(flag, value));
            }
        }
        Ok(())
    }

    /// Merge session defaults into these options.
    ///
    /// Explicit casing always wins: `uppercase`/`lowercase` defaults only
    /// apply while the current casing is still `Original`. Any other default
    /// fills a missing key, and a non-empty default also upgrades an existing
    /// bare flag; an existing non-empty value is never overwritten.
    pub fn add_defaults(&mut self, defaults: &UseOptions) {
        for (key, value) in defaults.options() {
            if key == "uppercase" || key == "lowercase" {
                if self.variable_casing() == VariableCasing::Original {
                    self.options.insert(key.clone(), value.clone());
                }
            } else if !self.has_option(key)
                || (!value.is_empty() && self.get_option(key).is_empty())
            {
                // fill gaps and upgrade bare flags, never clobber a real value
                self.options.insert(key.clone(), value.clone());
            }
        }
    }
}
