//! Command tokenizer and option parser.
//!
//! The use command mixes positional and keyword clauses. The generic
//! [`OptionParser`] groups a flat token list into keyword/value pairs; the
//! [`parse_use_command`] adapter first inserts the implicit leading keywords
//! (`using`, `variables`) the grammar allows callers to omit.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// The recognized keyword vocabulary of the use command.
pub const KEYWORDS: [&str; 12] = [
    "variables",
    "if",
    "using",
    "limit",
    "nulldata",
    "lowercase",
    "uppercase",
    "label_variable",
    "label_values",
    "username",
    "password",
    "database",
];

/// Parsed options: lowercase keyword to captured value.
///
/// An empty value means the keyword was present as a bare flag.
pub type OptionMap = BTreeMap<String, String>;

/// Groups a flat token list into named options given a keyword set.
pub struct OptionParser {
    keys: Vec<String>,
}

impl OptionParser {
    /// Create a parser that accepts the given keywords.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(|k| k.into().to_lowercase()).collect(),
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.keys.iter().any(|k| k.eq_ignore_ascii_case(word))
    }

    /// Scan tokens left to right and collect each keyword together with the
    /// run of value tokens that follows it, joined by single spaces.
    ///
    /// Fails when a value token appears before any keyword.
    pub fn parse(&self, words: &[String]) -> Result<OptionMap> {
        let mut options = OptionMap::new();
        let mut current_key = String::new();
        for word in words {
            if self.is_keyword(word) {
                current_key = word.to_lowercase();
                // take note even if no value follows, so it is at least a flag
                options.entry(current_key.clone()).or_default();
            } else {
                if current_key.is_empty() {
                    return Err(Error::structural_parse(word));
                }
                let opt = options.entry(current_key.clone()).or_default();
                if !opt.is_empty() {
                    opt.push(' ');
                }
                opt.push_str(word);
            }
        }
        Ok(options)
    }
}

/// Parse the tokens of a use command into an option map.
///
/// Grammar rules before delegating to the generic parser:
/// - no `using` anywhere: the whole list is the table name, so a synthetic
///   `using` is prepended;
/// - `using` present but the list does not open with `if` or `using`: the
///   leading run is the variable list, so a synthetic `variables` is
///   prepended.
pub fn parse_use_command(words: &[String]) -> Result<OptionMap> {
    let parser = OptionParser::new(KEYWORDS);

    let has_using = words.iter().any(|w| w.eq_ignore_ascii_case("using"));
    let mut words = words.to_vec();
    if !has_using {
        words.insert(0, "using".to_string());
    } else if let Some(first) = words.first() {
        if !first.eq_ignore_ascii_case("if") && !first.eq_ignore_ascii_case("using") {
            words.insert(0, "variables".to_string());
        }
    }

    parser.parse(&words)
}
