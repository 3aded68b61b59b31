//! Label translation from auxiliary warehouse tables.
//!
//! Two label tables exist in the warehouse: one maps variable codes to
//! human-readable names per fact table, the other maps cell values per fact
//! table and column. A code can carry different labels over time; when the
//! historical labels disagree the aggregation substitutes a fixed sentinel.

use crate::db::{DbResult, DwClient};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Label substituted when the historical labels for one code disagree.
pub const VARYING_MEANING_LABEL: &str = "meaning varies over time";

/// Fallback label for a value code with no mapping at all.
pub const UNSPECIFIED_LABEL: &str = "unspecified";

/// Active-status flag of label rows.
const ACTIVE_STATUS: &str = "A";

/// A key-to-label capability.
///
/// A closed set of variants instead of open subclassing; both are dispatched
/// through the same three operations.
#[derive(Debug, Clone)]
pub enum Translator {
    /// Returns every key unchanged.
    Identity,
    /// Mapping loaded once from a label table, with a missing-label policy.
    TableLookup {
        labels: BTreeMap<String, String>,
        missing_label: String,
    },
}

impl Translator {
    /// Build a lookup translator from an already-loaded mapping.
    pub fn from_mapping(labels: BTreeMap<String, String>, missing_label: impl Into<String>) -> Self {
        Self::TableLookup {
            labels,
            missing_label: missing_label.into(),
        }
    }

    /// Translate a key into its label.
    ///
    /// A mapped, non-empty label wins; otherwise a non-empty key falls back
    /// to the configured missing label; an empty missing label (or an empty
    /// key) falls back to the key itself.
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        match self {
            Translator::Identity => key,
            Translator::TableLookup {
                labels,
                missing_label,
            } => {
                match labels.get(key) {
                    Some(label) if !label.is_empty() => label,
                    _ if !key.is_empty() && !missing_label.is_empty() => missing_label,
                    _ => key,
                }
            }
        }
    }

    /// Whether the key is present in the loaded mapping.
    ///
    /// Independent of the fallback policy; used to decide whether a label
    /// directive should be emitted at all.
    pub fn has_translation(&self, key: &str) -> bool {
        match self {
            Translator::Identity => false,
            Translator::TableLookup { labels, .. } => labels.contains_key(key),
        }
    }

    /// The loaded mapping; empty for the identity translator.
    pub fn mapping(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Translator::Identity => None,
            Translator::TableLookup { labels, .. } => Some(labels),
        }
    }
}

/// Stream a two-column (key, label) query into a map.
async fn load_mapping<C: DwClient>(
    client: &mut C,
    sql: &str,
    params: &[String],
) -> DbResult<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();
    client
        .select(sql, params, |row| {
            let key = row.get_string(1)?;
            let label = row.get_string(2)?;
            labels.insert(key, label);
            Ok(())
        })
        .await?;
    Ok(labels)
}

/// Load the variable-name translator for a fact table.
///
/// Aggregates by variable code: the single distinct label when all historical
/// labels agree, the varying-meaning sentinel otherwise. Missing codes fall
/// back to the original column name (empty missing label).
pub async fn load_variable_translator<C: DwClient>(
    client: &mut C,
    table: &str,
) -> Result<Translator> {
    let sql = format!(
        "select VARIABLE, \
         case when count_distinct_label = 1 \
              then max_label \
              else '{}' \
         end label \
         from (select VARIABLE, \
                      max(LABEL) max_label, \
                      count(distinct LABEL) count_distinct_label \
               from DW_VARIABLE_LABELS \
               where FACT_TABLE = :p_table and STATUS = :p_status \
               group by VARIABLE)",
        VARYING_MEANING_LABEL
    );
    let params = vec![table.to_uppercase(), ACTIVE_STATUS.to_string()];
    let labels = load_mapping(client, &sql, &params)
        .await
        .map_err(|source| Error::LabelLoad {
            target: table.to_string(),
            sql: sql.clone(),
            source,
        })?;
    debug!(table, labels = labels.len(), "loaded variable labels");
    Ok(Translator::from_mapping(labels, ""))
}

/// Load the value translator for one column of a fact table.
///
/// Same aggregation as the variable translator, additionally scoped by
/// column. Unmapped values fall back to an explicit "unspecified" marker
/// rather than the raw code.
pub async fn load_value_translator<C: DwClient>(
    client: &mut C,
    table: &str,
    column: &str,
) -> Result<Translator> {
    let sql = format!(
        "select CODE, \
         case when count_distinct_label = 1 \
              then max_label \
              else '{}' \
         end label \
         from (select CODE, \
                      max(LABEL) max_label, \
                      count(distinct LABEL) count_distinct_label \
               from DW_VALUE_LABELS \
               where FACT_TABLE = :p_table and VARIABLE = :p_column and STATUS = :p_status \
               group by CODE)",
        VARYING_MEANING_LABEL
    );
    let params = vec![
        table.to_uppercase(),
        column.to_uppercase(),
        ACTIVE_STATUS.to_string(),
    ];
    let labels = load_mapping(client, &sql, &params)
        .await
        .map_err(|source| Error::LabelLoad {
            target: format!("{}.{}", table, column),
            sql: sql.clone(),
            source,
        })?;
    debug!(table, column, labels = labels.len(), "loaded value labels");
    Ok(Translator::from_mapping(labels, UNSPECIFIED_LABEL))
}
