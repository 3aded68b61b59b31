//! Per-column processing instructions.
//!
//! A [`DwColumn`] composes the probed metadata, the casing rule and the
//! optional translators into everything the plan and the loader need: the
//! SQL-safe column name, the final variable name, the Stata type and format,
//! and per-row value extraction with date/time epoch conversion.

use crate::db::{DbColumnMetaData, DbResult, DbRow, NativeType};
use crate::options::VariableCasing;
use crate::stata::{map_type, translated_type, StataType};
use crate::translate::Translator;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stata measures dates in days (and clock times in milliseconds) since
/// 1960-01-01.
const EPOCH_YEAR: i32 = 1960;

fn stata_epoch() -> NaiveDate {
    // constant date, always valid
    NaiveDate::from_ymd_opt(EPOCH_YEAR, 1, 1).unwrap_or_default()
}

/// Everything we know about one column of the query.
pub struct DwColumn {
    meta: DbColumnMetaData,
    /// 1-based ordinal in the projection.
    position: usize,
    casing: VariableCasing,
    /// Table-wide name translator, shared between columns.
    variable_translator: Option<Arc<Translator>>,
    /// Value translator loaded for this column alone.
    value_translator: Option<Translator>,
    stata_type: StataType,
    format: String,
    // cached at construction, checked for every row
    is_numeric: bool,
    is_date: bool,
    is_time: bool,
}

impl DwColumn {
    /// Compose a column from its metadata and translators.
    pub fn new(
        meta: DbColumnMetaData,
        position: usize,
        casing: VariableCasing,
        variable_translator: Option<Arc<Translator>>,
        value_translator: Option<Translator>,
    ) -> Self {
        // a value-translated column renders labels as text regardless of its
        // native type
        let (stata_type, format) = if value_translator.is_some() {
            translated_type()
        } else {
            map_type(&meta)
        };
        let is_numeric = stata_type.is_numeric();
        let is_date = meta.native_type == NativeType::Date;
        let is_time = meta.native_type == NativeType::Timestamp;
        Self {
            meta,
            position,
            casing,
            variable_translator,
            value_translator,
            stata_type,
            format,
            is_numeric,
            is_date,
            is_time,
        }
    }

    /// The column name as it can be used in SQL, double-quoted when needed.
    pub fn column_name(&self) -> String {
        if self.meta.requires_quoting {
            format!("\"{}\"", self.meta.name)
        } else {
            self.meta.name.clone()
        }
    }

    /// The label to attach to the variable, looked up by upper-cased name.
    pub fn column_label(&self) -> String {
        match &self.variable_translator {
            Some(translator) => translator
                .translate(&self.meta.name.to_uppercase())
                .to_string(),
            None => String::new(),
        }
    }

    /// The final variable name in the dataset.
    ///
    /// Spaces are not valid in variable names, so they become underscores;
    /// then the casing rule applies.
    pub fn variable_name(&self) -> String {
        let name = self.meta.name.replace(' ', "_");
        match self.casing {
            VariableCasing::Uppercase => name.to_uppercase(),
            VariableCasing::Lowercase => name.to_lowercase(),
            VariableCasing::Original => name,
        }
    }

    /// Whether a `label variable` directive should be emitted.
    ///
    /// Only when a translator is attached and it really knows this column;
    /// the fallback policy alone is not worth a directive.
    pub fn is_label_variable(&self) -> bool {
        self.variable_translator
            .as_ref()
            .is_some_and(|t| t.has_translation(&self.meta.name.to_uppercase()))
    }

    /// Whether `label define`/`label values` directives should be emitted.
    pub fn is_label_values(&self) -> bool {
        self.value_labels().is_some_and(|m| !m.is_empty())
    }

    /// The value-label mapping, when a value translator is attached.
    pub fn value_labels(&self) -> Option<&BTreeMap<String, String>> {
        self.value_translator.as_ref().and_then(|t| t.mapping())
    }

    /// The Stata storage type of the variable.
    pub fn stata_type(&self) -> StataType {
        self.stata_type
    }

    /// The Stata display format of the variable.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Whether values are read as numbers rather than text.
    pub fn is_numeric(&self) -> bool {
        self.is_numeric
    }

    /// 1-based position of this column in the projection.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the value at this column's position is NULL in `row`.
    pub fn is_null(&self, row: &dyn DbRow) -> bool {
        row.is_null(self.position)
    }

    /// Read this column from `row` as a number.
    ///
    /// DATE columns become whole days since the 1960-01-01 epoch, TIMESTAMP
    /// columns become milliseconds since midnight of that same date.
    pub fn as_number(&self, row: &dyn DbRow) -> DbResult<f64> {
        if self.is_date {
            let value = row.get_datetime(self.position)?;
            let days = (value.date() - stata_epoch()).num_days();
            Ok(days as f64)
        } else if self.is_time {
            let value = row.get_datetime(self.position)?;
            let elapsed = value - stata_epoch().and_hms_opt(0, 0, 0).unwrap_or_default();
            Ok(elapsed.num_seconds() as f64 * 1000.0)
        } else {
            row.get_f64(self.position)
        }
    }

    /// Read this column from `row` as text, translated when a value
    /// translator is attached.
    pub fn as_string(&self, row: &dyn DbRow) -> DbResult<String> {
        let value = row.get_string(self.position)?;
        match &self.value_translator {
            Some(translator) => Ok(translator.translate(&value).to_string()),
            None => Ok(value),
        }
    }
}
