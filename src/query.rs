//! Query construction and row streaming.
//!
//! Building a [`DwUseQuery`] does all the database-facing preparation in one
//! pass: connect, load the variable-name labels, probe the projection shape
//! with a zero-row statement, compose the per-column processing instructions
//! and validate the label selections. The built query then hands out the
//! final SQL, the row count and a single-pass row stream.

use crate::column::DwColumn;
use crate::db::{DbRow, DwClient};
use crate::error::{Error, Result};
use crate::options::UseOptions;
use crate::session::VariableStore;
use crate::translate::{load_value_translator, load_variable_translator, Translator};
use std::sync::Arc;
use tracing::debug;

/// A prepared use query: options, one owned connection and the column list.
pub struct DwUseQuery<C: DwClient> {
    options: UseOptions,
    client: C,
    columns: Vec<DwColumn>,
}

impl<C: DwClient> DwUseQuery<C> {
    /// Connect with the options' credentials and prepare the query.
    pub async fn build(options: UseOptions) -> Result<Self> {
        let client = C::connect(options.username(), options.password(), options.database())
            .await
            .map_err(|source| Error::Connect {
                username: options.username().to_string(),
                database: options.database().to_string(),
                source,
            })?;
        Self::with_client(options, client).await
    }

    /// Prepare the query over an already-opened connection.
    ///
    /// The query takes ownership of the connection and keeps it for its
    /// whole lifetime.
    pub async fn with_client(options: UseOptions, mut client: C) -> Result<Self> {
        let table = options.table().to_string();

        // the variable translator is loaded table-wide and shared by the
        // columns that asked for it
        let variable_translator = Arc::new(load_variable_translator(&mut client, &table).await?);

        // zero-row probe to learn the result shape
        let probe_sql = Self::probe_sql(&options);
        debug!(sql = %probe_sql, "probing column definitions");
        let col_meta = client
            .describe(&probe_sql)
            .await
            .map_err(|source| Error::Probe {
                sql: probe_sql.clone(),
                source,
            })?;

        let label_vars = options.label_variables();
        let label_vals = options.label_values();
        let all_vars = options.is_label_variables() && label_vars.is_empty();
        let all_vals = options.is_label_values() && label_vals.is_empty();

        let probed: Vec<String> = col_meta.iter().map(|m| m.name.to_uppercase()).collect();

        let mut columns = Vec::with_capacity(col_meta.len());
        for (i, meta) in col_meta.into_iter().enumerate() {
            let upper_name = meta.name.to_uppercase();
            let name_translator: Option<Arc<Translator>> =
                if all_vars || label_vars.contains(&upper_name) {
                    Some(Arc::clone(&variable_translator))
                } else {
                    None
                };
            let value_translator = if all_vals || label_vals.contains(&upper_name) {
                Some(load_value_translator(&mut client, &table, &meta.name).await?)
            } else {
                None
            };
            columns.push(DwColumn::new(
                meta,
                i + 1,
                options.variable_casing(),
                name_translator,
                value_translator,
            ));
        }

        // explicit label selections must name probed columns
        for selection in label_vars.iter().chain(label_vals.iter()) {
            if !probed.contains(selection) {
                return Err(Error::LabelTarget {
                    column: selection.clone(),
                });
            }
        }

        Ok(Self {
            options,
            client,
            columns,
        })
    }

    fn probe_sql(options: &UseOptions) -> String {
        let vars = options.variables();
        let projection = if vars.is_empty() {
            "*".to_string()
        } else {
            vars.join(", ")
        };
        format!(
            "select {} from {} where 1=2",
            projection,
            options.table()
        )
    }

    /// The options this query was built from.
    pub fn options(&self) -> &UseOptions {
        &self.options
    }

    /// Column definitions, in projection order.
    pub fn columns(&self) -> &[DwColumn] {
        &self.columns
    }

    /// Compile the final SELECT statement.
    ///
    /// The user filter combines with the row-limiting policy: a positive
    /// limit appends `rownum <= limit`, otherwise (limit 0 or nulldata) a
    /// structure-only `rownum = 0` is appended. The user filter is
    /// parenthesized when both are present.
    pub fn query_sql(&self) -> String {
        let names: Vec<String> = self.columns.iter().map(|c| c.column_name()).collect();
        let mut sql = format!("select {} from {}", names.join(", "), self.options.table());
        let mut where_sql = self.options.where_sql();
        if self.options.limit() > 0 {
            if !where_sql.is_empty() {
                where_sql = format!("({}) and ", where_sql);
            }
            where_sql.push_str(&format!("rownum <= {}", self.options.limit()));
        } else if self.options.limit() == 0 || self.options.is_null_data() {
            // no limit requested (or nulldata): fetch structure only
            if !where_sql.is_empty() {
                where_sql = format!("({}) and ", where_sql);
            }
            where_sql.push_str("rownum = 0");
        }
        if !where_sql.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&where_sql);
        }
        sql
    }

    /// Count the rows the query would produce.
    ///
    /// Runs a wrapping `count(1)` statement; a NULL count reads as zero.
    pub async fn row_count(&mut self) -> Result<i64> {
        let sql = format!("select count(1) from ({})", self.query_sql());
        debug!(sql = %sql, "counting rows");
        let mut count = 0i64;
        self.client
            .select(&sql, &[], |row| {
                // exactly one row with one column
                if !row.is_null(1) {
                    count = row.get_f64(1)? as i64;
                }
                Ok(())
            })
            .await
            .map_err(|source| Error::RowCount { sql, source })?;
        Ok(count)
    }

    /// Run the query and feed each row to `on_row`.
    ///
    /// Single pass, in database order, with at most one open statement.
    pub async fn query_data<F>(&mut self, on_row: F) -> Result<()>
    where
        F: FnMut(&dyn DbRow) -> crate::db::DbResult<()> + Send,
    {
        let sql = self.query_sql();
        debug!(sql = %sql, "streaming query data");
        self.client
            .select(&sql, &[], on_row)
            .await
            .map_err(|source| Error::Query { sql, source })
    }

    /// Run the query and store every non-NULL cell into `store`.
    ///
    /// Numeric columns go through the numeric setter (with date/time epoch
    /// conversion), everything else through the string setter. Returns the
    /// number of rows loaded.
    pub async fn load_into<S: VariableStore>(&mut self, store: &mut S) -> Result<u64> {
        let sql = self.query_sql();
        debug!(sql = %sql, "loading query data");
        let columns = &self.columns;
        let mut obs = 0usize;
        self.client
            .select(&sql, &[], |row| {
                obs += 1;
                for column in columns {
                    // a NULL cell stays missing in the dataset
                    if column.is_null(row) {
                        continue;
                    }
                    if column.is_numeric() {
                        store.store_number(column.position(), obs, column.as_number(row)?);
                    } else {
                        store.store_string(column.position(), obs, &column.as_string(row)?);
                    }
                }
                Ok(())
            })
            .await
            .map_err(|source| Error::Query { sql, source })?;
        Ok(obs as u64)
    }
}
