// ABOUTME: SQL data node: reads a configured query into an exposed type and writes payloads to a table.
// ABOUTME: Writes create the target table lazily and replace its contents inside one transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use depot_core::{Array, DataNodeId, Frame, Record, Scope};
use serde::Serialize;
use serde_json::Value;

use super::payload::{NormalizedRows, WritePayload};
use super::rows::{FromRow, RowArgs, RowClass, RowObject};
use super::{
    DefaultConnector, SqlConnection, SqlConnector, SqlError, in_transaction, quote_ident,
};
use crate::properties::{
    ConnectionProperties, Properties, PropertyError, optional_str, required_str,
};

const STORAGE_TYPE: &str = "sql";

/// What `read` converts query results into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposedType {
    Frame,
    Array,
    /// Name of a class registered on the node.
    Custom(String),
}

impl ExposedType {
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            None | Some("pandas") => ExposedType::Frame,
            Some("numpy") => ExposedType::Array,
            Some(other) => ExposedType::Custom(other.to_string()),
        }
    }
}

/// Data produced by `read`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Exposed {
    Frame(Frame),
    Array(Array),
    Objects(Vec<RowObject>),
}

/// A table target for writes, with the columns it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTable {
    pub name: String,
    pub columns: Vec<String>,
}

/// A named, scoped handle to data held in a SQL database.
pub struct SqlDataNode {
    config_id: String,
    scope: Scope,
    id: DataNodeId,
    parent_id: Option<String>,
    job_ids: Vec<String>,
    last_edit_date: Option<DateTime<Utc>>,
    edit_in_progress: bool,
    connection: ConnectionProperties,
    read_query: String,
    write_table: String,
    exposed_type: ExposedType,
    classes: BTreeMap<String, RowClass>,
    connector: Arc<dyn SqlConnector>,
}

impl SqlDataNode {
    /// Create a data node from its properties, failing on the first missing
    /// required property (connection properties, then `read_query`, then
    /// `write_table`). A fresh id is generated when none is given.
    pub fn new(
        config_id: impl Into<String>,
        scope: Scope,
        id: Option<DataNodeId>,
        properties: &Properties,
    ) -> Result<Self, PropertyError> {
        let config_id = config_id.into();
        let connection = ConnectionProperties::from_properties(properties)?;
        let read_query = required_str(properties, "read_query")?;
        let write_table = required_str(properties, "write_table")?;
        let exposed_type = ExposedType::parse(optional_str(properties, "exposed_type")?.as_deref());
        let id = id.unwrap_or_else(|| DataNodeId::generate(&config_id));

        tracing::debug!("created sql data node {} on {}", id, connection.redacted_url());

        Ok(Self {
            config_id,
            scope,
            id,
            parent_id: None,
            job_ids: Vec::new(),
            last_edit_date: Some(Utc::now()),
            edit_in_progress: false,
            connection,
            read_query,
            write_table,
            exposed_type,
            classes: BTreeMap::new(),
            connector: Arc::new(DefaultConnector),
        })
    }

    /// Use a different connector, e.g. for a networked engine.
    pub fn with_connector(mut self, connector: Arc<dyn SqlConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Register a class that a custom `exposed_type` can name.
    pub fn with_row_class(mut self, class: RowClass) -> Self {
        self.classes.insert(class.name().to_string(), class);
        self
    }

    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn storage_type(&self) -> &'static str {
        STORAGE_TYPE
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn id(&self) -> &DataNodeId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn job_ids(&self) -> &[String] {
        &self.job_ids
    }

    pub fn add_job_id(&mut self, job_id: impl Into<String>) {
        self.job_ids.push(job_id.into());
    }

    pub fn last_edit_date(&self) -> Option<DateTime<Utc>> {
        self.last_edit_date
    }

    pub fn lock_edit(&mut self) {
        self.edit_in_progress = true;
    }

    pub fn unlock_edit(&mut self) {
        self.edit_in_progress = false;
    }

    /// Ready when no edit is in progress and the data has been written at least once.
    pub fn is_ready_for_reading(&self) -> bool {
        !self.edit_in_progress && self.last_edit_date.is_some()
    }

    pub fn read_query(&self) -> &str {
        &self.read_query
    }

    pub fn write_table(&self) -> &str {
        &self.write_table
    }

    pub fn exposed_type(&self) -> &ExposedType {
        &self.exposed_type
    }

    pub fn connection(&self) -> &ConnectionProperties {
        &self.connection
    }

    /// Run the read query and convert the rows into the configured exposed type.
    pub fn read(&self) -> Result<Exposed, SqlError> {
        match &self.exposed_type {
            ExposedType::Frame => self.read_as_frame().map(Exposed::Frame),
            ExposedType::Array => self.read_as_array().map(Exposed::Array),
            ExposedType::Custom(name) => {
                let class = self
                    .classes
                    .get(name)
                    .ok_or_else(|| SqlError::UnknownExposedType(name.clone()))?;
                self.read_as(&self.read_query, class).map(Exposed::Objects)
            }
        }
    }

    pub fn read_as_frame(&self) -> Result<Frame, SqlError> {
        let result = self.connect()?.query(&self.read_query, &[])?;
        Ok(Frame::new(result.columns, result.rows))
    }

    /// Rows as a 2-D array in result column order.
    pub fn read_as_array(&self) -> Result<Array, SqlError> {
        Ok(self.read_as_frame()?.to_array())
    }

    /// Run `query` and build one `class` instance per row. Declared fields a row
    /// lacks are null; columns the class does not declare go to `extra`.
    pub fn read_as(&self, query: &str, class: &RowClass) -> Result<Vec<RowObject>, SqlError> {
        let records = self.query_records(query)?;
        Ok(records.into_iter().map(|r| class.construct(r)).collect())
    }

    /// Like `read_as`, for a statically typed target.
    pub fn read_as_typed<T: FromRow>(&self, query: &str) -> Result<Vec<T>, SqlError> {
        let records = self.query_records(query)?;
        Ok(records
            .into_iter()
            .map(|r| T::from_row(RowArgs::split(r, T::FIELDS)))
            .collect())
    }

    /// Replace the write table's contents with `data`. Empty payloads are a
    /// no-op that opens no connection and creates no table.
    pub fn write(&mut self, data: impl Into<WritePayload>) -> Result<(), SqlError> {
        self.store(data.into(), true)
    }

    /// Add `data` to the write table, keeping existing rows.
    pub fn append(&mut self, data: impl Into<WritePayload>) -> Result<(), SqlError> {
        self.store(data.into(), false)
    }

    fn store(&mut self, payload: WritePayload, replace: bool) -> Result<(), SqlError> {
        let Some(rows) = payload.normalize() else {
            tracing::debug!("nothing to write to {}", self.write_table);
            return Ok(());
        };

        let mut conn = self.connect()?;
        let table = self.create_table(conn.as_mut(), &rows)?;

        in_transaction(conn.as_mut(), |conn| {
            if replace {
                conn.execute(&format!("DELETE FROM {}", quote_ident(&table.name)?), &[])?;
            }
            match &rows {
                NormalizedRows::Dicts { rows, .. } => insert_dicts(rows, &table, conn),
                NormalizedRows::Tuples(tuples) => insert_tuples(tuples, &table, conn),
            }
        })?;

        tracing::info!(
            "wrote {} rows to {} ({})",
            rows.len(),
            self.write_table,
            self.id
        );
        self.last_edit_date = Some(Utc::now());
        Ok(())
    }

    /// Create the write table if it does not exist, sized for `rows`.
    fn create_table(
        &self,
        conn: &mut dyn SqlConnection,
        rows: &NormalizedRows,
    ) -> Result<WriteTable, SqlError> {
        let columns = rows.column_names();
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote_ident(&self.write_table)?,
                column_list
            ),
            &[],
        )?;

        Ok(WriteTable {
            name: self.write_table.clone(),
            columns,
        })
    }

    fn query_records(&self, query: &str) -> Result<Vec<Record>, SqlError> {
        Ok(self.connect()?.query(query, &[])?.records())
    }

    fn connect(&self) -> Result<Box<dyn SqlConnection>, SqlError> {
        self.connector.connect(&self.connection)
    }
}

/// Insert rows keyed by column name, in table column order. Each row names
/// only the columns it has.
fn insert_dicts(
    rows: &[Record],
    table: &WriteTable,
    conn: &mut dyn SqlConnection,
) -> Result<(), SqlError> {
    let table_name = quote_ident(&table.name)?;
    for row in rows {
        let present: Vec<&String> = table
            .columns
            .iter()
            .filter(|c| row.contains_key(c.as_str()))
            .collect();
        if present.is_empty() {
            conn.execute(&format!("INSERT INTO {table_name} DEFAULT VALUES"), &[])?;
            continue;
        }

        let columns = present
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders: Vec<String> = (1..=present.len()).map(|i| format!("?{i}")).collect();
        let values: Vec<Value> = present.iter().map(|c| row[c.as_str()].clone()).collect();

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table_name,
                columns.join(", "),
                placeholders.join(", ")
            ),
            &values,
        )?;
    }
    Ok(())
}

/// Insert rows by position, padding short rows with nulls to the table width.
fn insert_tuples(
    rows: &[Vec<Value>],
    table: &WriteTable,
    conn: &mut dyn SqlConnection,
) -> Result<(), SqlError> {
    let table_name = quote_ident(&table.name)?;
    let width = table.columns.len();
    let placeholders: Vec<String> = (1..=width).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} VALUES ({})",
        table_name,
        placeholders.join(", ")
    );

    for row in rows {
        let mut values = row.clone();
        values.resize(width, Value::Null);
        conn.execute(&sql, &values)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        serde_json::from_value(value).unwrap()
    }

    fn mssql_props() -> Properties {
        props(json!({
            "db_username": "sa",
            "db_password": "Passw0rd",
            "db_name": "taipy",
            "db_engine": "mssql",
            "read_query": "SELECT * from daily_min_example",
            "write_table": "foo",
            "db_extra_args": {"TrustServerCertificate": "yes"},
        }))
    }

    #[test]
    fn exposed_type_parsing() {
        assert_eq!(ExposedType::parse(None), ExposedType::Frame);
        assert_eq!(ExposedType::parse(Some("pandas")), ExposedType::Frame);
        assert_eq!(ExposedType::parse(Some("numpy")), ExposedType::Array);
        assert_eq!(
            ExposedType::parse(Some("Whatever")),
            ExposedType::Custom("Whatever".to_string())
        );
    }

    #[test]
    fn new_node_metadata() {
        let node = SqlDataNode::new("foo_bar", Scope::Pipeline, None, &mssql_props()).unwrap();

        assert_eq!(node.storage_type(), "sql");
        assert_eq!(node.config_id(), "foo_bar");
        assert_eq!(node.scope(), Scope::Pipeline);
        assert!(node.id().as_str().starts_with("DATANODE_foo_bar_"));
        assert!(node.parent_id().is_none());
        assert!(node.job_ids().is_empty());
        assert!(node.is_ready_for_reading());
        assert!(!node.read_query().is_empty());
        assert_eq!(node.exposed_type(), &ExposedType::Frame);
    }

    #[test]
    fn edit_lock_blocks_reading() {
        let mut node = SqlDataNode::new("foo", Scope::Scenario, None, &mssql_props()).unwrap();

        node.lock_edit();
        assert!(!node.is_ready_for_reading());
        node.unlock_edit();
        assert!(node.is_ready_for_reading());
    }

    #[test]
    fn read_query_and_write_table_are_required() {
        let mut properties = mssql_props();
        properties.remove("write_table");
        assert!(matches!(
            SqlDataNode::new("foo", Scope::Pipeline, None, &properties),
            Err(PropertyError::MissingRequiredProperty("write_table"))
        ));

        properties.remove("read_query");
        assert!(matches!(
            SqlDataNode::new("foo", Scope::Pipeline, None, &properties),
            Err(PropertyError::MissingRequiredProperty("read_query"))
        ));
    }

    #[test]
    fn unregistered_custom_class_fails_on_read() {
        let mut properties = mssql_props();
        properties.insert("exposed_type".to_string(), json!("Whatever"));
        let node = SqlDataNode::new("foo", Scope::Pipeline, None, &properties).unwrap();

        let err = node.read().unwrap_err();
        assert!(matches!(err, SqlError::UnknownExposedType(ref name) if name == "Whatever"));
    }
}
