// ABOUTME: Converts query rows into objects: declared fields by name, everything else into overflow.
// ABOUTME: Supports runtime-described classes (RowClass) and statically typed targets (FromRow).

use std::collections::BTreeMap;

use depot_core::Record;
use serde::Serialize;
use serde_json::Value;

static NULL: Value = Value::Null;

/// Constructor arguments split out of one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowArgs {
    /// Every declared field. Fields the row lacks are null.
    pub fields: BTreeMap<String, Value>,
    /// Columns that match no declared field.
    pub extra: BTreeMap<String, Value>,
}

impl RowArgs {
    pub fn split<S: AsRef<str>>(mut record: Record, field_names: &[S]) -> Self {
        let fields = field_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let value = record.remove(name).unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();

        Self {
            fields,
            extra: record,
        }
    }

    /// Remove a declared field's value, leaving null in its place.
    pub fn take(&mut self, name: &str) -> Value {
        self.fields
            .get_mut(name)
            .map(Value::take)
            .unwrap_or(Value::Null)
    }
}

/// A type that can be built from a query row.
pub trait FromRow: Sized {
    /// Columns consumed as named fields.
    const FIELDS: &'static [&'static str];

    fn from_row(args: RowArgs) -> Self;
}

/// A class described at runtime by its name and field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowClass {
    name: String,
    fields: Vec<String>,
}

impl RowClass {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Build an instance from one row.
    pub fn construct(&self, record: Record) -> RowObject {
        let args = RowArgs::split(record, &self.fields);
        RowObject {
            class: self.name.clone(),
            fields: args.fields,
            extra: args.extra,
        }
    }
}

/// An instance of a RowClass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowObject {
    pub class: String,
    pub fields: BTreeMap<String, Value>,
    pub extra: BTreeMap<String, Value>,
}

impl RowObject {
    /// A declared field's value, or null.
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }
}
