// ABOUTME: Write payload shapes accepted by SQL data nodes and their normalization into rows.
// ABOUTME: Every shape maps to either column-keyed rows or positional rows, or to nothing when empty.

use depot_core::{Array, Frame, Record};
use serde_json::Value;

/// Data handed to a SQL data node for writing.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    Frame(Frame),
    Array(Array),
    /// A list of mappings.
    Records(Vec<Record>),
    /// A single mapping.
    Record(Record),
    /// A list of sequences, one per row.
    Rows(Vec<Vec<Value>>),
    /// A single sequence forming one row.
    Tuple(Vec<Value>),
    /// A list of scalars, one per row.
    Column(Vec<Value>),
    Scalar(Value),
}

/// Rows ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRows {
    /// Inserted by column name, in `columns` order.
    Dicts {
        columns: Vec<String>,
        rows: Vec<Record>,
    },
    /// Inserted by position.
    Tuples(Vec<Vec<Value>>),
}

impl NormalizedRows {
    /// Column-keyed rows whose columns are the mapping keys in first-seen order.
    pub fn dicts(rows: Vec<Record>) -> Self {
        let columns = first_seen(rows.iter().flat_map(|row| row.keys()));
        NormalizedRows::Dicts { columns, rows }
    }

    pub fn len(&self) -> usize {
        match self {
            NormalizedRows::Dicts { rows, .. } => rows.len(),
            NormalizedRows::Tuples(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names for a table that can hold these rows: the dict columns, or
    /// `column_<n>` up to the widest positional row.
    pub fn column_names(&self) -> Vec<String> {
        match self {
            NormalizedRows::Dicts { columns, .. } => columns.clone(),
            NormalizedRows::Tuples(rows) => {
                let width = rows.iter().map(Vec::len).max().unwrap_or(0);
                (0..width).map(|i| format!("column_{i}")).collect()
            }
        }
    }
}

fn first_seen<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in names {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}

impl WritePayload {
    /// Normalize into insertable rows. Returns `None` when there is nothing to
    /// write, either no rows at all or rows without a single column. Such
    /// payloads must not touch the database.
    pub fn normalize(self) -> Option<NormalizedRows> {
        let rows = match self {
            WritePayload::Frame(frame) => NormalizedRows::Dicts {
                columns: first_seen(frame.columns()),
                rows: frame.records(),
            },
            WritePayload::Records(records) => NormalizedRows::dicts(records),
            WritePayload::Record(record) => NormalizedRows::dicts(vec![record]),
            WritePayload::Rows(rows) => NormalizedRows::Tuples(rows),
            WritePayload::Array(Array::TwoD(rows)) => NormalizedRows::Tuples(rows),
            WritePayload::Tuple(row) => NormalizedRows::Tuples(vec![row]),
            WritePayload::Column(items) | WritePayload::Array(Array::OneD(items)) => {
                NormalizedRows::Tuples(items.into_iter().map(|item| vec![item]).collect())
            }
            WritePayload::Scalar(value) => NormalizedRows::Tuples(vec![vec![value]]),
        };

        if rows.is_empty() || rows.column_names().is_empty() {
            None
        } else {
            Some(rows)
        }
    }
}

impl From<Frame> for WritePayload {
    fn from(frame: Frame) -> Self {
        WritePayload::Frame(frame)
    }
}

impl From<Array> for WritePayload {
    fn from(array: Array) -> Self {
        WritePayload::Array(array)
    }
}

impl From<Vec<Record>> for WritePayload {
    fn from(records: Vec<Record>) -> Self {
        WritePayload::Records(records)
    }
}

impl From<Record> for WritePayload {
    fn from(record: Record) -> Self {
        WritePayload::Record(record)
    }
}

impl From<Vec<Vec<Value>>> for WritePayload {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        WritePayload::Rows(rows)
    }
}

/// A JSON document is classified by its outer shape. Lists are classified by
/// their first element: a list of objects is records, a list of lists is rows
/// (stray scalars become single-cell rows), anything else is a column.
impl From<Value> for WritePayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => WritePayload::Record(map.into_iter().collect()),
            Value::Array(items) => match items.first() {
                Some(Value::Object(_)) if items.iter().all(Value::is_object) => {
                    WritePayload::Records(
                        items
                            .into_iter()
                            .filter_map(|item| match item {
                                Value::Object(map) => Some(map.into_iter().collect()),
                                _ => None,
                            })
                            .collect(),
                    )
                }
                Some(Value::Array(_)) => WritePayload::Rows(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Array(row) => row,
                            scalar => vec![scalar],
                        })
                        .collect(),
                ),
                _ => WritePayload::Column(items),
            },
            scalar => WritePayload::Scalar(scalar),
        }
    }
}

impl From<&str> for WritePayload {
    fn from(value: &str) -> Self {
        WritePayload::Scalar(Value::from(value))
    }
}

impl From<String> for WritePayload {
    fn from(value: String) -> Self {
        WritePayload::Scalar(Value::from(value))
    }
}

impl From<i64> for WritePayload {
    fn from(value: i64) -> Self {
        WritePayload::Scalar(Value::from(value))
    }
}

impl From<f64> for WritePayload {
    fn from(value: f64) -> Self {
        WritePayload::Scalar(Value::from(value))
    }
}

impl From<bool> for WritePayload {
    fn from(value: bool) -> Self {
        WritePayload::Scalar(Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn dicts(value: Value) -> NormalizedRows {
        NormalizedRows::dicts(serde_json::from_value(value).unwrap())
    }

    fn tuples(value: Value) -> NormalizedRows {
        NormalizedRows::Tuples(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn mappings_become_dict_rows() {
        let frame = Frame::from_records(&[
            record(json!({"a": 1, "b": 2})),
            record(json!({"a": 3, "b": 4})),
        ]);
        let expected = dicts(json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]));

        assert_eq!(WritePayload::from(frame).normalize(), Some(expected.clone()));
        assert_eq!(
            WritePayload::from(json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}])).normalize(),
            Some(expected)
        );
        assert_eq!(
            WritePayload::from(json!({"a": 1, "b": 2})).normalize(),
            Some(dicts(json!([{"a": 1, "b": 2}])))
        );
    }

    #[test]
    fn sequences_become_tuple_rows() {
        assert_eq!(
            WritePayload::from(json!([[1, 2], [3, 4]])).normalize(),
            Some(tuples(json!([[1, 2], [3, 4]])))
        );
        assert_eq!(
            WritePayload::Tuple(vec![json!(1), json!(2)]).normalize(),
            Some(tuples(json!([[1, 2]])))
        );
        assert_eq!(
            WritePayload::from(json!([1, 2, 3, 4])).normalize(),
            Some(tuples(json!([[1], [2], [3], [4]])))
        );
        assert_eq!(
            WritePayload::from(Array::TwoD(vec![
                vec![json!(1), json!(2)],
                vec![json!(3), json!(4)]
            ]))
            .normalize(),
            Some(tuples(json!([[1, 2], [3, 4]])))
        );
        assert_eq!(
            WritePayload::from(Array::OneD(vec![json!(1), json!(2), json!(3), json!(4)]))
                .normalize(),
            Some(tuples(json!([[1], [2], [3], [4]])))
        );
    }

    #[test]
    fn scalars_become_single_cell_rows() {
        assert_eq!(
            WritePayload::from("foo").normalize(),
            Some(tuples(json!([["foo"]])))
        );
        assert_eq!(
            WritePayload::from(Value::Null).normalize(),
            Some(tuples(json!([[null]])))
        );
        assert_eq!(WritePayload::from(7_i64).normalize(), Some(tuples(json!([[7]]))));
    }

    #[test]
    fn empty_inputs_normalize_to_nothing() {
        assert_eq!(WritePayload::from(json!([])).normalize(), None);
        assert_eq!(WritePayload::from(Frame::default()).normalize(), None);
        assert_eq!(WritePayload::from(Array::OneD(vec![])).normalize(), None);
        assert_eq!(WritePayload::from(Array::TwoD(vec![])).normalize(), None);
        assert_eq!(WritePayload::Records(vec![]).normalize(), None);
    }

    #[test]
    fn cell_less_rows_normalize_to_nothing() {
        assert_eq!(WritePayload::Tuple(vec![]).normalize(), None);
        assert_eq!(WritePayload::Record(Record::new()).normalize(), None);
        assert_eq!(WritePayload::from(json!({})).normalize(), None);
        assert_eq!(WritePayload::from(json!([[]])).normalize(), None);
        assert_eq!(WritePayload::from(json!([{}, {}])).normalize(), None);
        assert_eq!(
            WritePayload::from(Frame::new(vec![], vec![vec![json!(1)]])).normalize(),
            None
        );
    }

    #[test]
    fn frame_keeps_its_column_order() {
        let frame = Frame::new(
            vec!["b".to_string(), "a".to_string()],
            vec![vec![json!(1), json!(2)]],
        );

        let rows = WritePayload::from(frame).normalize().unwrap();
        assert_eq!(rows.column_names(), vec!["b", "a"]);
        assert!(matches!(rows, NormalizedRows::Dicts { ref rows, .. } if rows[0]["a"] == json!(2)));
    }

    #[test]
    fn mixed_list_with_leading_object_is_a_column() {
        let payload = WritePayload::from(json!([{"a": 1}, 2]));
        assert!(matches!(payload, WritePayload::Column(ref items) if items.len() == 2));
    }

    #[test]
    fn column_names_follow_row_shape() {
        assert_eq!(
            dicts(json!([{"b": 1, "a": 2}, {"c": 3}])).column_names(),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            tuples(json!([[1], [2, 3]])).column_names(),
            vec!["column_0", "column_1"]
        );
    }
}
