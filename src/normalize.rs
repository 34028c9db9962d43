//! Flattening of API records into a table.
//!
//! Nested objects become dotted column names (`location.code`); lists stay as JSON
//! values. The `watertypes` list can additionally be split into its
//! `classificationsystem` and `watertypecode` columns.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::response::Record;

pub const WATERTYPES: &str = "watertypes";
pub const CLASSIFICATION_SYSTEM: &str = "classificationsystem";
pub const WATERTYPE_CODE: &str = "watertypecode";

/// Flattened query result: one row per record, one column per distinct leaf field.
///
/// A cell is `None` when the record had no value for that column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Table {
    /// Column names in order of first appearance.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in column `name`; `None` if the row, the column or the value is
    /// missing.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    pub fn column<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = Option<&'a Value>> + use<'a>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_ref()))
    }

    /// Rows as flat JSON objects; missing cells are left out.
    pub fn into_records(self) -> Vec<Record> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row)
                    .filter_map(|(name, cell)| cell.map(|v| (name.clone(), v)))
                    .collect()
            })
            .collect()
    }

    fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            let mut leaves = Vec::new();
            flatten_into(None, record, &mut leaves);

            let mut row: Vec<Option<Value>> = vec![None; columns.len()];
            for (name, value) in leaves {
                let idx = *index.entry(name).or_insert_with_key(|name| {
                    columns.push(name.clone());
                    columns.len() - 1
                });
                if idx >= row.len() {
                    row.resize(idx + 1, None);
                }
                row[idx] = Some(value);
            }
            rows.push(row);
        }

        for row in &mut rows {
            row.resize(columns.len(), None);
        }

        Self { columns, rows }
    }

    /// Replaces the `watertypes` column with `classificationsystem` and
    /// `watertypecode`. Returns `false` when there is no `watertypes` column.
    fn expand_watertypes(&mut self) -> bool {
        let Some(idx) = self.column_index(WATERTYPES) else {
            return false;
        };

        self.columns.remove(idx);
        let mut pairs: Vec<[Option<Value>; 2]> = self
            .rows
            .iter_mut()
            .map(|row| watertype_pair(row.remove(idx)))
            .collect();

        for (slot, name) in [CLASSIFICATION_SYSTEM, WATERTYPE_CODE].into_iter().enumerate() {
            let col = match self.column_index(name) {
                Some(col) => col,
                None => {
                    self.columns.push(name.to_string());
                    for row in &mut self.rows {
                        row.push(None);
                    }
                    self.columns.len() - 1
                }
            };
            for (row, pair) in self.rows.iter_mut().zip(pairs.iter_mut()) {
                row[col] = pair[slot].take();
            }
        }
        true
    }
}

/// Builds the table for `records`, splitting `watertypes` when `parse_watertypes` is set.
///
/// An empty record set gives an empty table without columns.
pub fn normalize(records: &[Record], parse_watertypes: bool) -> Table {
    let mut table = Table::from_records(records);
    if parse_watertypes {
        table.expand_watertypes();
    }
    table
}

fn flatten_into(prefix: Option<&str>, object: &Record, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(Some(&name), inner, out),
            other => out.push((name, other.clone())),
        }
    }
}

// Only the first list element is used; anything else yields the missing pair.
fn watertype_pair(cell: Option<Value>) -> [Option<Value>; 2] {
    match cell {
        Some(Value::Array(items)) => match items.into_iter().next() {
            Some(Value::Object(mut first)) => [
                first.remove(CLASSIFICATION_SYSTEM),
                first.remove(WATERTYPE_CODE),
            ],
            _ => [None, None],
        },
        _ => [None, None],
    }
}

struct RowRef<'a> {
    columns: &'a [String],
    cells: &'a [Option<Value>],
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, cell) in self.columns.iter().zip(self.cells) {
            if let Some(value) = cell {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for cells in &self.rows {
            seq.serialize_element(&RowRef {
                columns: &self.columns,
                cells,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn watertype_records() -> Vec<Record> {
        records(json!([
            {"id": 1, "watertypes": [{"classificationsystem": "X", "watertypecode": "Y"}]},
            {"id": 2, "watertypes": []}
        ]))
    }

    #[test]
    fn watertypes_are_expanded_into_two_columns() {
        let table = normalize(&watertype_records(), true);

        assert_eq!(table.columns(), ["id", "classificationsystem", "watertypecode"]);
        assert!(!table.has_column("watertypes"));
        assert_eq!(table.get(0, "id"), Some(&json!(1)));
        assert_eq!(table.get(0, "classificationsystem"), Some(&json!("X")));
        assert_eq!(table.get(0, "watertypecode"), Some(&json!("Y")));
        assert_eq!(table.get(1, "id"), Some(&json!(2)));
        assert_eq!(table.get(1, "classificationsystem"), None);
        assert_eq!(table.get(1, "watertypecode"), None);
    }

    #[test]
    fn watertypes_are_kept_without_expansion() {
        let table = normalize(&watertype_records(), false);

        assert_eq!(table.columns(), ["id", "watertypes"]);
        assert_eq!(
            table.get(0, "watertypes"),
            Some(&json!([{"classificationsystem": "X", "watertypecode": "Y"}]))
        );
        assert_eq!(table.get(1, "watertypes"), Some(&json!([])));
    }

    #[test]
    fn expansion_without_watertypes_column_is_a_no_op() {
        let input = records(json!([{"id": 1, "name": "a"}]));
        assert_eq!(normalize(&input, true), normalize(&input, false));
    }

    #[test]
    fn missing_null_or_non_list_watertypes_give_missing_pair() {
        let input = records(json!([
            {"id": 1},
            {"id": 2, "watertypes": null},
            {"id": 3, "watertypes": "K1"},
            {"id": 4, "watertypes": [{"watertypecode": "M14"}, {"watertypecode": "R5"}]}
        ]));
        let table = normalize(&input, true);

        let systems: Vec<_> = table.column(CLASSIFICATION_SYSTEM).unwrap().collect();
        let codes: Vec<_> = table.column(WATERTYPE_CODE).unwrap().collect();
        assert_eq!(systems, vec![None, None, None, None]);
        assert_eq!(codes, vec![None, None, None, Some(&json!("M14"))]);
    }

    #[test]
    fn expanded_values_replace_existing_columns() {
        let input = records(json!([
            {"watertypecode": "old", "watertypes": [{"classificationsystem": "KRW", "watertypecode": "M14"}]}
        ]));
        let table = normalize(&input, true);

        assert_eq!(table.columns(), ["watertypecode", "classificationsystem"]);
        assert_eq!(table.get(0, WATERTYPE_CODE), Some(&json!("M14")));
        assert_eq!(table.get(0, CLASSIFICATION_SYSTEM), Some(&json!("KRW")));
    }

    #[test]
    fn nested_objects_become_dotted_columns() {
        let input = records(json!([
            {"id": 1, "parameter": {"code": "NO3", "unit": {"code": "mg/l"}}, "tags": ["a"]},
            {"id": 2, "parameter": {"code": "PO4"}, "extra": true}
        ]));
        let table = normalize(&input, false);

        assert_eq!(
            table.columns(),
            ["id", "parameter.code", "parameter.unit.code", "tags", "extra"]
        );
        assert_eq!(table.get(0, "parameter.unit.code"), Some(&json!("mg/l")));
        assert_eq!(table.get(0, "tags"), Some(&json!(["a"])));
        assert_eq!(table.get(0, "extra"), None);
        assert_eq!(table.get(1, "parameter.code"), Some(&json!("PO4")));
        assert_eq!(table.get(1, "parameter.unit.code"), None);
        assert!(table.rows().iter().all(|row| row.len() == 5));
    }

    #[test]
    fn null_values_are_present_cells() {
        let input = records(json!([{"id": 1, "remark": null}, {"id": 2}]));
        let table = normalize(&input, false);

        assert_eq!(table.get(0, "remark"), Some(&Value::Null));
        assert_eq!(table.get(1, "remark"), None);
    }

    #[test]
    fn empty_nested_objects_add_no_column() {
        let input = records(json!([{"id": 1, "meta": {}}]));
        assert_eq!(normalize(&input, false).columns(), ["id"]);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = normalize(&[], true);
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.columns().is_empty());
    }

    #[test]
    fn row_order_follows_record_order() {
        let input = records(json!([{"id": 3}, {"id": 1}, {"id": 2}]));
        let ids: Vec<_> = normalize(&input, false)
            .column("id")
            .unwrap()
            .map(|v| v.and_then(Value::as_u64).unwrap())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn serializes_rows_without_missing_cells() {
        let table = normalize(&watertype_records(), true);
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!([
                {"id": 1, "classificationsystem": "X", "watertypecode": "Y"},
                {"id": 2}
            ])
        );
    }

    #[test]
    fn into_records_round_trips_flat_rows() {
        let table = normalize(&records(json!([{"a": {"b": 1}}, {"c": 2}])), false);
        let out = table.into_records();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("a.b"), Some(&json!(1)));
        assert!(out[0].get("c").is_none());
        assert_eq!(out[1].get("c"), Some(&json!(2)));
    }
}
