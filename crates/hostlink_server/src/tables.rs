//! In-memory tables.

use crate::config::TablePolicy;
use crate::error::{HostError, HostResult};
use hostlink_core::{Filter, Row, ALL_COLUMNS};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Column assigned a generated id when an inserted row lacks one.
pub const ID_COLUMN: &str = "id";

struct Table {
    policy: TablePolicy,
    rows: Vec<Row>,
}

impl Table {
    fn matching<'a>(&'a self, filters: &'a [Filter]) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows
            .iter()
            .filter(move |row| matches_all(filters, row))
    }

    fn has_column(&self, column: &str) -> bool {
        self.rows.is_empty() || self.rows.iter().any(|row| row.contains_key(column))
    }
}

/// The declared tables and their rows.
///
/// Rows are kept in insertion order. `authenticated` tells each operation
/// whether the caller presented a user token.
pub struct Tables {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl Tables {
    /// Creates empty tables for each declared name.
    pub fn new(declared: &BTreeMap<String, TablePolicy>) -> Self {
        let tables = declared
            .iter()
            .map(|(name, policy)| {
                (
                    name.clone(),
                    Table {
                        policy: *policy,
                        rows: Vec::new(),
                    },
                )
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Returns the number of rows in `table`.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.read().get(table).map(|t| t.rows.len())
    }

    /// Returns rows matching every filter, projected onto `columns`.
    ///
    /// `columns` is `*` or a comma-separated list of names.
    pub fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        authenticated: bool,
    ) -> HostResult<Vec<Row>> {
        let tables = self.tables.read();
        let t = checked(&tables, table, authenticated)?;

        let projection = parse_columns(columns);
        if let Some(names) = &projection {
            if let Some(unknown) = names.iter().find(|name| !t.has_column(name)) {
                return Err(HostError::UnknownColumn {
                    table: table.to_string(),
                    column: unknown.to_string(),
                });
            }
        }

        Ok(t.matching(filters)
            .map(|row| match &projection {
                None => row.clone(),
                Some(names) => names
                    .iter()
                    .map(|name| {
                        let value = row.get(*name).cloned().unwrap_or(Value::Null);
                        (name.to_string(), value)
                    })
                    .collect(),
            })
            .collect())
    }

    /// Appends rows, assigning an `id` to those without one.
    pub fn insert(&self, table: &str, rows: Vec<Row>, authenticated: bool) -> HostResult<Vec<Row>> {
        let mut tables = self.tables.write();
        let t = checked_mut(&mut tables, table, authenticated)?;

        let inserted: Vec<Row> = rows
            .into_iter()
            .map(|mut row| {
                row.entry(ID_COLUMN)
                    .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                row
            })
            .collect();
        t.rows.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    /// Merges `patch` into every matching row and returns the updated rows.
    pub fn update(
        &self,
        table: &str,
        patch: &Row,
        filters: &[Filter],
        authenticated: bool,
    ) -> HostResult<Vec<Row>> {
        let mut tables = self.tables.write();
        let t = checked_mut(&mut tables, table, authenticated)?;

        let mut updated = Vec::new();
        for row in t
            .rows
            .iter_mut()
            .filter(|row| matches_all(filters, row))
        {
            for (column, value) in patch {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    /// Removes every matching row and returns the removed rows.
    pub fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        authenticated: bool,
    ) -> HostResult<Vec<Row>> {
        let mut tables = self.tables.write();
        let t = checked_mut(&mut tables, table, authenticated)?;

        let (removed, kept): (Vec<Row>, Vec<Row>) = t
            .rows
            .drain(..)
            .partition(|row| matches_all(filters, row));
        t.rows = kept;
        Ok(removed)
    }
}

/// Compares values by their query-string text, so a filter that arrived
/// over HTTP as `price=eq.10` matches the number `10`.
fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|f| {
        row.get(&f.column)
            .is_some_and(|value| f.matches(row) || value_text(value) == f.value_text())
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn checked<'a>(
    tables: &'a BTreeMap<String, Table>,
    name: &str,
    authenticated: bool,
) -> HostResult<&'a Table> {
    let table = tables
        .get(name)
        .ok_or_else(|| HostError::UnknownTable(name.to_string()))?;
    if table.policy.require_auth && !authenticated {
        return Err(HostError::PolicyViolation(name.to_string()));
    }
    Ok(table)
}

fn checked_mut<'a>(
    tables: &'a mut BTreeMap<String, Table>,
    name: &str,
    authenticated: bool,
) -> HostResult<&'a mut Table> {
    let table = tables
        .get_mut(name)
        .ok_or_else(|| HostError::UnknownTable(name.to_string()))?;
    if table.policy.require_auth && !authenticated {
        return Err(HostError::PolicyViolation(name.to_string()));
    }
    Ok(table)
}

/// `None` selects every column.
fn parse_columns(columns: &str) -> Option<Vec<&str>> {
    let columns = columns.trim();
    if columns.is_empty() || columns == ALL_COLUMNS {
        return None;
    }
    Some(
        columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn tables() -> Tables {
        let mut declared = BTreeMap::new();
        declared.insert("listings".to_string(), TablePolicy::default());
        declared.insert("leads".to_string(), TablePolicy { require_auth: true });
        Tables::new(&declared)
    }

    #[test]
    fn insert_assigns_ids() {
        let tables = tables();
        let inserted = tables
            .insert(
                "listings",
                vec![row(json!({"city": "Austin"})), row(json!({"id": "fixed"}))],
                false,
            )
            .unwrap();

        assert!(inserted[0]["id"].is_string());
        assert_eq!(inserted[1]["id"], "fixed");
        assert_eq!(tables.row_count("listings"), Some(2));
    }

    #[test]
    fn select_projects_and_filters() {
        let tables = tables();
        tables
            .insert(
                "listings",
                vec![
                    row(json!({"id": "1", "city": "Austin", "price": 10})),
                    row(json!({"id": "2", "city": "Dallas", "price": 20})),
                ],
                false,
            )
            .unwrap();

        let rows = tables
            .select("listings", "id, price", &[Filter::eq("city", "Dallas")], false)
            .unwrap();
        assert_eq!(rows, vec![row(json!({"id": "2", "price": 20}))]);

        let all = tables.select("listings", "*", &[], false).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["city"], "Austin");
    }

    #[test]
    fn unknown_table_and_column() {
        let tables = tables();
        assert_eq!(
            tables.select("nope", "*", &[], false).unwrap_err(),
            HostError::UnknownTable("nope".into())
        );

        tables
            .insert("listings", vec![row(json!({"city": "Austin"}))], false)
            .unwrap();
        assert!(matches!(
            tables.select("listings", "city,colour", &[], false),
            Err(HostError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn policy_requires_authentication() {
        let tables = tables();
        assert_eq!(
            tables.insert("leads", vec![Row::new()], false).unwrap_err(),
            HostError::PolicyViolation("leads".into())
        );
        assert!(tables.insert("leads", vec![Row::new()], true).is_ok());
        assert!(tables.select("leads", "*", &[], false).is_err());
    }

    #[test]
    fn update_merges_matching_rows() {
        let tables = tables();
        tables
            .insert(
                "listings",
                vec![
                    row(json!({"id": "1", "status": "open"})),
                    row(json!({"id": "2", "status": "open"})),
                ],
                false,
            )
            .unwrap();

        let updated = tables
            .update(
                "listings",
                &row(json!({"status": "sold", "buyer": "ann"})),
                &[Filter::eq("id", "2")],
                false,
            )
            .unwrap();
        assert_eq!(updated, vec![row(json!({"id": "2", "status": "sold", "buyer": "ann"}))]);

        let first = tables
            .select("listings", "status", &[Filter::eq("id", "1")], false)
            .unwrap();
        assert_eq!(first[0]["status"], "open");
    }

    #[test]
    fn text_filters_match_typed_values() {
        let tables = tables();
        tables
            .insert(
                "listings",
                vec![row(json!({"id": 1, "price": 10})), row(json!({"id": 2, "price": 20}))],
                false,
            )
            .unwrap();

        let typed = tables
            .select("listings", "id", &[Filter::eq("price", 20)], false)
            .unwrap();
        let text = tables
            .select("listings", "id", &[Filter::eq("price", "20")], false)
            .unwrap();
        assert_eq!(typed, text);
        assert_eq!(typed, vec![row(json!({"id": 2}))]);
    }

    #[test]
    fn delete_returns_removed_rows() {
        let tables = tables();
        tables
            .insert(
                "listings",
                vec![
                    row(json!({"id": "1"})),
                    row(json!({"id": "2"})),
                    row(json!({"id": "3"})),
                ],
                false,
            )
            .unwrap();

        let removed = tables
            .delete("listings", &[Filter::eq("id", "2")], false)
            .unwrap();
        assert_eq!(removed.len(), 1);

        let ids: Vec<_> = tables
            .select("listings", "id", &[], false)
            .unwrap()
            .into_iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("1"), json!("3")]);

        assert_eq!(tables.delete("listings", &[], false).unwrap().len(), 2);
        assert_eq!(tables.row_count("listings"), Some(0));
    }
}
