//! Table commands.

use super::{parse_filters, parse_rows, print_rows, CliError, CommandResult, Format};
use hostlink_core::{BackendFacade, BackendService};
use std::io::Write;

/// Prints matching rows.
pub async fn select<S: BackendService>(
    facade: &BackendFacade<S>,
    table: &str,
    columns: &str,
    filters: &[String],
    format: Format,
    out: &mut impl Write,
) -> CommandResult {
    let filters = parse_filters(filters)?;
    let rows = facade.select_where(table, columns, &filters).await?;
    print_rows(out, &rows, format)
}

/// Inserts rows and prints them as stored.
pub async fn insert<S: BackendService>(
    facade: &BackendFacade<S>,
    table: &str,
    json: &str,
    out: &mut impl Write,
) -> CommandResult {
    let rows = parse_rows(json)?;
    let inserted = facade.insert_many(table, rows).await?;
    print_rows(out, &inserted, Format::Text)
}

/// Patches matching rows and prints the updated rows.
pub async fn update<S: BackendService>(
    facade: &BackendFacade<S>,
    table: &str,
    json: &str,
    filters: &[String],
    out: &mut impl Write,
) -> CommandResult {
    let mut rows = parse_rows(json)?;
    if rows.len() != 1 {
        return Err(CliError::InvalidRow("patch must be a single JSON object".into()).into());
    }
    let patch = rows.remove(0);
    let filters = parse_filters(filters)?;
    let updated = facade.update_where(table, patch, &filters).await?;
    print_rows(out, &updated, Format::Text)
}

/// Deletes matching rows and prints them.
pub async fn delete<S: BackendService>(
    facade: &BackendFacade<S>,
    table: &str,
    filters: &[String],
    out: &mut impl Write,
) -> CommandResult {
    let filters = parse_filters(filters)?;
    let removed = facade.delete_where(table, &filters).await?;
    print_rows(out, &removed, Format::Text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_testkit::{TestBackend, OPEN_TABLE, PROTECTED_TABLE};

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn insert_select_update_delete() {
        let backend = TestBackend::new();
        let facade = backend.http_facade();

        let mut out = Vec::new();
        insert(
            &facade,
            OPEN_TABLE,
            r#"[{"id":"1","city":"Austin","price":10},{"id":"2","city":"Dallas","price":20}]"#,
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(output(out).lines().count(), 2);

        let mut out = Vec::new();
        select(
            &facade,
            OPEN_TABLE,
            "city",
            &["price=20".to_string()],
            Format::Text,
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(output(out), "{\"city\":\"Dallas\"}\n");

        let mut out = Vec::new();
        update(
            &facade,
            OPEN_TABLE,
            r#"{"price":25}"#,
            &["id=2".to_string()],
            &mut out,
        )
        .await
        .unwrap();
        assert!(output(out).contains("\"price\":25"));

        let mut out = Vec::new();
        delete(&facade, OPEN_TABLE, &["city=Austin".to_string()], &mut out)
            .await
            .unwrap();
        assert!(output(out).contains("Austin"));
        assert_eq!(backend.service.tables().row_count(OPEN_TABLE), Some(1));
    }

    #[tokio::test]
    async fn patch_must_be_one_object() {
        let backend = TestBackend::new();
        let facade = backend.http_facade();
        let err = update(&facade, OPEN_TABLE, r#"[{"a":1},{"a":2}]"#, &[], &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("single JSON object"));
    }

    #[tokio::test]
    async fn anonymous_insert_into_protected_table_fails() {
        let backend = TestBackend::new();
        let facade = backend.http_facade();
        let err = insert(&facade, PROTECTED_TABLE, r#"{"name":"x"}"#, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("row-level security"));
    }
}
