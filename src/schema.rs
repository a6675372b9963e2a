//! Introspection helpers for the tables this crate owns.

use sea_orm::sea_query::{Alias, Table};
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use tracing::{info, warn};

use crate::config::TABLE_PREFIX;
use crate::errors::ServiceError;

fn list_tables_sql(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => {
            "SELECT CAST(table_name AS TEXT) AS name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'"
        }
        DbBackend::MySql => {
            "SELECT CAST(table_name AS CHAR) AS name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'"
        }
        DbBackend::Sqlite => {
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
        }
    }
}

/// Names of every table carrying the module prefix, sorted.
pub async fn list_prefixed_tables<C: ConnectionTrait>(db: &C) -> Result<Vec<String>, ServiceError> {
    let backend = db.get_database_backend();
    let rows = db
        .query_all(Statement::from_string(backend, list_tables_sql(backend)))
        .await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("", "name")?;
        if name.starts_with(TABLE_PREFIX) {
            tables.push(name);
        }
    }
    tables.sort();
    Ok(tables)
}

/// Drops every prefixed table, the migration bookkeeping table included.
///
/// Returns the dropped names. Tables outside the prefix are never touched.
pub async fn drop_prefixed_tables<C: ConnectionTrait>(db: &C) -> Result<Vec<String>, ServiceError> {
    let backend = db.get_database_backend();
    let tables = list_prefixed_tables(db).await?;

    if tables.is_empty() {
        info!("No prefixed tables to drop");
        return Ok(tables);
    }

    warn!(count = tables.len(), "Dropping prefixed tables");
    for name in &tables {
        let stmt = Table::drop()
            .table(Alias::new(name.as_str()))
            .if_exists()
            .to_owned();
        db.execute(backend.build(&stmt)).await?;
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::establish_connection;

    #[tokio::test]
    async fn drops_only_prefixed_tables() {
        let db = establish_connection("sqlite::memory:").await.unwrap();
        for sql in [
            "CREATE TABLE m2epro_a (id INTEGER PRIMARY KEY)",
            "CREATE TABLE m2epro_b (id INTEGER PRIMARY KEY)",
            "CREATE TABLE catalog_product (id INTEGER PRIMARY KEY)",
        ] {
            db.execute(Statement::from_string(DbBackend::Sqlite, sql))
                .await
                .unwrap();
        }

        assert_eq!(
            list_prefixed_tables(&db).await.unwrap(),
            vec!["m2epro_a".to_string(), "m2epro_b".to_string()]
        );

        let dropped = drop_prefixed_tables(&db).await.unwrap();
        assert_eq!(dropped.len(), 2);
        assert!(list_prefixed_tables(&db).await.unwrap().is_empty());

        let remaining = db
            .query_all(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type = 'table'",
            ))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
