//! Version-gated schema migrations.
//!
//! Each migration is applied once and recorded in `m2epro_migrations`. Only
//! the two bootstrap migrations tolerate existing tables, since the installer
//! creates them before the migrator runs. Any other leftover `m2epro_` table
//! makes its migration fail.

use sea_orm_migration::prelude::*;

pub mod m20240101_000001_create_setup_table;
pub mod m20240101_000002_create_config_tables;
mod m20240101_000003_create_marketplace_tables;
mod m20240101_000004_create_listing_tables;
mod m20240101_000005_create_action_queue_tables;
mod m20240101_000006_create_processing_tables;
mod m20240101_000007_create_order_tables;
mod m20240101_000008_create_log_tables;

/// Name of the migration bookkeeping table. Carries the module prefix so a
/// reinstall drops it together with everything else.
pub const MIGRATION_TABLE: &str = "m2epro_migrations";

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_setup_table::Migration),
            Box::new(m20240101_000002_create_config_tables::Migration),
            Box::new(m20240101_000003_create_marketplace_tables::Migration),
            Box::new(m20240101_000004_create_listing_tables::Migration),
            Box::new(m20240101_000005_create_action_queue_tables::Migration),
            Box::new(m20240101_000006_create_processing_tables::Migration),
            Box::new(m20240101_000007_create_order_tables::Migration),
            Box::new(m20240101_000008_create_log_tables::Migration),
        ]
    }

    fn migration_table_name() -> DynIden {
        Alias::new(MIGRATION_TABLE).into_iden()
    }
}

/// Creates the tables the installer needs before anything else runs: the
/// setup record and the config store holding the maintenance flag.
pub async fn bootstrap(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    m20240101_000001_create_setup_table::Migration.up(manager).await?;
    m20240101_000002_create_config_tables::Migration.up(manager).await
}

pub(crate) fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

pub(crate) fn date_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

pub(crate) fn flag_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(false)
        .to_owned()
}

pub(crate) fn index_on<T, C>(name: &str, table: T, cols: C, unique: bool) -> IndexCreateStatement
where
    T: IntoIden + 'static,
    C: IntoIterator,
    C::Item: IntoIndexColumn,
{
    let mut index = Index::create();
    index.name(name).table(table);
    for col in cols {
        index.col(col);
    }
    if unique {
        index.unique();
    }
    index.to_owned()
}
