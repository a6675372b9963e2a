use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::config::{self, ActiveModel, Column, Entity as Config};
use crate::errors::{conflict_or_db, AppError, ServiceError};
use crate::repositories::Repository;

use super::BaseRepository;

const MAX_INCREMENT_RETRIES: usize = 16;

/// Path/key configuration store.
///
/// Paths are normalised to `/a/b/`, keys are trimmed and lower-cased, so
/// `"component/ebay"` and `"/Component/eBay/"` address the same group.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    base: BaseRepository,
}

impl ConfigRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Plain insert. A second insert of the same `(path, key)` is a conflict.
    pub async fn insert(&self, path: &str, key: &str, value: Option<&str>) -> Result<(), AppError> {
        let group = normalize_path(path);
        let key = normalize_key(key)?;
        let now = Utc::now();

        let model = ActiveModel {
            group: Set(group.clone()),
            key: Set(key.clone()),
            value: Set(value.map(str::to_string)),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        Config::insert(model)
            .exec(self.base.get_db())
            .await
            .map_err(|e| conflict_or_db(e, || format!("config {}{} already exists", group, key)))?;

        debug!(group = %group, key = %key, "Config value inserted");
        Ok(())
    }

    /// Inserts or replaces the value at `(path, key)`.
    pub async fn set(&self, path: &str, key: &str, value: Option<&str>) -> Result<(), AppError> {
        let group = normalize_path(path);
        let key = normalize_key(key)?;
        let now = Utc::now();

        let model = ActiveModel {
            group: Set(group),
            key: Set(key),
            value: Set(value.map(str::to_string)),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        Config::insert(model)
            .on_conflict(
                OnConflict::columns([Column::Group, Column::Key])
                    .update_columns([Column::Value, Column::UpdateDate])
                    .to_owned(),
            )
            .exec_without_returning(self.base.get_db())
            .await?;
        Ok(())
    }

    /// Inserts the value only when `(path, key)` is unset. Returns whether a row was written.
    pub async fn insert_if_absent(
        &self,
        path: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<bool, AppError> {
        let group = normalize_path(path);
        let key = normalize_key(key)?;
        let now = Utc::now();

        let model = ActiveModel {
            group: Set(group),
            key: Set(key),
            value: Set(value.map(str::to_string)),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        let result = Config::insert(model)
            .on_conflict(
                OnConflict::columns([Column::Group, Column::Key])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.base.get_db())
            .await;

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(ServiceError::db_error(e)),
        }
    }

    async fn find_row(&self, group: &str, key: &str) -> Result<Option<config::Model>, AppError> {
        Config::find()
            .filter(Column::Group.eq(group))
            .filter(Column::Key.eq(key))
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Reads a value. An absent row and a NULL value are both `None`.
    pub async fn get(&self, path: &str, key: &str) -> Result<Option<String>, AppError> {
        let group = normalize_path(path);
        let key = normalize_key(key)?;
        Ok(self.find_row(&group, &key).await?.and_then(|row| row.value))
    }

    /// Every key under exactly `path`, ordered by key.
    pub async fn get_group(&self, path: &str) -> Result<Vec<(String, Option<String>)>, AppError> {
        let group = normalize_path(path);
        let rows = Config::find()
            .filter(Column::Group.eq(group))
            .order_by_asc(Column::Key)
            .all(self.base.get_db())
            .await?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    /// Snapshot of the whole store keyed by `(group, key)`.
    pub async fn all(&self) -> Result<HashMap<(String, String), Option<String>>, AppError> {
        let rows = Config::find().all(self.base.get_db()).await?;
        Ok(rows
            .into_iter()
            .map(|row| ((row.group, row.key), row.value))
            .collect())
    }

    pub async fn delete(&self, path: &str, key: &str) -> Result<bool, AppError> {
        let group = normalize_path(path);
        let key = normalize_key(key)?;
        let result = Config::delete_many()
            .filter(Column::Group.eq(group))
            .filter(Column::Key.eq(key))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Atomically increments an integer value and returns the new value.
    ///
    /// An unset key counts from zero. Each round is a compare-and-set on the
    /// previous value so concurrent callers never receive the same number.
    #[instrument(skip(self))]
    pub async fn increment(&self, path: &str, key: &str) -> Result<i64, AppError> {
        let group = normalize_path(path);
        let key = normalize_key(key)?;
        let db = self.base.get_db();

        for _ in 0..MAX_INCREMENT_RETRIES {
            let current = self.find_row(&group, &key).await?;
            match current {
                None => {
                    if self.insert_if_absent(&group, &key, Some("1")).await? {
                        return Ok(1);
                    }
                }
                Some(row) => {
                    let previous = parse_counter(row.value.as_deref(), &group, &key)?;
                    let next = previous + 1;

                    let mut update = Config::update_many()
                        .col_expr(Column::Value, next.to_string().into())
                        .col_expr(Column::UpdateDate, Utc::now().into())
                        .filter(Column::Id.eq(row.id));
                    update = match row.value {
                        Some(ref v) => update.filter(Column::Value.eq(v.clone())),
                        None => update.filter(Column::Value.is_null()),
                    };

                    if update.exec(db).await?.rows_affected == 1 {
                        return Ok(next);
                    }
                }
            }
        }

        Err(ServiceError::Conflict(format!(
            "counter {}{} is too contended",
            group, key
        )))
    }
}

impl Repository for ConfigRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

fn parse_counter(value: Option<&str>, group: &str, key: &str) -> Result<i64, ServiceError> {
    match value.map(str::trim) {
        None | Some("") => Ok(0),
        Some(v) => v.parse::<i64>().map_err(|_| {
            ServiceError::ConfigError(format!("{}{} holds a non-numeric value '{}'", group, key, v))
        }),
    }
}

/// Canonical form of a config path: lower-case segments wrapped in slashes.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

pub fn normalize_key(key: &str) -> Result<String, ServiceError> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(ServiceError::ValidationError(
            "config key must not be empty".to_string(),
        ));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("/component/ebay/", "/component/ebay/" ; "already canonical")]
    #[test_case("component/ebay", "/component/ebay/" ; "missing slashes")]
    #[test_case("//Component//eBay/", "/component/ebay/" ; "doubled slashes and case")]
    #[test_case(" / cron / ", "/cron/" ; "whitespace segments")]
    #[test_case("", "/" ; "root")]
    fn path_normalisation(input: &str, expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    #[test]
    fn keys_are_trimmed_and_lowercased() {
        assert_eq!(normalize_key("  Mode ").unwrap(), "mode");
        assert!(normalize_key("   ").is_err());
    }

    #[test]
    fn counter_parsing() {
        assert_eq!(parse_counter(None, "/a/", "b").unwrap(), 0);
        assert_eq!(parse_counter(Some("41"), "/a/", "b").unwrap(), 41);
        assert!(matches!(
            parse_counter(Some("x"), "/a/", "b"),
            Err(ServiceError::ConfigError(_))
        ));
    }
}
