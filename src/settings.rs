//! Typed view over the recognised config-store options.
//!
//! Loaded once with [`StoreSettings::load`]; callers pass the struct around
//! instead of looking up paths at runtime.

use chrono::Duration;
use serde::Serialize;
use std::collections::HashMap;

use crate::entities::Component;
use crate::errors::{AppError, ServiceError};
use crate::repositories::config_repository::{normalize_key, normalize_path};
use crate::repositories::ConfigRepository;
use crate::seed::DEFAULT_CONFIG;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSettings {
    pub ebay: bool,
    pub amazon: bool,
    pub walmart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CronSettings {
    pub enabled: bool,
    pub runner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    pub enabled: bool,
    pub days: u32,
}

impl RetentionPolicy {
    /// Age past which rows may be pruned, if pruning is enabled.
    pub fn max_age(&self) -> Option<Duration> {
        self.enabled.then(|| Duration::days(i64::from(self.days)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogsClearingSettings {
    pub listings: RetentionPolicy,
    pub orders: RetentionPolicy,
    pub synchronizations: RetentionPolicy,
    pub system: RetentionPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingSettings {
    pub inspector_enabled: bool,
    pub max_allowed_instructions_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSettings {
    pub create_with_first_product_options_when_variation_unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSettings {
    pub components: ComponentSettings,
    pub cron: CronSettings,
    pub logs_clearing: LogsClearingSettings,
    pub listing: ListingSettings,
    pub order: OrderSettings,
}

impl StoreSettings {
    pub async fn load(repo: &ConfigRepository) -> Result<Self, AppError> {
        let values = repo.all().await?;
        Self::from_values(&values)
    }

    /// Builds settings from a `(group, key) -> value` snapshot.
    pub fn from_values(values: &HashMap<(String, String), Option<String>>) -> Result<Self, AppError> {
        let lookup = Lookup { values };

        Ok(Self {
            components: ComponentSettings {
                ebay: lookup.flag("/component/ebay/", "mode")?,
                amazon: lookup.flag("/component/amazon/", "mode")?,
                walmart: lookup.flag("/component/walmart/", "mode")?,
            },
            cron: CronSettings {
                enabled: lookup.flag("/cron/", "mode")?,
                runner: lookup.text("/cron/", "runner"),
            },
            logs_clearing: LogsClearingSettings {
                listings: lookup.retention("listings")?,
                orders: lookup.retention("orders")?,
                synchronizations: lookup.retention("synchronizations")?,
                system: lookup.retention("system")?,
            },
            listing: ListingSettings {
                inspector_enabled: lookup.flag("/listing/product/inspector/", "mode")?,
                max_allowed_instructions_count: lookup
                    .number("/listing/product/inspector/", "max_allowed_instructions_count")?,
            },
            order: OrderSettings {
                create_with_first_product_options_when_variation_unavailable: lookup.flag(
                    "/order/magento/settings/",
                    "create_with_first_product_options_when_variation_unavailable",
                )?,
            },
        })
    }

    pub fn component_enabled(&self, component: Component) -> bool {
        match component {
            Component::Ebay => self.components.ebay,
            Component::Amazon => self.components.amazon,
            Component::Walmart => self.components.walmart,
        }
    }
}

struct Lookup<'a> {
    values: &'a HashMap<(String, String), Option<String>>,
}

impl Lookup<'_> {
    fn raw(&self, path: &str, key: &str) -> Option<String> {
        let group = normalize_path(path);
        let key = normalize_key(key).unwrap_or_default();
        self.values
            .get(&(group.clone(), key.clone()))
            .cloned()
            .flatten()
            .or_else(|| default_value(&group, &key))
    }

    fn text(&self, path: &str, key: &str) -> String {
        self.raw(path, key).unwrap_or_default()
    }

    fn flag(&self, path: &str, key: &str) -> Result<bool, ServiceError> {
        match self.raw(path, key).as_deref().map(str::trim) {
            None | Some("") | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(malformed(path, key, v)),
        }
    }

    fn number(&self, path: &str, key: &str) -> Result<u32, ServiceError> {
        match self.raw(path, key) {
            None => Ok(0),
            Some(v) => v.trim().parse().map_err(|_| malformed(path, key, &v)),
        }
    }

    fn retention(&self, kind: &str) -> Result<RetentionPolicy, ServiceError> {
        let path = format!("/logs/clearing/{}/", kind);
        Ok(RetentionPolicy {
            enabled: self.flag(&path, "mode")?,
            days: self.number(&path, "days")?,
        })
    }
}

fn default_value(group: &str, key: &str) -> Option<String> {
    DEFAULT_CONFIG
        .iter()
        .find(|(g, k, _)| *g == group && *k == key)
        .and_then(|(_, _, v)| v.map(str::to_string))
}

fn malformed(path: &str, key: &str, value: &str) -> ServiceError {
    ServiceError::ConfigError(format!(
        "{}{} has malformed value '{}'",
        normalize_path(path),
        key,
        value
    ))
}
