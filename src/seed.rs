//! Reference data written at install time.
//!
//! Every row is inserted with `ON CONFLICT DO NOTHING` on its natural key, so
//! seeding twice leaves the tables unchanged.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};
use serde::Serialize;
use tracing::info;

use crate::entities::common::Component;
use crate::entities::tag::HAS_ERROR_NICK;
use crate::entities::wizard::WizardStatus;
use crate::entities::{config, marketplace, tag, wizard};

/// Default store configuration: `(group, key, value)`.
pub const DEFAULT_CONFIG: &[(&str, &str, Option<&str>)] = &[
    ("/", "is_disabled", Some("0")),
    ("/", "environment", Some("production")),
    ("/maintenance/", "mode", Some("0")),
    ("/component/ebay/", "mode", Some("1")),
    ("/component/amazon/", "mode", Some("1")),
    ("/component/walmart/", "mode", Some("1")),
    ("/cron/", "mode", Some("1")),
    ("/cron/", "runner", Some("magento")),
    ("/cron/", "last_access", None),
    ("/cron/", "last_runner_change", None),
    ("/cron/service/", "auth_key", None),
    ("/logs/clearing/listings/", "mode", Some("1")),
    ("/logs/clearing/listings/", "days", Some("30")),
    ("/logs/clearing/orders/", "mode", Some("1")),
    ("/logs/clearing/orders/", "days", Some("90")),
    ("/logs/clearing/synchronizations/", "mode", Some("1")),
    ("/logs/clearing/synchronizations/", "days", Some("30")),
    ("/logs/clearing/system/", "mode", Some("1")),
    ("/logs/clearing/system/", "days", Some("30")),
    ("/logs/listings/", "last_action_id", Some("0")),
    ("/logs/grouped/", "max_records_count", Some("100000")),
    ("/listing/product/inspector/", "mode", Some("0")),
    ("/listing/product/inspector/", "max_allowed_instructions_count", Some("2000")),
    ("/listing/product/instructions/cron/", "listings_products_per_one_time", Some("1000")),
    ("/listing/product/action/scheduled_data/", "limit", Some("20000")),
    ("/order/magento/settings/", "create_with_first_product_options_when_variation_unavailable", Some("1")),
    ("/server/", "application_key", None),
    ("/server/location/1/", "baseurl", Some("https://s1.m2epro.com/")),
    ("/server/location/", "default_index", Some("1")),
    ("/license/", "key", None),
    ("/license/domain/", "valid", None),
    ("/license/ip/", "valid", None),
    ("/general/configuration/", "view_show_block_notices_mode", Some("1")),
    ("/general/configuration/", "view_products_grid_use_alternative_mysql_select_mode", Some("0")),
    ("/general/configuration/", "other_pay_pal_url", Some("paypal.com/cgi-bin/webscr/")),
    ("/general/configuration/", "product_index_mode", Some("1")),
    ("/general/configuration/", "qty_percentage_rounding_greater", Some("0")),
    ("/support/", "documentation_url", Some("https://docs-m2.m2epro.com/")),
    ("/support/", "clients_portal_url", Some("https://clients.m2epro.com/")),
    ("/support/", "contact_email", Some("support@m2epro.com")),
    ("/ebay/configuration/", "sell_on_another_marketplace_tutorial_shown", Some("0")),
    ("/ebay/configuration/", "prevent_item_duplicates_mode", Some("1")),
    ("/ebay/configuration/", "upload_images_mode", Some("2")),
    ("/ebay/configuration/", "feedback_notification_mode", Some("0")),
    ("/amazon/configuration/", "business_mode", Some("0")),
    ("/amazon/configuration/", "worldwide_id_mode", Some("0")),
    ("/amazon/listing/product/action/processing/prepare/", "max_listings_products_count", Some("2000")),
    ("/walmart/configuration/", "sku_mode", Some("1")),
    ("/walmart/configuration/", "upc_mode", Some("0")),
    ("/walmart/listing/product/action/scheduled_data/", "limit", Some("20000")),
];

/// One marketplace row as seeded.
#[derive(Debug, Clone, Copy)]
pub struct MarketplaceSeed {
    pub id: i32,
    pub native_id: &'static str,
    pub title: &'static str,
    pub code: &'static str,
    pub url: &'static str,
    pub group_title: &'static str,
    pub component: Component,
    pub currency: &'static str,
    pub is_vat: bool,
    pub is_tax_table: bool,
    pub is_variations: bool,
    pub is_metric_measurement: bool,
}

const fn ebay(
    id: i32,
    native_id: &'static str,
    title: &'static str,
    code: &'static str,
    url: &'static str,
    group_title: &'static str,
    currency: &'static str,
    is_vat: bool,
    is_metric_measurement: bool,
) -> MarketplaceSeed {
    MarketplaceSeed {
        id,
        native_id,
        title,
        code,
        url,
        group_title,
        component: Component::Ebay,
        currency,
        is_vat,
        is_tax_table: !is_vat,
        is_variations: true,
        is_metric_measurement,
    }
}

const fn amazon(
    id: i32,
    native_id: &'static str,
    title: &'static str,
    code: &'static str,
    url: &'static str,
    group_title: &'static str,
    currency: &'static str,
) -> MarketplaceSeed {
    MarketplaceSeed {
        id,
        native_id,
        title,
        code,
        url,
        group_title,
        component: Component::Amazon,
        currency,
        is_vat: false,
        is_tax_table: false,
        is_variations: true,
        is_metric_measurement: true,
    }
}

/// eBay keeps its historical numbering (1 = United States, 8 = Germany).
pub const MARKETPLACES: &[MarketplaceSeed] = &[
    ebay(1, "0", "United States", "US", "ebay.com", "America", "USD", false, false),
    ebay(2, "2", "Canada", "Canada", "ebay.ca", "America", "CAD", false, true),
    ebay(3, "3", "United Kingdom", "UK", "ebay.co.uk", "Europe", "GBP", true, true),
    ebay(4, "15", "Australia", "Australia", "ebay.com.au", "Australia Region", "AUD", false, true),
    ebay(5, "16", "Austria", "Austria", "ebay.at", "Europe", "EUR", true, true),
    ebay(6, "23", "Belgium (French)", "Belgium_French", "befr.ebay.be", "Europe", "EUR", true, true),
    ebay(7, "71", "France", "France", "ebay.fr", "Europe", "EUR", true, true),
    ebay(8, "77", "Germany", "Germany", "ebay.de", "Europe", "EUR", true, true),
    ebay(9, "100", "eBay Motors", "eBayMotors", "ebay.com/motors", "Other", "USD", false, false),
    ebay(10, "101", "Italy", "Italy", "ebay.it", "Europe", "EUR", true, true),
    ebay(11, "123", "Belgium (Dutch)", "Belgium_Dutch", "benl.ebay.be", "Europe", "EUR", true, true),
    ebay(12, "146", "Netherlands", "Netherlands", "ebay.nl", "Europe", "EUR", true, true),
    ebay(13, "186", "Spain", "Spain", "ebay.es", "Europe", "EUR", true, true),
    ebay(14, "193", "Switzerland", "Switzerland", "ebay.ch", "Europe", "CHF", true, true),
    ebay(15, "201", "Hong Kong", "HongKong", "ebay.com.hk", "Asia / Pacific", "HKD", false, true),
    ebay(16, "203", "India", "India", "ebay.in", "Asia / Pacific", "INR", false, true),
    ebay(17, "205", "Ireland", "Ireland", "ebay.ie", "Europe", "EUR", true, true),
    ebay(18, "207", "Malaysia", "Malaysia", "ebay.com.my", "Asia / Pacific", "MYR", false, true),
    ebay(19, "210", "Canada (French)", "CanadaFrench", "cafr.ebay.ca", "America", "CAD", false, true),
    ebay(20, "211", "Philippines", "Philippines", "ebay.ph", "Asia / Pacific", "PHP", false, true),
    ebay(21, "212", "Poland", "Poland", "ebay.pl", "Europe", "PLN", true, true),
    ebay(22, "216", "Singapore", "Singapore", "ebay.com.sg", "Asia / Pacific", "SGD", false, true),
    amazon(24, "A2EUQ1WTGCTBG2", "Canada", "CA", "amazon.ca", "America", "CAD"),
    amazon(25, "A1PA6795UKMFR9", "Germany", "DE", "amazon.de", "Europe", "EUR"),
    amazon(26, "A13V1IB3VIYZZH", "France", "FR", "amazon.fr", "Europe", "EUR"),
    amazon(28, "A1F83G8C2ARO7P", "United Kingdom", "UK", "amazon.co.uk", "Europe", "GBP"),
    amazon(29, "ATVPDKIKX0DER", "United States", "US", "amazon.com", "America", "USD"),
    amazon(30, "A1RKKUPIHCS9HS", "Spain", "ES", "amazon.es", "Europe", "EUR"),
    amazon(31, "APJ6JRA9NG5V4", "Italy", "IT", "amazon.it", "Europe", "EUR"),
    amazon(34, "A1AM78C64UM0Y8", "Mexico", "MX", "amazon.com.mx", "America", "MXN"),
    amazon(35, "A39IBJ37TRP1C6", "Australia", "AU", "amazon.com.au", "Asia / Pacific", "AUD"),
    amazon(39, "A1805IZSGTT6HS", "Netherlands", "NL", "amazon.nl", "Europe", "EUR"),
    amazon(40, "A33AVAJ2PDY3EV", "Turkey", "TR", "amazon.com.tr", "Europe", "TRY"),
    amazon(41, "A2NODRKZP88ZB9", "Sweden", "SE", "amazon.se", "Europe", "SEK"),
    amazon(42, "A1VC38T7YXB528", "Japan", "JP", "amazon.co.jp", "Asia / Pacific", "JPY"),
    amazon(43, "A1C3SOZRARQ6R3", "Poland", "PL", "amazon.pl", "Europe", "PLN"),
    amazon(44, "A2Q3Y263D00KWC", "Brazil", "BR", "amazon.com.br", "America", "BRL"),
    amazon(45, "A19VAU5U5O7RUS", "Singapore", "SG", "amazon.sg", "Asia / Pacific", "SGD"),
    amazon(46, "A21TJRUUN4KGV", "India", "IN", "amazon.in", "Asia / Pacific", "INR"),
    amazon(47, "A2VIGQ35RCS4UG", "United Arab Emirates", "AE", "amazon.ae", "Asia / Pacific", "AED"),
    amazon(48, "AMEN7PMS3EDWL", "Belgium", "BE", "amazon.com.be", "Europe", "EUR"),
    amazon(49, "A17E79C6D8DWNP", "Saudi Arabia", "SA", "amazon.sa", "Asia / Pacific", "SAR"),
    amazon(50, "A28R8C7NBKEWEA", "Ireland", "IE", "amazon.ie", "Europe", "EUR"),
    MarketplaceSeed {
        id: 37,
        native_id: "US",
        title: "United States",
        code: "US",
        url: "walmart.com",
        group_title: "America",
        component: Component::Walmart,
        currency: "USD",
        is_vat: false,
        is_tax_table: false,
        is_variations: true,
        is_metric_measurement: false,
    },
    MarketplaceSeed {
        id: 38,
        native_id: "CA",
        title: "Canada",
        code: "CA",
        url: "walmart.ca",
        group_title: "America",
        component: Component::Walmart,
        currency: "CAD",
        is_vat: false,
        is_tax_table: false,
        is_variations: true,
        is_metric_measurement: true,
    },
];

/// Wizards: `(nick, view, status, type, priority)`.
const WIZARDS: &[(&str, &str, WizardStatus, i32, i32)] = &[
    ("installationEbay", "ebay", WizardStatus::NotStarted, 1, 1),
    ("installationAmazon", "amazon", WizardStatus::NotStarted, 1, 2),
    ("installationWalmart", "walmart", WizardStatus::NotStarted, 1, 3),
    ("migrationFromMagento1", "*", WizardStatus::NotStarted, 1, 4),
    ("migrationToInnodb", "*", WizardStatus::Completed, 1, 5),
];

/// Static tags: `(nick, error_code, text)`.
const TAGS: &[(&str, &str, &str)] = &[(HAS_ERROR_NICK, "has_error", "Has error")];

/// Inserted row counts of one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub marketplaces: u64,
    pub config: u64,
    pub wizards: u64,
    pub tags: u64,
}

impl SeedReport {
    pub fn total(&self) -> u64 {
        self.marketplaces + self.config + self.wizards + self.tags
    }
}

fn inserted(result: Result<u64, DbErr>) -> Result<u64, DbErr> {
    match result {
        Ok(rows) => Ok(rows),
        Err(DbErr::RecordNotInserted) => Ok(0),
        Err(e) => Err(e),
    }
}

pub async fn seed_all<C: ConnectionTrait>(db: &C) -> Result<SeedReport, DbErr> {
    let report = SeedReport {
        marketplaces: seed_marketplaces(db).await?,
        config: seed_config(db).await?,
        wizards: seed_wizards(db).await?,
        tags: seed_tags(db).await?,
    };

    if report.total() > 0 {
        info!(
            marketplaces = report.marketplaces,
            config = report.config,
            wizards = report.wizards,
            tags = report.tags,
            "Seeded reference data"
        );
    } else {
        info!("Reference data already present");
    }
    Ok(report)
}

pub async fn seed_marketplaces<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let now = Utc::now();
    let mut count = 0;

    for (sorder, seed) in MARKETPLACES.iter().enumerate() {
        let model = marketplace::ActiveModel {
            id: Set(seed.id),
            native_id: Set(seed.native_id.to_string()),
            title: Set(seed.title.to_string()),
            code: Set(seed.code.to_string()),
            url: Set(seed.url.to_string()),
            is_enabled: Set(false),
            sorder: Set(sorder as i32 + 1),
            group_title: Set(seed.group_title.to_string()),
            component: Set(seed.component),
            currency: Set(seed.currency.to_string()),
            is_vat: Set(seed.is_vat),
            is_tax_table: Set(seed.is_tax_table),
            is_variations: Set(seed.is_variations),
            is_metric_measurement: Set(seed.is_metric_measurement),
            update_date: Set(now),
            create_date: Set(now),
        };

        count += inserted(
            marketplace::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(marketplace::Column::Id)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await,
        )?;
    }
    Ok(count)
}

pub async fn seed_config<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let now = Utc::now();
    let mut count = 0;

    for (group, key, value) in DEFAULT_CONFIG {
        let model = config::ActiveModel {
            group: Set(group.to_string()),
            key: Set(key.to_string()),
            value: Set(value.map(str::to_string)),
            update_date: Set(now),
            create_date: Set(now),
            ..Default::default()
        };

        count += inserted(
            config::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([config::Column::Group, config::Column::Key])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await,
        )?;
    }
    Ok(count)
}

pub async fn seed_wizards<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let mut count = 0;

    for (nick, view, status, wizard_type, priority) in WIZARDS {
        let model = wizard::ActiveModel {
            nick: Set(nick.to_string()),
            view: Set(view.to_string()),
            status: Set(*status),
            step: Set(None),
            wizard_type: Set(*wizard_type),
            priority: Set(*priority),
            ..Default::default()
        };

        count += inserted(
            wizard::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(wizard::Column::Nick)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await,
        )?;
    }
    Ok(count)
}

pub async fn seed_tags<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let now = Utc::now();
    let mut count = 0;

    for (nick, error_code, text) in TAGS {
        let model = tag::ActiveModel {
            nick: Set(nick.to_string()),
            error_code: Set(error_code.to_string()),
            text: Set(text.to_string()),
            create_date: Set(now),
            ..Default::default()
        };

        count += inserted(
            tag::Entity::insert(model)
                .on_conflict(OnConflict::column(tag::Column::Nick).do_nothing().to_owned())
                .exec_without_returning(db)
                .await,
        )?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn marketplace_ids_and_native_ids_are_unique() {
        let ids: HashSet<i32> = MARKETPLACES.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), MARKETPLACES.len());

        let natives: HashSet<(Component, &str)> = MARKETPLACES
            .iter()
            .map(|m| (m.component, m.native_id))
            .collect();
        assert_eq!(natives.len(), MARKETPLACES.len());
    }

    #[test]
    fn ebay_germany_keeps_its_id() {
        let germany = MARKETPLACES.iter().find(|m| m.id == 8).unwrap();
        assert_eq!(germany.component, Component::Ebay);
        assert_eq!(germany.native_id, "77");
        assert_eq!(germany.currency, "EUR");
    }

    #[test]
    fn default_config_paths_are_canonical() {
        use crate::repositories::config_repository::normalize_path;
        let mut seen = HashSet::new();
        for (group, key, _) in DEFAULT_CONFIG {
            assert_eq!(normalize_path(group), *group);
            assert_eq!(key.to_lowercase(), *key);
            assert!(seen.insert((*group, *key)), "duplicate {}{}", group, key);
        }
    }
}
