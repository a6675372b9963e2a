#![allow(dead_code)]

use std::sync::Arc;

use m2e_store::{
    db,
    entities::{account, listing, listing_product, order, Component},
    installer::{InstallOptions, Installer},
    migrator::Migrator,
    repositories::{
        AccountRepository, ListingProductRepository, ListingRepository, NewAccount, NewListing,
        NewOrder, OrderRepository,
    },
};
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde_json::json;

/// eBay Germany as seeded.
pub const EBAY_GERMANY: i32 = 8;
/// eBay United States as seeded.
pub const EBAY_US: i32 = 1;
/// Amazon United States as seeded.
pub const AMAZON_US: i32 = 29;

/// In-memory store for one test.
pub struct TestStore {
    pub db: Arc<DatabaseConnection>,
}

impl TestStore {
    /// Empty database, nothing created.
    pub async fn empty() -> Self {
        let pool = db::establish_connection("sqlite::memory:")
            .await
            .expect("connect to in-memory sqlite");
        Self { db: Arc::new(pool) }
    }

    /// Schema applied, no reference data.
    pub async fn migrated() -> Self {
        let store = Self::empty().await;
        Migrator::up(store.db.as_ref(), None)
            .await
            .expect("apply migrations");
        store
    }

    /// Full install: schema, reference data and a completed setup record.
    pub async fn installed() -> Self {
        let store = Self::empty().await;
        store
            .installer()
            .install(InstallOptions::default())
            .await
            .expect("install");
        store
    }

    pub fn installer(&self) -> Installer {
        Installer::new(self.db.clone())
    }

    pub async fn ebay_account(&self, marketplace_id: i32) -> account::Model {
        AccountRepository::new(self.db.clone())
            .create(NewAccount {
                title: format!("ebay seller {}", marketplace_id),
                component: Component::Ebay,
                marketplace_id,
                server_hash: Some("srv-hash".to_string()),
                user_id: Some("seller".to_string()),
                credentials: json!({"token": "secret"}),
            })
            .await
            .expect("create account")
    }

    pub async fn listing_for(&self, account: &account::Model) -> listing::Model {
        ListingRepository::new(self.db.clone())
            .create(NewListing {
                account_id: account.id,
                marketplace_id: account.marketplace_id,
                title: "Default listing".to_string(),
                store_id: 1,
                templates: Default::default(),
                auto_mode: m2e_store::entities::listing::AutoMode::None,
            })
            .await
            .expect("create listing")
    }

    /// eBay Germany account with one listing.
    pub async fn listing(&self) -> listing::Model {
        let account = self.ebay_account(EBAY_GERMANY).await;
        self.listing_for(&account).await
    }

    pub async fn listing_product(&self, listing_id: i32, product_id: i32) -> listing_product::Model {
        ListingProductRepository::new(self.db.clone())
            .add_product(listing_id, product_id)
            .await
            .expect("add product")
            .listing_product()
            .clone()
    }

    pub async fn order(&self, account: &account::Model, channel_order_id: &str) -> order::Model {
        OrderRepository::new(self.db.clone())
            .upsert_from_channel(NewOrder {
                account_id: account.id,
                channel_order_id: channel_order_id.to_string(),
                store_id: Some(1),
                buyer_name: Some("Erika Mustermann".to_string()),
                buyer_email: Some("erika@example.com".to_string()),
                currency: "EUR".to_string(),
                paid_amount: dec!(49.90),
                status: "Completed".to_string(),
                purchase_create_date: None,
                additional_data: None,
            })
            .await
            .expect("upsert order")
    }
}
