//! Accounts, listings, listing products and everything hanging off them.

mod common;

use assert_matches::assert_matches;
use common::{TestStore, AMAZON_US, EBAY_GERMANY, EBAY_US};
use m2e_store::{
    entities::{
        listing::AutoMode,
        listing_product::{ListingProductStatus, StatusChanger},
        listing_product_scheduled_action::ScheduledActionType,
        template::TemplateNick,
        Component,
    },
    repositories::{
        AccountRepository, InstructionRepository, ListingProductRepository, ListingRepository,
        ListingTemplates, NewAccount, NewInstruction, NewListing, NewScheduledAction, NewTemplate,
        NewVariation, ScheduledActionRepository, TagRepository, TemplateRepository,
        VariationOptionInput, VariationRepository,
    },
    ServiceError,
};
use serde_json::json;

fn new_listing(account_id: i32, marketplace_id: i32) -> NewListing {
    NewListing {
        account_id,
        marketplace_id,
        title: "Summer sale".to_string(),
        store_id: 1,
        templates: ListingTemplates::default(),
        auto_mode: AutoMode::None,
    }
}

fn template(nick: TemplateNick, component: Component) -> NewTemplate {
    NewTemplate {
        nick,
        component,
        title: format!("{} {}", component, nick),
        is_custom_template: false,
        data: json!({}),
    }
}

fn option(attribute: &str, value: &str) -> VariationOptionInput {
    VariationOptionInput {
        attribute: attribute.to_string(),
        option: value.to_string(),
        product_id: None,
    }
}

#[tokio::test]
async fn listing_marketplace_must_match_account_marketplace() {
    let store = TestStore::installed().await;
    let account = store.ebay_account(EBAY_GERMANY).await;
    let listings = ListingRepository::new(store.db.clone());

    let err = listings
        .create(new_listing(account.id, EBAY_US))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvariantViolation(_));
    assert!(listings.list_by_account(account.id).await.unwrap().is_empty());

    let listing = listings
        .create(new_listing(account.id, EBAY_GERMANY))
        .await
        .unwrap();
    assert_eq!(listing.marketplace_id, EBAY_GERMANY);
    assert_eq!(listing.component, Component::Ebay);
}

#[tokio::test]
async fn account_marketplace_must_share_component() {
    let store = TestStore::installed().await;
    let accounts = AccountRepository::new(store.db.clone());

    let err = accounts
        .create(NewAccount {
            title: "cross wired".to_string(),
            component: Component::Ebay,
            marketplace_id: AMAZON_US,
            server_hash: None,
            user_id: None,
            credentials: json!({}),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvariantViolation(_));

    let err = accounts
        .create(NewAccount {
            title: "nowhere".to_string(),
            component: Component::Ebay,
            marketplace_id: 9999,
            server_hash: None,
            user_id: None,
            credentials: json!({}),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn product_is_added_to_a_listing_once() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let products = ListingProductRepository::new(store.db.clone());

    let first = products.add_product(listing.id, 501).await.unwrap();
    let second = products.add_product(listing.id, 501).await.unwrap();

    assert!(first.is_added());
    assert!(!second.is_added());
    assert_eq!(first.listing_product().id, second.listing_product().id);
    assert_eq!(products.list_by_listing(listing.id).await.unwrap().len(), 1);
    assert_eq!(
        first.listing_product().status,
        ListingProductStatus::NotListed
    );
}

#[tokio::test]
async fn template_slots_reject_foreign_templates() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let templates = TemplateRepository::new(store.db.clone());
    let listings = ListingRepository::new(store.db.clone());

    let shipping = templates
        .create(template(TemplateNick::Shipping, Component::Ebay))
        .await
        .unwrap();
    let amazon_selling = templates
        .create(template(TemplateNick::SellingFormat, Component::Amazon))
        .await
        .unwrap();

    let wrong_slot = ListingTemplates {
        selling_format: Some(shipping.id),
        ..Default::default()
    };
    assert_matches!(
        listings.set_templates(listing.id, wrong_slot).await,
        Err(ServiceError::InvariantViolation(_))
    );

    let wrong_component = ListingTemplates {
        selling_format: Some(amazon_selling.id),
        ..Default::default()
    };
    assert_matches!(
        listings.set_templates(listing.id, wrong_component).await,
        Err(ServiceError::InvariantViolation(_))
    );

    let updated = listings
        .set_templates(
            listing.id,
            ListingTemplates {
                shipping: Some(shipping.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.template_shipping_id, Some(shipping.id));

    // A template in use cannot be deleted.
    assert_matches!(
        templates.delete(shipping.id).await,
        Err(ServiceError::InvariantViolation(_))
    );
    templates.delete(amazon_selling.id).await.unwrap();
}

#[tokio::test]
async fn blocked_status_is_stamped_and_cleared() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 77).await;
    let products = ListingProductRepository::new(store.db.clone());

    let blocked = products
        .set_status(lp.id, ListingProductStatus::Blocked, StatusChanger::Component)
        .await
        .unwrap();
    assert!(blocked.last_blocking_error_date.is_some());

    let listed = products
        .set_status(lp.id, ListingProductStatus::Listed, StatusChanger::Synch)
        .await
        .unwrap();
    assert_eq!(listed.last_blocking_error_date, None);
    assert_eq!(listed.status_changer, StatusChanger::Synch);
}

#[tokio::test]
async fn variation_attributes_are_distinct() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 12).await;
    let variations = VariationRepository::new(store.db.clone());

    let err = variations
        .add_variation(
            lp.id,
            NewVariation {
                options: vec![option("Color", "Red"), option(" Color ", "Blue")],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvariantViolation(_));

    variations
        .add_variation(
            lp.id,
            NewVariation {
                options: vec![option("Color", "Red"), option("Size", "M")],
                online_sku: Some("SHIRT-RED-M".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = variations.list_for_product(lp.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].options.len(), 2);

    let parent = ListingProductRepository::new(store.db.clone())
        .require(lp.id)
        .await
        .unwrap();
    assert!(parent.is_variation_product);
}

#[tokio::test]
async fn deleting_a_listing_cascades_to_product_children() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 1).await;
    let other = store.listing_product(listing.id, 2).await;

    VariationRepository::new(store.db.clone())
        .add_variation(
            lp.id,
            NewVariation {
                options: vec![option("Size", "L")],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let instructions = InstructionRepository::new(store.db.clone());
    instructions
        .enqueue(vec![NewInstruction {
            listing_product_id: lp.id,
            component: Component::Ebay,
            instruction_type: "channel_qty_changed".to_string(),
            initiator: "inspector".to_string(),
            priority: 10,
            skip_until: None,
            additional_data: None,
        }])
        .await
        .unwrap();
    let actions = ScheduledActionRepository::new(store.db.clone());
    actions
        .upsert(NewScheduledAction {
            listing_product_id: other.id,
            component: Component::Ebay,
            action_type: ScheduledActionType::Revise,
            is_force: false,
            tag: None,
            additional_data: None,
        })
        .await
        .unwrap();
    let tags = TagRepository::new(store.db.clone());
    let tag = tags.attach_error(lp.id, "21919301", "Duplicate listing").await.unwrap();

    let removed = ListingRepository::new(store.db.clone())
        .delete(listing.id)
        .await
        .unwrap();
    assert_eq!(removed, 2);

    assert!(VariationRepository::new(store.db.clone())
        .list_for_product(lp.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(instructions.count_for_product(lp.id).await.unwrap(), 0);
    assert_eq!(actions.find_for_product(other.id).await.unwrap(), None);
    assert!(tags.listing_products_with_tag(tag.id).await.unwrap().is_empty());
    assert_matches!(
        ListingRepository::new(store.db.clone()).delete(listing.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn error_tags_also_mark_has_error() {
    let store = TestStore::installed().await;
    let listing = store.listing().await;
    let lp = store.listing_product(listing.id, 3).await;
    let tags = TagRepository::new(store.db.clone());

    tags.attach_error(lp.id, "240", "Item title too long").await.unwrap();
    tags.attach_error(lp.id, "240", "Item title too long").await.unwrap();

    let nicks: Vec<String> = tags
        .tags_for(lp.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.nick)
        .collect();
    assert_eq!(nicks.len(), 2);
    assert!(nicks.contains(&"240".to_string()));
    assert!(nicks.contains(&"has_error".to_string()));
}
