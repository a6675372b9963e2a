//! sea-orm entities for every `m2epro_` table.

pub mod account;
pub mod common;
pub mod config;
pub mod listing;
pub mod listing_log;
pub mod listing_product;
pub mod listing_product_instruction;
pub mod listing_product_scheduled_action;
pub mod listing_product_tag_relation;
pub mod listing_product_variation;
pub mod listing_product_variation_option;
pub mod lock_item;
pub mod lock_transactional;
pub mod marketplace;
pub mod order;
pub mod order_change;
pub mod order_item;
pub mod order_log;
pub mod processing;
pub mod processing_lock;
pub mod request_pending_partial;
pub mod request_pending_partial_data;
pub mod request_pending_single;
pub mod setup;
pub mod synchronization_log;
pub mod system_log;
pub mod tag;
pub mod template;
pub mod wizard;

pub use common::{Component, Initiator, LogType};
