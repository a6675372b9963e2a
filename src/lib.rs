//! Storage layer for a multi-marketplace listing synchronization engine.
//!
//! Owns every `m2epro_`-prefixed table: the versioned schema, the reference
//! data it ships with, and repositories that keep cross-row invariants
//! intact under concurrent writers.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod installer;
pub mod logging;
pub mod maintenance;
pub mod migrator;
pub mod repositories;
pub mod schema;
pub mod seed;
pub mod settings;
pub mod store;

pub use errors::{AppError, ServiceError};
pub use installer::{InstallOptions, InstallReport, Installer};
pub use settings::StoreSettings;
pub use store::{Store, StoreLimits};
