use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Marketplace integration a row belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Component {
    #[sea_orm(string_value = "ebay")]
    Ebay,
    #[sea_orm(string_value = "amazon")]
    Amazon,
    #[sea_orm(string_value = "walmart")]
    Walmart,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Ebay, Component::Amazon, Component::Walmart];
}

/// Severity of a log row.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogType {
    #[sea_orm(string_value = "notice")]
    Notice,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "error")]
    Error,
}

/// Who caused a logged action.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Initiator {
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "extension")]
    Extension,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn component_names_match_stored_values() {
        for component in Component::ALL {
            let parsed = Component::from_str(&component.to_string()).unwrap();
            assert_eq!(parsed, component);
            assert_eq!(component.to_value(), component.to_string());
        }
    }

    #[test]
    fn unknown_component_is_rejected() {
        assert!(Component::from_str("etsy").is_err());
    }
}
