use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{
        InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
    },
    value_objects::months::{MonthParseError, parse_month, parse_optional_month},
};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const DEFAULT_LIST_OFFSET: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionModel {
    pub id: i64,
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            id: value.id,
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date: value.start_date,
            end_date: value.end_date,
        }
    }
}

/// Request body shared by create and full-replace update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpsertSubscriptionModel {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSubscriptionInput {
    #[error("service_name is required")]
    MissingServiceName,

    #[error("invalid start_date: {0}")]
    StartDate(MonthParseError),

    #[error("invalid end_date: {0}")]
    EndDate(MonthParseError),
}

/// Month-parsed form of [`UpsertSubscriptionModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubscriptionInput {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl TryFrom<UpsertSubscriptionModel> for ValidSubscriptionInput {
    type Error = InvalidSubscriptionInput;

    fn try_from(value: UpsertSubscriptionModel) -> Result<Self, Self::Error> {
        if value.service_name.is_empty() {
            return Err(InvalidSubscriptionInput::MissingServiceName);
        }

        let start_date =
            parse_month(&value.start_date).map_err(InvalidSubscriptionInput::StartDate)?;
        let end_date = parse_optional_month(value.end_date.as_deref())
            .map_err(InvalidSubscriptionInput::EndDate)?;

        Ok(Self {
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date,
            end_date,
        })
    }
}

impl From<ValidSubscriptionInput> for InsertSubscriptionEntity {
    fn from(value: ValidSubscriptionInput) -> Self {
        Self {
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date: value.start_date,
            end_date: value.end_date,
        }
    }
}

impl From<ValidSubscriptionInput> for UpdateSubscriptionEntity {
    fn from(value: ValidSubscriptionInput) -> Self {
        Self {
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date: value.start_date,
            end_date: value.end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSubscriptionsFilter {
    pub user_id: Uuid,
    pub service_name: String,
    pub limit: i64,
    pub offset: i64,
}

/// Window of months `[from, to]`, both normalized to the first day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPeriodFilter {
    pub user_id: Uuid,
    pub service_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryPeriodDto {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSummaryDto {
    pub total: i64,
    pub user_id: Uuid,
    pub service_name: String,
    pub period: SummaryPeriodDto,
}
