use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::subscriptions::{
        InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
    },
    value_objects::subscriptions::{ListSubscriptionsFilter, SubscriptionPeriodFilter},
};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>>;

    /// Overwrites every mutable column and echoes `subscription_id` back.
    /// Does not report whether a row actually matched.
    async fn update(
        &self,
        subscription_id: i64,
        update_subscription_entity: UpdateSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Returns `false` when no row was deleted.
    async fn delete(&self, subscription_id: i64) -> Result<bool>;

    async fn list(&self, filter: ListSubscriptionsFilter) -> Result<Vec<SubscriptionEntity>>;

    async fn sum_by_period(&self, filter: SubscriptionPeriodFilter) -> Result<i64>;
}
