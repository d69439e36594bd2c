use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI64, Ordering},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{
        InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
    },
    repositories::subscriptions::SubscriptionRepository,
    value_objects::subscriptions::{ListSubscriptionsFilter, SubscriptionPeriodFilter},
};

/// Process-local stand-in for `SubscriptionPostgres` with the same query semantics.
#[derive(Debug)]
pub struct SubscriptionInMemory {
    rows: Mutex<BTreeMap<i64, SubscriptionEntity>>,
    next_id: AtomicI64,
}

impl Default for SubscriptionInMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionInMemory {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    fn matches(row: &SubscriptionEntity, user_id: &Uuid, service_name: &str) -> bool {
        row.user_id == *user_id && row.service_name == service_name
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionInMemory {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entity = SubscriptionEntity::from_insert(id, insert_subscription_entity);

        self.rows.lock().insert(id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>> {
        Ok(self.rows.lock().get(&subscription_id).cloned())
    }

    async fn update(
        &self,
        subscription_id: i64,
        update_subscription_entity: UpdateSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let entity = SubscriptionEntity::from_update(subscription_id, update_subscription_entity);

        let mut rows = self.rows.lock();
        if let Some(row) = rows.get_mut(&subscription_id) {
            *row = entity.clone();
        }

        Ok(entity)
    }

    async fn delete(&self, subscription_id: i64) -> Result<bool> {
        Ok(self.rows.lock().remove(&subscription_id).is_some())
    }

    async fn list(&self, filter: ListSubscriptionsFilter) -> Result<Vec<SubscriptionEntity>> {
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);

        let rows = self.rows.lock();
        let results = rows
            .values()
            .rev()
            .filter(|row| Self::matches(row, &filter.user_id, &filter.service_name))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(results)
    }

    async fn sum_by_period(&self, filter: SubscriptionPeriodFilter) -> Result<i64> {
        let rows = self.rows.lock();
        let total = rows
            .values()
            .filter(|row| Self::matches(row, &filter.user_id, &filter.service_name))
            .filter(|row| row.overlaps(filter.from, filter.to))
            .try_fold(0i64, |acc, row| acc.checked_add(row.price))
            .ok_or_else(|| anyhow!("subscription price sum overflows i64"))?;

        Ok(total)
    }
}
