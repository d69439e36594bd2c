use anyhow::{Context, Result};
use async_trait::async_trait;
use diesel::{
    RunQueryDsl, delete,
    dsl::sql,
    insert_into,
    prelude::*,
    sql_types::BigInt,
    update,
};
use std::sync::Arc;
use tracing::warn;

use crate::{
    domain::{
        entities::subscriptions::{
            InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
        },
        repositories::subscriptions::SubscriptionRepository,
        value_objects::subscriptions::{ListSubscriptionsFilter, SubscriptionPeriodFilter},
    },
    infra::db::postgres::{
        cancellable::run_cancellable, postgres_connection::PgPoolSquad, schema::subscriptions,
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

// Diesel is synchronous; every query runs on the blocking threadpool and is
// cancelled server-side when the caller stops waiting.
#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        run_cancellable(db_pool, move |conn| -> Result<SubscriptionEntity> {
            let result = insert_into(subscriptions::table)
                .values(&insert_subscription_entity)
                .returning(SubscriptionEntity::as_returning())
                .get_result::<SubscriptionEntity>(conn)
                .context("insert subscription")?;

            Ok(result)
        })
        .await
    }

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        run_cancellable(db_pool, move |conn| -> Result<Option<SubscriptionEntity>> {
            let result = subscriptions::table
                .find(subscription_id)
                .select(SubscriptionEntity::as_select())
                .first::<SubscriptionEntity>(conn)
                .optional()
                .with_context(|| format!("select subscription {subscription_id}"))?;

            Ok(result)
        })
        .await
    }

    async fn update(
        &self,
        subscription_id: i64,
        update_subscription_entity: UpdateSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        run_cancellable(db_pool, move |conn| -> Result<SubscriptionEntity> {
            let affected = update(subscriptions::table.find(subscription_id))
                .set(&update_subscription_entity)
                .execute(conn)
                .with_context(|| format!("update subscription {subscription_id}"))?;

            // Callers still get the echoed entity back when nothing matched.
            if affected == 0 {
                warn!(subscription_id, "subscriptions: update matched no rows");
            }

            Ok(SubscriptionEntity::from_update(
                subscription_id,
                update_subscription_entity,
            ))
        })
        .await
    }

    async fn delete(&self, subscription_id: i64) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        run_cancellable(db_pool, move |conn| -> Result<bool> {
            let affected = delete(subscriptions::table.find(subscription_id))
                .execute(conn)
                .with_context(|| format!("delete subscription {subscription_id}"))?;

            Ok(affected > 0)
        })
        .await
    }

    async fn list(&self, filter: ListSubscriptionsFilter) -> Result<Vec<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        run_cancellable(db_pool, move |conn| -> Result<Vec<SubscriptionEntity>> {
            let results = subscriptions::table
                .filter(subscriptions::user_id.eq(filter.user_id))
                .filter(subscriptions::service_name.eq(&filter.service_name))
                .order(subscriptions::id.desc())
                .limit(filter.limit)
                .offset(filter.offset)
                .select(SubscriptionEntity::as_select())
                .load::<SubscriptionEntity>(conn)
                .context("list subscriptions")?;

            Ok(results)
        })
        .await
    }

    async fn sum_by_period(&self, filter: SubscriptionPeriodFilter) -> Result<i64> {
        let db_pool = Arc::clone(&self.db_pool);

        run_cancellable(db_pool, move |conn| -> Result<i64> {
            // SUM(bigint) is numeric in Postgres; cast back so it loads as i64.
            let total = subscriptions::table
                .filter(subscriptions::user_id.eq(filter.user_id))
                .filter(subscriptions::service_name.eq(&filter.service_name))
                .filter(subscriptions::start_date.le(filter.to))
                .filter(
                    subscriptions::end_date
                        .is_null()
                        .or(subscriptions::end_date.ge(filter.from)),
                )
                .select(sql::<BigInt>("CAST(COALESCE(SUM(price), 0) AS BIGINT)"))
                .get_result::<i64>(conn)
                .context("sum subscriptions by period")?;

            Ok(total)
        })
        .await
    }
}
