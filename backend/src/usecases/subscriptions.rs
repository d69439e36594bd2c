use std::sync::Arc;

use axum::http::StatusCode;
use crates::domain::{
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        months::format_month,
        subscriptions::{
            ListSubscriptionsFilter, SubscriptionModel, SubscriptionPeriodFilter,
            UpsertSubscriptionModel, ValidSubscriptionInput,
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Validation(String),
    #[error("subscription {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::NotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
}

impl<S> SubscriptionUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>) -> Self {
        Self { subscription_repo }
    }

    pub async fn create(&self, model: UpsertSubscriptionModel) -> UseCaseResult<SubscriptionModel> {
        let input = validate("create", model)?;
        let user_id = input.user_id;

        let created = self
            .subscription_repo
            .create(input.into())
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to create subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            subscription_id = created.id,
            %user_id,
            service_name = %created.service_name,
            "subscriptions: subscription created"
        );

        Ok(created.into())
    }

    pub async fn get(&self, subscription_id: i64) -> UseCaseResult<SubscriptionModel> {
        let found = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to load subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        match found {
            Some(subscription) => Ok(subscription.into()),
            None => {
                warn!(
                    subscription_id,
                    status = StatusCode::NOT_FOUND.as_u16(),
                    "subscriptions: subscription not found"
                );
                Err(SubscriptionError::NotFound(subscription_id))
            }
        }
    }

    /// Full replace. An id with no row still comes back as success, echoing the
    /// supplied fields; see the repository contract.
    pub async fn update(
        &self,
        subscription_id: i64,
        model: UpsertSubscriptionModel,
    ) -> UseCaseResult<SubscriptionModel> {
        let input = validate("update", model)?;

        let updated = self
            .subscription_repo
            .update(subscription_id, input.into())
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to update subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(subscription_id, "subscriptions: subscription updated");

        Ok(updated.into())
    }

    pub async fn delete(&self, subscription_id: i64) -> UseCaseResult<()> {
        let deleted = self
            .subscription_repo
            .delete(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to delete subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        if !deleted {
            warn!(
                subscription_id,
                status = StatusCode::NOT_FOUND.as_u16(),
                "subscriptions: nothing to delete"
            );
            return Err(SubscriptionError::NotFound(subscription_id));
        }

        info!(subscription_id, "subscriptions: subscription deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        filter: ListSubscriptionsFilter,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        let user_id = filter.user_id;
        let service_name = filter.service_name.clone();

        let subscriptions = self
            .subscription_repo
            .list(filter)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %service_name,
                    db_error = ?err,
                    "subscriptions: failed to list subscriptions"
                );
                SubscriptionError::Internal(err)
            })?;

        Ok(subscriptions.into_iter().map(SubscriptionModel::from).collect())
    }

    pub async fn sum_by_period(&self, filter: SubscriptionPeriodFilter) -> UseCaseResult<i64> {
        let user_id = filter.user_id;
        let service_name = filter.service_name.clone();
        let (from, to) = (format_month(filter.from), format_month(filter.to));

        info!(
            %user_id,
            %service_name,
            %from,
            %to,
            "subscriptions: calculating period total"
        );

        self.subscription_repo
            .sum_by_period(filter)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %service_name,
                    %from,
                    %to,
                    db_error = ?err,
                    "subscriptions: failed to calculate period total"
                );
                SubscriptionError::Internal(err)
            })
    }
}

fn validate(
    operation: &str,
    model: UpsertSubscriptionModel,
) -> UseCaseResult<ValidSubscriptionInput> {
    ValidSubscriptionInput::try_from(model).map_err(|err| {
        warn!(
            operation,
            error = %err,
            status = StatusCode::BAD_REQUEST.as_u16(),
            "subscriptions: invalid subscription input"
        );
        SubscriptionError::Validation(err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::NaiveDate;
    use crates::domain::{
        entities::subscriptions::{
            InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
        },
        repositories::subscriptions::MockSubscriptionRepository,
    };
    use mockall::predicate::eq;
    use uuid::Uuid;

    fn user_id() -> Uuid {
        Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
    }

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn upsert_model() -> UpsertSubscriptionModel {
        UpsertSubscriptionModel {
            service_name: "netflix".to_string(),
            price: 999,
            user_id: user_id(),
            start_date: "01-2024".to_string(),
            end_date: None,
        }
    }

    fn sample_subscription(id: i64) -> SubscriptionEntity {
        SubscriptionEntity {
            id,
            service_name: "netflix".to_string(),
            price: 999,
            user_id: user_id(),
            start_date: month(2024, 1),
            end_date: None,
        }
    }

    #[tokio::test]
    async fn create_passes_parsed_months_to_repository() {
        let mut repo = MockSubscriptionRepository::new();

        let expected = InsertSubscriptionEntity {
            service_name: "netflix".to_string(),
            price: 999,
            user_id: user_id(),
            start_date: month(2024, 1),
            end_date: Some(month(2024, 6)),
        };

        repo.expect_create()
            .with(eq(expected))
            .times(1)
            .returning(|insert| {
                let created = SubscriptionEntity::from_insert(7, insert);
                Box::pin(async move { Ok(created) })
            });

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let created = usecase
            .create(UpsertSubscriptionModel {
                end_date: Some("06-2024".to_string()),
                ..upsert_model()
            })
            .await
            .unwrap();

        assert_eq!(created.id, 7);
        assert_eq!(created.price, 999);
        assert_eq!(created.end_date, Some(month(2024, 6)));
    }

    #[tokio::test]
    async fn malformed_dates_never_reach_the_repository() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_create().never();
        repo.expect_update().never();

        let usecase = SubscriptionUseCase::new(Arc::new(repo));

        for bad in ["2024-01", "01/2024", "01-202", "ab-2024"] {
            let model = UpsertSubscriptionModel {
                start_date: bad.to_string(),
                ..upsert_model()
            };

            let err = usecase.create(model.clone()).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "input {bad:?}");

            let err = usecase.update(1, model).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "input {bad:?}");
        }
    }

    #[tokio::test]
    async fn get_maps_missing_row_to_not_found() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id()
            .with(eq(42))
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let err = usecase.get(42).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::NotFound(42)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_returns_found_row() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id().with(eq(3)).returning(|id| {
            let subscription = sample_subscription(id);
            Box::pin(async move { Ok(Some(subscription)) })
        });

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let found = usecase.get(3).await.unwrap();

        assert_eq!(found, SubscriptionModel::from(sample_subscription(3)));
    }

    #[tokio::test]
    async fn backend_failures_are_internal() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Box::pin(async { Err(anyhow!("connection refused")) }));
        repo.expect_list()
            .returning(|_| Box::pin(async { Err(anyhow!("connection refused")) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));

        let err = usecase.get(1).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = usecase
            .list(ListSubscriptionsFilter {
                user_id: user_id(),
                service_name: "netflix".to_string(),
                limit: 50,
                offset: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn delete_of_missing_row_is_not_found() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_delete()
            .with(eq(9))
            .returning(|_| Box::pin(async { Ok(false) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let err = usecase.delete(9).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::NotFound(9)));
    }

    #[tokio::test]
    async fn delete_of_existing_row_succeeds() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_delete()
            .with(eq(9))
            .returning(|_| Box::pin(async { Ok(true) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        assert!(usecase.delete(9).await.is_ok());
    }

    // Updating an id with no row reports success with the caller's id.
    // Kept as-is pending product-owner review.
    #[tokio::test]
    async fn update_echoes_id_even_without_existing_row() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id().never();
        repo.expect_update()
            .withf(|id, update: &UpdateSubscriptionEntity| *id == 404 && update.price == 999)
            .returning(|id, update| {
                let updated = SubscriptionEntity::from_update(id, update);
                Box::pin(async move { Ok(updated) })
            });

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let updated = usecase.update(404, upsert_model()).await.unwrap();

        assert_eq!(updated.id, 404);
    }

    #[tokio::test]
    async fn sum_by_period_forwards_window() {
        let mut repo = MockSubscriptionRepository::new();
        let filter = SubscriptionPeriodFilter {
            user_id: user_id(),
            service_name: "netflix".to_string(),
            from: month(2024, 5),
            to: month(2024, 12),
        };

        repo.expect_sum_by_period()
            .with(eq(filter.clone()))
            .returning(|_| Box::pin(async { Ok(1998) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        assert_eq!(usecase.sum_by_period(filter).await.unwrap(), 1998);
    }
}
