use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::subscriptions::SubscriptionRepository,
        value_objects::{
            months::parse_month,
            subscriptions::{
                DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET, ListSubscriptionsFilter,
                SubscriptionPeriodFilter, SubscriptionSummaryDto, SummaryPeriodDto,
                UpsertSubscriptionModel,
            },
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::subscriptions::SubscriptionPostgres,
    },
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::usecases::subscriptions::{SubscriptionError, SubscriptionUseCase};

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    user_id: Option<String>,
    service_name: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionSummaryQuery {
    from: Option<String>,
    to: Option<String>,
    user_id: Option<String>,
    service_name: Option<String>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscriptions_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let subscriptions_usecase = SubscriptionUseCase::new(Arc::new(subscriptions_repository));

    router(Arc::new(subscriptions_usecase))
}

/// Store-agnostic router; `routes` wires it to Postgres.
pub fn router<T>(subscriptions_usecase: Arc<SubscriptionUseCase<T>>) -> Router
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/",
            post(create_subscription::<T>).get(list_subscriptions::<T>),
        )
        .route("/summary", get(summarize_subscriptions::<T>))
        .route(
            "/:id",
            get(get_subscription::<T>)
                .put(update_subscription::<T>)
                .delete(delete_subscription::<T>),
        )
        .with_state(subscriptions_usecase)
}

pub async fn create_subscription<T>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<T>>>,
    payload: Result<Json<UpsertSubscriptionModel>, JsonRejection>,
) -> Result<impl IntoResponse, SubscriptionError>
where
    T: SubscriptionRepository + Send + Sync,
{
    info!("subscriptions: create request received");
    let Json(model) = payload.map_err(|rejection| invalid_body("create", rejection))?;

    let created = subscriptions_usecase.create(model).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_subscription<T>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<T>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, SubscriptionError>
where
    T: SubscriptionRepository + Send + Sync,
{
    info!("subscriptions: get request received");
    let subscription_id = parse_subscription_id("get", id)?;

    let subscription = subscriptions_usecase.get(subscription_id).await?;

    Ok((StatusCode::OK, Json(subscription)))
}

pub async fn update_subscription<T>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<T>>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpsertSubscriptionModel>, JsonRejection>,
) -> Result<impl IntoResponse, SubscriptionError>
where
    T: SubscriptionRepository + Send + Sync,
{
    info!("subscriptions: update request received");
    let subscription_id = parse_subscription_id("update", id)?;
    let Json(model) = payload.map_err(|rejection| invalid_body("update", rejection))?;

    let updated = subscriptions_usecase.update(subscription_id, model).await?;

    Ok((StatusCode::OK, Json(updated)))
}

pub async fn delete_subscription<T>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<T>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, SubscriptionError>
where
    T: SubscriptionRepository + Send + Sync,
{
    info!("subscriptions: delete request received");
    let subscription_id = parse_subscription_id("delete", id)?;

    subscriptions_usecase.delete(subscription_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_subscriptions<T>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<T>>>,
    query: Result<Query<ListSubscriptionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, SubscriptionError>
where
    T: SubscriptionRepository + Send + Sync,
{
    info!("subscriptions: list request received");
    let Query(query) = query.map_err(|rejection| invalid("list", rejection.body_text()))?;

    let user_id = parse_user_id("list", query.user_id.as_deref())?;
    let service_name = required("list", "service_name", query.service_name)?;

    // Unparseable paging values fall back to the defaults instead of failing.
    let filter = ListSubscriptionsFilter {
        user_id,
        service_name,
        limit: paging_value(query.limit.as_deref(), DEFAULT_LIST_LIMIT),
        offset: paging_value(query.offset.as_deref(), DEFAULT_LIST_OFFSET),
    };

    let subscriptions = subscriptions_usecase.list(filter).await?;

    Ok((StatusCode::OK, Json(subscriptions)))
}

pub async fn summarize_subscriptions<T>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<T>>>,
    query: Result<Query<SubscriptionSummaryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, SubscriptionError>
where
    T: SubscriptionRepository + Send + Sync,
{
    info!("subscriptions: summary request received");
    let Query(query) = query.map_err(|rejection| invalid("summary", rejection.body_text()))?;

    let (from_raw, to_raw) = match (non_empty(query.from), non_empty(query.to)) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(invalid("summary", "from and to are required (MM-YYYY)")),
    };

    let from = parse_month(&from_raw)
        .map_err(|_| invalid("summary", "invalid from date format, expected MM-YYYY"))?;
    let to = parse_month(&to_raw)
        .map_err(|_| invalid("summary", "invalid to date format, expected MM-YYYY"))?;

    let user_id = parse_user_id("summary", query.user_id.as_deref())?;
    let service_name = required("summary", "service_name", query.service_name)?;

    let total = subscriptions_usecase
        .sum_by_period(SubscriptionPeriodFilter {
            user_id,
            service_name: service_name.clone(),
            from,
            to,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(SubscriptionSummaryDto {
            total,
            user_id,
            service_name,
            period: SummaryPeriodDto {
                from: from_raw,
                to: to_raw,
            },
        }),
    ))
}

fn invalid(operation: &str, message: impl Into<String>) -> SubscriptionError {
    let message = message.into();
    warn!(
        operation,
        error = %message,
        status = StatusCode::BAD_REQUEST.as_u16(),
        "subscriptions: rejected request input"
    );
    SubscriptionError::Validation(message)
}

fn invalid_body(operation: &str, rejection: JsonRejection) -> SubscriptionError {
    invalid(operation, rejection.body_text())
}

fn parse_subscription_id(
    operation: &str,
    id: Result<Path<i64>, PathRejection>,
) -> Result<i64, SubscriptionError> {
    id.map(|Path(id)| id).map_err(|_| invalid(operation, "invalid id"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(
    operation: &str,
    name: &str,
    value: Option<String>,
) -> Result<String, SubscriptionError> {
    non_empty(value).ok_or_else(|| invalid(operation, format!("{name} is required")))
}

fn parse_user_id(operation: &str, raw: Option<&str>) -> Result<Uuid, SubscriptionError> {
    match raw.filter(|v| !v.is_empty()) {
        None => Err(invalid(operation, "user_id is required")),
        Some(raw) => Uuid::parse_str(raw).map_err(|_| invalid(operation, "invalid user_id format")),
    }
}

fn paging_value(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(default)
}
