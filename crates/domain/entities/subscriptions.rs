use chrono::NaiveDate;
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: i64,
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Full overwrite of every mutable column; a `None` end date clears it.
#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = subscriptions, treat_none_as_null = true)]
pub struct UpdateSubscriptionEntity {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl SubscriptionEntity {
    pub fn from_insert(id: i64, insert_subscription_entity: InsertSubscriptionEntity) -> Self {
        Self {
            id,
            service_name: insert_subscription_entity.service_name,
            price: insert_subscription_entity.price,
            user_id: insert_subscription_entity.user_id,
            start_date: insert_subscription_entity.start_date,
            end_date: insert_subscription_entity.end_date,
        }
    }

    pub fn from_update(id: i64, update_subscription_entity: UpdateSubscriptionEntity) -> Self {
        Self {
            id,
            service_name: update_subscription_entity.service_name,
            price: update_subscription_entity.price,
            user_id: update_subscription_entity.user_id,
            start_date: update_subscription_entity.start_date,
            end_date: update_subscription_entity.end_date,
        }
    }

    /// Inclusive month-interval overlap with `[from, to]`; an open end date never expires.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date.is_none_or(|end_date| end_date >= from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn subscription(start_date: NaiveDate, end_date: Option<NaiveDate>) -> SubscriptionEntity {
        SubscriptionEntity {
            id: 1,
            service_name: "netflix".to_string(),
            price: 999,
            user_id: Uuid::nil(),
            start_date,
            end_date,
        }
    }

    #[test]
    fn window_overlapping_tail_is_included() {
        let s = subscription(month(2024, 1), Some(month(2024, 6)));
        assert!(s.overlaps(month(2024, 5), month(2024, 12)));
    }

    #[test]
    fn window_after_end_is_excluded() {
        let s = subscription(month(2024, 1), Some(month(2024, 6)));
        assert!(!s.overlaps(month(2024, 7), month(2024, 12)));
    }

    #[test]
    fn window_before_start_is_excluded() {
        let s = subscription(month(2024, 3), Some(month(2024, 6)));
        assert!(!s.overlaps(month(2023, 1), month(2024, 2)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let s = subscription(month(2024, 1), Some(month(2024, 6)));
        assert!(s.overlaps(month(2024, 6), month(2024, 6)));
        assert!(s.overlaps(month(2023, 6), month(2024, 1)));
    }

    #[test]
    fn open_ended_subscription_matches_any_window_reaching_its_start() {
        let s = subscription(month(2023, 1), None);
        assert!(s.overlaps(month(1990, 1), month(2023, 1)));
        assert!(s.overlaps(month(2030, 1), month(2030, 12)));
        assert!(!s.overlaps(month(2020, 1), month(2022, 12)));
    }
}
