//! Display bundle handed to the presentation layer
//!
//! Everything here is structured data. Rendering money, dates and labels
//! into text for a given locale is left to whoever consumes the bundle.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::account::{Account, Movement, SortOrder};

/// An amount together with the currency and locale it should be shown in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
    pub locale: String,
}

impl Money {
    pub fn of(account: &Account, amount: Decimal) -> Self {
        Self {
            amount,
            currency: account.currency.clone(),
            locale: account.locale.clone(),
        }
    }
}

/// How long ago a movement happened, in the coarsest unit that fits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RelativeDay {
    Today,
    Yesterday,
    DaysAgo(i64),
    WeeksAgo(i64),
    CalendarDate(NaiveDate),
}

impl RelativeDay {
    /// Label `date` relative to `now` by whole calendar days
    ///
    /// Dates on a later day than `now` are shown as plain calendar dates.
    pub fn between(date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = (now.date_naive() - date.date_naive()).num_days();
        match days {
            0 => RelativeDay::Today,
            1 => RelativeDay::Yesterday,
            2..=6 => RelativeDay::DaysAgo(days),
            7..=30 => RelativeDay::WeeksAgo(days / 7),
            _ => RelativeDay::CalendarDate(date.date_naive()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementView {
    /// 1-based position in the stored movement list
    pub position: usize,
    pub kind: MovementKind,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub label: RelativeDay,
}

impl MovementView {
    fn new(account: &Account, position: usize, movement: &Movement, now: DateTime<Utc>) -> Self {
        Self {
            position,
            kind: if movement.is_deposit() {
                MovementKind::Deposit
            } else {
                MovementKind::Withdrawal
            },
            amount: Money::of(account, movement.amount),
            date: movement.date,
            label: RelativeDay::between(movement.date, now),
        }
    }
}

/// Derived values for the logged-in account
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub owner: String,
    pub first_name: String,
    pub username: String,
    pub balance: Money,
    pub total_in: Money,
    pub total_out: Money,
    pub total_interest: Money,
    pub currency: String,
    pub locale: String,
    pub movements: Vec<MovementView>,
}

impl AccountView {
    /// Recompute every derived value from the account's movements
    pub fn build(account: &Account, order: SortOrder, now: DateTime<Utc>) -> Self {
        let movements = account
            .ordered_movements(order)
            .into_iter()
            .map(|(position, m)| MovementView::new(account, position, m, now))
            .collect();

        Self {
            owner: account.owner.clone(),
            first_name: account.first_name().to_string(),
            username: account.username.clone(),
            balance: Money::of(account, account.balance()),
            total_in: Money::of(account, account.total_in()),
            total_out: Money::of(account, account.total_out()),
            total_interest: Money::of(account, account.total_interest()),
            currency: account.currency.clone(),
            locale: account.locale.clone(),
            movements,
        }
    }
}

/// Snapshot of everything the presentation layer shows
#[derive(Debug, Clone, Serialize)]
pub struct DisplayBundle {
    pub session_active: bool,
    pub remaining_secs: Option<u64>,
    pub sort: SortOrder,
    pub account: Option<AccountView>,
}

impl DisplayBundle {
    pub fn logged_out() -> Self {
        Self {
            session_active: false,
            remaining_secs: None,
            sort: SortOrder::Stored,
            account: None,
        }
    }
}
