//! Demo data provider
//!
//! The four sample owners of the Bankist demo, with movement histories
//! spread over the last couple of months so every relative-date label shows
//! up somewhere.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Account, Movement};

/// Days before `now` at which each demo movement happened, oldest first
const DAY_OFFSETS: [i64; 8] = [62, 41, 27, 16, 9, 4, 1, 0];

fn history(amounts: &[i64], now: DateTime<Utc>) -> Vec<Movement> {
    let offsets = &DAY_OFFSETS[DAY_OFFSETS.len() - amounts.len()..];
    amounts
        .iter()
        .zip(offsets)
        .map(|(amount, days)| Movement::new(Decimal::from(*amount), now - Duration::days(*days)))
        .collect()
}

fn demo_account(
    id: u128,
    owner: &str,
    pin: u32,
    interest_rate: Decimal,
    (currency, locale): (&str, &str),
    amounts: &[i64],
    now: DateTime<Utc>,
) -> Account {
    let mut account = Account::new(owner, pin)
        .with_interest_rate(interest_rate)
        .with_currency(currency, locale)
        .with_movements(history(amounts, now));
    account.id = Uuid::from_u128(id);
    account
}

/// Generate demo accounts with movement dates relative to `now`
pub fn generate_demo_accounts(now: DateTime<Utc>) -> Vec<Account> {
    vec![
        demo_account(
            0x1111_1111_1111_1111_1111_1111_1111_1111,
            "Jonas Schmedtmann",
            1111,
            Decimal::new(12, 1), // 1.2%
            ("EUR", "pt-PT"),
            &[200, 450, -400, 3000, -650, -130, 70, 1300],
            now,
        ),
        demo_account(
            0x2222_2222_2222_2222_2222_2222_2222_2222,
            "Jessica Davis",
            2222,
            Decimal::new(15, 1),
            ("USD", "en-US"),
            &[5000, 3400, -150, -790, -3210, -1000, 8500, -30],
            now,
        ),
        demo_account(
            0x3333_3333_3333_3333_3333_3333_3333_3333,
            "Steven Thomas Williams",
            3333,
            Decimal::new(7, 1),
            ("GBP", "en-GB"),
            &[200, -200, 340, -300, -20, 50, 400, -460],
            now,
        ),
        demo_account(
            0x4444_4444_4444_4444_4444_4444_4444_4444,
            "Sarah Smith",
            4444,
            Decimal::ONE,
            ("EUR", "de-DE"),
            &[430, 1000, 700, 50, 90],
            now,
        ),
    ]
}
