//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest magnitude a single stored movement may have (10^15)
pub const MAX_MOVEMENT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Highest accepted interest rate, in percent
pub const MAX_INTEREST_RATE: Decimal = Decimal::ONE_HUNDRED;

/// A single signed transaction on an account
/// Positive amounts are deposits, negative amounts are withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

impl Movement {
    pub fn new(amount: Decimal, date: DateTime<Utc>) -> Self {
        Self { amount, date }
    }

    pub fn is_deposit(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Order in which movements are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Canonical order, oldest first
    #[default]
    Stored,
    /// Ascending by amount
    Ascending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Stored => SortOrder::Ascending,
            SortOrder::Ascending => SortOrder::Stored,
        }
    }
}

/// A bank account in the registry
///
/// Movements are append-only and each one carries its own date, so the
/// amount list and the date list always have the same length. The balance
/// is never stored; it is summed from the movements on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner: String,
    pub username: String,
    movements: Vec<Movement>,
    /// Interest paid on deposits, in percent
    pub interest_rate: Decimal,
    pub pin: u32,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub locale: String,
}

impl Account {
    /// Create a new account with no movements
    pub fn new(owner: impl Into<String>, pin: u32) -> Self {
        let owner = owner.into();
        Self {
            id: Uuid::new_v4(),
            username: Self::derive_username(&owner),
            owner,
            movements: Vec::new(),
            interest_rate: Decimal::ZERO,
            pin,
            currency: "EUR".to_string(),
            locale: "pt-PT".to_string(),
        }
    }

    pub fn with_interest_rate(mut self, interest_rate: Decimal) -> Self {
        self.interest_rate = interest_rate;
        self
    }

    pub fn with_currency(mut self, currency: &str, locale: impl Into<String>) -> Self {
        self.currency = Self::normalize_currency(currency);
        self.locale = locale.into();
        self
    }

    pub fn with_movements(mut self, movements: impl IntoIterator<Item = Movement>) -> Self {
        self.movements.extend(movements);
        self
    }

    /// Initials of the owner's name, lowercase, no separators
    /// ("Steven Thomas Williams" -> "stw")
    pub fn derive_username(owner: &str) -> String {
        owner
            .trim()
            .to_lowercase()
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .collect()
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }

    /// First word of the owner's name, used for greetings
    pub fn first_name(&self) -> &str {
        self.owner.split_whitespace().next().unwrap_or("")
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    /// Signed amounts in stored order
    pub fn amounts(&self) -> Vec<Decimal> {
        self.movements.iter().map(|m| m.amount).collect()
    }

    /// Movement dates in stored order
    pub fn dates(&self) -> Vec<DateTime<Utc>> {
        self.movements.iter().map(|m| m.date).collect()
    }

    /// Append a movement together with its date
    pub fn push_movement(&mut self, movement: Movement) {
        self.movements.push(movement);
    }

    /// Sum of all movements, saturating at the bounds of `Decimal`
    pub fn balance(&self) -> Decimal {
        self.movements
            .iter()
            .fold(Decimal::ZERO, |sum, m| sum.saturating_add(m.amount))
    }

    /// Balance after appending `amount`, `None` when it would overflow
    pub fn balance_after(&self, amount: Decimal) -> Option<Decimal> {
        self.movements
            .iter()
            .map(|m| m.amount)
            .chain(std::iter::once(amount))
            .try_fold(Decimal::ZERO, |sum, a| sum.checked_add(a))
    }

    pub fn total_in(&self) -> Decimal {
        self.movements
            .iter()
            .filter(|m| m.amount > Decimal::ZERO)
            .fold(Decimal::ZERO, |sum, m| sum.saturating_add(m.amount))
    }

    pub fn total_out(&self) -> Decimal {
        self.movements
            .iter()
            .filter(|m| m.amount < Decimal::ZERO)
            .fold(Decimal::ZERO, |sum, m| sum.saturating_sub(m.amount))
    }

    /// Interest earned on every deposit at the account's rate
    pub fn total_interest(&self) -> Decimal {
        let hundred = Decimal::ONE_HUNDRED;
        self.movements
            .iter()
            .filter(|m| m.amount > Decimal::ZERO)
            .map(|m| m.amount.saturating_mul(self.interest_rate) / hundred)
            .fold(Decimal::ZERO, |sum, interest| sum.saturating_add(interest))
    }

    /// True when some historical movement is at least `amount`
    pub fn has_movement_at_least(&self, amount: Decimal) -> bool {
        self.movements.iter().any(|m| m.amount >= amount)
    }

    /// Movements paired with their 1-based stored position, in display order
    ///
    /// Sorting is a view: the stored list is never reordered.
    pub fn ordered_movements(&self, order: SortOrder) -> Vec<(usize, &Movement)> {
        let mut view: Vec<(usize, &Movement)> = self
            .movements
            .iter()
            .enumerate()
            .map(|(i, m)| (i + 1, m))
            .collect();

        if order == SortOrder::Ascending {
            // stable sort keeps equal amounts in stored order
            view.sort_by(|a, b| a.1.amount.cmp(&b.1.amount));
        }
        view
    }

    /// Check a raw PIN input against the stored credential
    pub fn pin_matches(&self, raw_pin: &str) -> bool {
        raw_pin.trim().parse::<u32>().map_or(false, |pin| pin == self.pin)
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.owner.trim().is_empty() {
            return Err("owner name cannot be empty");
        }
        if self.username.is_empty() {
            return Err("username cannot be empty");
        }
        if self.currency.trim().is_empty() {
            return Err("currency cannot be empty");
        }
        if self.interest_rate < Decimal::ZERO {
            return Err("interest rate cannot be negative");
        }
        if self.interest_rate > MAX_INTEREST_RATE {
            return Err("interest rate cannot exceed 100%");
        }
        if self.movements.iter().any(|m| m.amount.abs() > MAX_MOVEMENT) {
            return Err("movement amount is out of range");
        }
        if self.balance_after(Decimal::ZERO).is_none() {
            return Err("balance is out of range");
        }
        Ok(())
    }
}
