//! Session service - login, transfers, loans, closing and auto-logout
//!
//! One service instance owns the account registry and at most one active
//! session. Every action runs to completion under a single lock, so a
//! transfer can never interleave with the closure of its receiver.
//!
//! The logout countdown is ticked by a tokio task when the service is used
//! inside a runtime. Outside a runtime nothing ticks on its own and callers
//! drive the countdown with [`SessionService::tick`].

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::activity::{ActivityEvent, ActivityLog};
use super::timer::{Countdown, CountdownState, TickOutcome, TICK_PERIOD};
use crate::domain::result::{Error, Result, TransferRejection};
use crate::domain::{Account, AccountView, DisplayBundle, Money, Movement, SortOrder};
use crate::ports::{AccountStore, Clock};

const EVENT_CAPACITY: usize = 64;

/// Notifications for the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Account values changed and should be redrawn
    Updated(DisplayBundle),
    Tick { remaining_secs: u64 },
    /// The countdown ran out and the session was cleared
    Expired,
    /// The account was closed and the session cleared
    LoggedOut,
}

/// Registry listing without credentials
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub owner: String,
    pub username: String,
    pub balance: Money,
    pub movement_count: usize,
}

impl AccountSummary {
    fn of(account: &Account) -> Self {
        Self {
            owner: account.owner.clone(),
            username: account.username.clone(),
            balance: Money::of(account, account.balance()),
            movement_count: account.movements().len(),
        }
    }
}

struct SessionState {
    store: Box<dyn AccountStore>,
    active: Option<String>,
    sort: SortOrder,
    countdown: Countdown,
    ticker: Option<JoinHandle<()>>,
}

impl SessionState {
    fn active_account(&self) -> Result<&Account> {
        let username = self.active.as_deref().ok_or(Error::NoActiveSession)?;
        self.store
            .find_by_username(username)
            .ok_or(Error::NoActiveSession)
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn end_session(&mut self) {
        self.active = None;
        self.sort = SortOrder::Stored;
        self.countdown.stop();
        self.cancel_ticker();
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

struct Shared {
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    activity: Arc<ActivityLog>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Tick the countdown once
    ///
    /// With `Some(generation)` the tick is ignored unless it belongs to the
    /// countdown that is currently running.
    fn advance(&self, generation: Option<u64>) -> TickOutcome {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return TickOutcome::Idle,
        };
        if generation.is_some_and(|g| g != state.countdown.generation()) {
            return TickOutcome::Idle;
        }

        let outcome = state.countdown.tick();
        match outcome {
            TickOutcome::Running(remaining_secs) => {
                tracing::debug!(remaining_secs, "logout countdown");
                self.emit(SessionEvent::Tick { remaining_secs });
            }
            TickOutcome::Expired => {
                let mut event = ActivityEvent::new("session_expired");
                if let Some(username) = state.active.as_deref() {
                    event = event.with_username(username);
                }
                state.end_session();
                self.activity.log(event);
                self.emit(SessionEvent::Expired);
            }
            TickOutcome::Idle => {}
        }
        outcome
    }
}

fn spawn_ticker(shared: Weak<Shared>, generation: u64) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    Some(runtime.spawn(async move {
        let start = tokio::time::Instant::now() + TICK_PERIOD;
        let mut interval = tokio::time::interval_at(start, TICK_PERIOD);
        loop {
            interval.tick().await;
            let Some(live) = shared.upgrade() else {
                break;
            };
            match live.advance(Some(generation)) {
                TickOutcome::Running(_) => {}
                TickOutcome::Expired | TickOutcome::Idle => break,
            }
        }
    }))
}

/// Session controller for a single application instance
#[derive(Clone)]
pub struct SessionService {
    shared: Arc<Shared>,
}

impl SessionService {
    pub fn new(
        store: impl AccountStore + 'static,
        logout_after: Duration,
        clock: Arc<dyn Clock>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = SessionState {
            store: Box::new(store),
            active: None,
            sort: SortOrder::Stored,
            countdown: Countdown::new(logout_after),
            ticker: None,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                events,
                activity,
                clock,
            }),
        }
    }

    /// Receive session events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.shared
            .state
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    /// Record the outcome of an action in the activity log and pass it on
    fn record<T>(&self, event: &str, username: Option<&str>, result: Result<T>) -> Result<T> {
        let mut entry = ActivityEvent::new(event);
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            entry = entry.with_username(username);
        }
        if let Err(e) = &result {
            entry = entry.with_error(e.kind(), e.to_string());
        }
        self.shared.activity.log(entry);
        result
    }

    fn bundle(&self, state: &SessionState) -> DisplayBundle {
        match state.active_account() {
            Ok(account) => DisplayBundle {
                session_active: true,
                remaining_secs: state.countdown.remaining_secs(),
                sort: state.sort,
                account: Some(AccountView::build(
                    account,
                    state.sort,
                    self.shared.clock.now(),
                )),
            },
            Err(_) => DisplayBundle::logged_out(),
        }
    }

    /// Build the bundle for the current state and announce it
    fn publish(&self, state: &SessionState) -> DisplayBundle {
        let bundle = self.bundle(state);
        self.shared.emit(SessionEvent::Updated(bundle.clone()));
        bundle
    }

    /// Cancel any running countdown and start a fresh one
    fn restart_countdown(&self, state: &mut SessionState) {
        let generation = state.countdown.start();
        state.cancel_ticker();
        state.ticker = spawn_ticker(Arc::downgrade(&self.shared), generation);
    }

    // === Actions ===

    /// Log in, replacing whatever session was active
    ///
    /// A failed login changes nothing, including an existing session.
    pub fn login(&self, username: &str, pin: &str) -> Result<DisplayBundle> {
        let result = self.try_login(username, pin);
        self.record("login", Some(username), result)
    }

    fn try_login(&self, username: &str, pin: &str) -> Result<DisplayBundle> {
        if username.is_empty() || pin.is_empty() {
            return Err(Error::validation("username and PIN are required"));
        }

        let mut state = self.lock()?;
        let account = state
            .store
            .find_by_username(username)
            .ok_or_else(|| Error::AccountNotFound(username.to_string()))?;
        if !account.pin_matches(pin) {
            return Err(Error::InvalidCredentials);
        }

        let username = account.username.clone();
        state.active = Some(username);
        state.sort = SortOrder::Stored;
        self.restart_countdown(&mut state);
        Ok(self.publish(&state))
    }

    /// Move `amount` from the active account to `receiver`
    ///
    /// Every precondition is checked before either account is touched.
    pub fn transfer(&self, receiver: &str, amount: Decimal) -> Result<DisplayBundle> {
        let sender = self.active_username();
        let result = self.try_transfer(receiver, amount);
        self.record("transfer", sender.as_deref(), result)
    }

    fn try_transfer(&self, receiver: &str, amount: Decimal) -> Result<DisplayBundle> {
        let mut state = self.lock()?;
        let sender = state.active_account()?;
        let receiver_account = state.store.find_by_username(receiver);

        let rejection = if amount <= Decimal::ZERO {
            Some(TransferRejection::NonPositiveAmount)
        } else {
            match receiver_account {
                None => Some(TransferRejection::UnknownReceiver),
                Some(_) if sender.balance() < amount => Some(TransferRejection::InsufficientFunds),
                Some(r) if r.id == sender.id => Some(TransferRejection::SelfTransfer),
                Some(r) if r.balance_after(amount).is_none() => {
                    Some(TransferRejection::AmountOutOfRange)
                }
                Some(_) => None,
            }
        };
        if let Some(reason) = rejection {
            return Err(Error::InvalidTransfer(reason));
        }

        let sender_name = sender.username.clone();
        let now = self.shared.clock.now();
        state
            .store
            .append_movement(&sender_name, Movement::new(-amount, now))?;
        state
            .store
            .append_movement(receiver, Movement::new(amount, now))?;

        self.restart_countdown(&mut state);
        Ok(self.publish(&state))
    }

    /// Ask for a loan on the active account
    ///
    /// The amount is floored to a whole number. It is granted when it is
    /// positive and the account has already seen a movement at least as large.
    pub fn request_loan(&self, amount: Decimal) -> Result<DisplayBundle> {
        let username = self.active_username();
        let result = self.try_request_loan(amount);
        self.record("loan", username.as_deref(), result)
    }

    fn try_request_loan(&self, amount: Decimal) -> Result<DisplayBundle> {
        let amount = amount.floor();
        let mut state = self.lock()?;
        let account = state.active_account()?;

        if amount <= Decimal::ZERO
            || !account.has_movement_at_least(amount)
            || account.balance_after(amount).is_none()
        {
            return Err(Error::LoanRefused(amount));
        }

        let username = account.username.clone();
        let now = self.shared.clock.now();
        state
            .store
            .append_movement(&username, Movement::new(amount, now))?;

        self.restart_countdown(&mut state);
        Ok(self.publish(&state))
    }

    /// Close the active account after re-checking its username and PIN
    ///
    /// Returns a summary of the removed account. The session ends with it.
    pub fn close_account(&self, username: &str, pin: &str) -> Result<AccountSummary> {
        let active = self.active_username();
        let result = self.try_close_account(username, pin);
        self.record("close_account", active.as_deref(), result)
    }

    fn try_close_account(&self, username: &str, pin: &str) -> Result<AccountSummary> {
        if username.is_empty() || pin.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let mut state = self.lock()?;
        let account = state.active_account()?;
        if account.username != username || !account.pin_matches(pin) {
            return Err(Error::InvalidCredentials);
        }

        let removed = state
            .store
            .remove_by_username(username)
            .ok_or(Error::NoActiveSession)?;
        state.end_session();
        self.shared.emit(SessionEvent::LoggedOut);
        Ok(AccountSummary::of(&removed))
    }

    /// Flip between stored order and ascending-by-amount order
    pub fn toggle_sort(&self) -> Result<DisplayBundle> {
        let mut state = self.lock()?;
        state.active_account()?;
        state.sort = state.sort.toggled();
        Ok(self.publish(&state))
    }

    /// Tick the logout countdown by one second
    pub fn tick(&self) -> TickOutcome {
        self.shared.advance(None)
    }

    // === Queries ===

    /// Current display values, logged-out bundle when no session is active
    pub fn display(&self) -> Result<DisplayBundle> {
        let state = self.lock()?;
        Ok(self.bundle(&state))
    }

    pub fn active_username(&self) -> Option<String> {
        self.lock().ok().and_then(|state| state.active.clone())
    }

    pub fn is_active(&self) -> bool {
        self.active_username().is_some()
    }

    pub fn countdown_state(&self) -> CountdownState {
        self.lock()
            .map(|state| state.countdown.state())
            .unwrap_or(CountdownState::Stopped)
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        self.lock()
            .ok()
            .and_then(|state| state.countdown.remaining_secs())
    }

    /// Every account in the registry, without credentials
    pub fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let state = self.lock()?;
        Ok(state
            .store
            .list_all()
            .into_iter()
            .map(AccountSummary::of)
            .collect())
    }

    /// Display values of any account in stored order, without credentials
    pub fn find_account(&self, username: &str) -> Result<Option<AccountView>> {
        let state = self.lock()?;
        let now = self.shared.clock.now();
        Ok(state
            .store
            .find_by_username(username)
            .map(|account| AccountView::build(account, SortOrder::Stored, now)))
    }
}
