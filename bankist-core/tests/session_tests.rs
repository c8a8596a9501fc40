//! Integration tests for the session service
//!
//! These run without a tokio runtime, so the logout countdown only moves
//! when a test calls `tick()`.
//!
//! Run with: cargo test --test session_tests

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::TryRecvError;

use bankist_core::adapters::clock::FixedClock;
use bankist_core::adapters::demo::generate_demo_accounts;
use bankist_core::adapters::memory::InMemoryAccountStore;
use bankist_core::domain::Result;
use bankist_core::ports::{AccountStore, Clock};
use bankist_core::services::{ActivityLog, SessionService, TickOutcome};
use bankist_core::{
    Account, AccountView, Error, Movement, SessionEvent, SortOrder, TransferRejection,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

struct Harness {
    service: SessionService,
    clock: Arc<FixedClock>,
    activity: Arc<ActivityLog>,
}

impl Harness {
    fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn harness_with(accounts: Vec<Account>, logout_after: Duration) -> Harness {
    let clock = Arc::new(FixedClock::new(now()));
    let activity = Arc::new(ActivityLog::default());
    let store = InMemoryAccountStore::with_accounts(accounts).unwrap();
    let service = SessionService::new(store, logout_after, clock.clone(), Arc::clone(&activity));
    Harness {
        service,
        clock,
        activity,
    }
}

/// The four demo accounts with a five minute logout
fn demo_harness() -> Harness {
    harness_with(generate_demo_accounts(now()), Duration::from_secs(300))
}

/// Alice starts with 100, Bob with 20
fn two_account_harness() -> Harness {
    let alice = Account::new("Alice Alpha", 1234)
        .with_movements([Movement::new(dec(100), now() - chrono::Duration::days(3))]);
    let bob = Account::new("Bob Beta", 5678)
        .with_movements([Movement::new(dec(20), now() - chrono::Duration::days(10))]);
    harness_with(vec![alice, bob], Duration::from_secs(300))
}

fn movement_count(service: &SessionService, username: &str) -> usize {
    service
        .find_account(username)
        .unwrap()
        .map(|a| a.movements.len())
        .unwrap_or(0)
}

fn assert_parallel_lists(service: &SessionService) {
    for summary in service.list_accounts().unwrap() {
        let account = service.find_account(&summary.username).unwrap().unwrap();
        assert_eq!(account.movements.len(), summary.movement_count);
        assert_eq!(account.balance, summary.balance);
        assert_eq!(summary.balance.amount, amounts(&account).iter().sum::<Decimal>());
    }
}

fn amounts(view: &AccountView) -> Vec<Decimal> {
    view.movements.iter().map(|m| m.amount.amount).collect()
}

fn dates(view: &AccountView) -> Vec<DateTime<Utc>> {
    view.movements.iter().map(|m| m.date).collect()
}

fn drain(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    seen
}

// ============================================================================
// Login
// ============================================================================

#[test]
fn test_login_returns_display_bundle() {
    let h = demo_harness();

    let bundle = h.service.login("js", "1111").unwrap();

    assert!(bundle.session_active);
    assert_eq!(bundle.remaining_secs, Some(300));
    assert_eq!(bundle.sort, SortOrder::Stored);
    let view = bundle.account.unwrap();
    assert_eq!(view.first_name, "Jonas");
    assert_eq!(view.balance.amount, dec(3840));
    assert_eq!(view.total_in.amount, dec(5020));
    assert_eq!(view.total_out.amount, dec(1180));
    assert_eq!(view.balance.currency, "EUR");
    assert_eq!(view.balance.locale, "pt-PT");
    assert_eq!(view.movements.len(), 8);
    assert_eq!(h.service.active_username().as_deref(), Some("js"));
}

#[test]
fn test_login_with_wrong_pin_keeps_session_inactive() {
    let h = demo_harness();
    let mut events = h.service.subscribe();

    let err = h.service.login("js", "1112").unwrap_err();

    assert!(matches!(err, Error::InvalidCredentials));
    assert!(!h.service.is_active());
    assert!(!h.service.display().unwrap().session_active);
    // no display update was published
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_login_errors() {
    let h = demo_harness();

    assert!(matches!(
        h.service.login("nobody", "1111"),
        Err(Error::AccountNotFound(_))
    ));
    assert!(matches!(
        h.service.login("js", "one"),
        Err(Error::InvalidCredentials)
    ));
    assert!(matches!(h.service.login("", "1111"), Err(Error::Validation(_))));
    assert!(matches!(h.service.login("js", ""), Err(Error::Validation(_))));
    // usernames match exactly
    assert!(matches!(
        h.service.login("JS", "1111"),
        Err(Error::AccountNotFound(_))
    ));
}

#[test]
fn test_failed_login_leaves_existing_session_alone() {
    let h = demo_harness();
    h.service.login("js", "1111").unwrap();

    assert!(h.service.login("jd", "0000").is_err());
    assert_eq!(h.service.active_username().as_deref(), Some("js"));
}

#[test]
fn test_login_replaces_previous_session() {
    let h = demo_harness();
    h.service.login("js", "1111").unwrap();
    h.service.tick();
    assert_eq!(h.service.remaining_secs(), Some(299));

    let bundle = h.service.login("jd", "2222").unwrap();

    assert_eq!(bundle.account.unwrap().username, "jd");
    assert_eq!(h.service.active_username().as_deref(), Some("jd"));
    assert_eq!(h.service.remaining_secs(), Some(300));
}

// ============================================================================
// Transfers
// ============================================================================

#[test]
fn test_transfer_moves_money_between_accounts() {
    let h = two_account_harness();
    h.service.login("aa", "1234").unwrap();
    h.clock.advance(chrono::Duration::hours(1));

    let bundle = h.service.transfer("bb", dec(50)).unwrap();

    assert_eq!(bundle.account.unwrap().balance.amount, dec(50));
    let alice = h.service.find_account("aa").unwrap().unwrap();
    let bob = h.service.find_account("bb").unwrap().unwrap();
    assert_eq!(alice.balance.amount, dec(50));
    assert_eq!(bob.balance.amount, dec(70));
    assert_eq!(amounts(&alice), vec![dec(100), dec(-50)]);
    assert_eq!(amounts(&bob), vec![dec(20), dec(50)]);
    assert_eq!(dates(&alice).last(), Some(&h.clock_now()));
    assert_eq!(dates(&bob).last(), Some(&h.clock_now()));
    assert_parallel_lists(&h.service);
}

#[test]
fn test_rejected_transfers_change_nothing() {
    let h = two_account_harness();
    h.service.login("aa", "1234").unwrap();

    let cases = [
        ("bb", dec(0), TransferRejection::NonPositiveAmount),
        ("bb", dec(-5), TransferRejection::NonPositiveAmount),
        ("zz", dec(10), TransferRejection::UnknownReceiver),
        ("bb", dec(101), TransferRejection::InsufficientFunds),
        ("aa", dec(10), TransferRejection::SelfTransfer),
    ];

    for (receiver, amount, expected) in cases {
        match h.service.transfer(receiver, amount) {
            Err(Error::InvalidTransfer(reason)) => assert_eq!(reason, expected),
            other => panic!("expected {:?}, got {:?}", expected, other.map(|_| ())),
        }
        assert_eq!(movement_count(&h.service, "aa"), 1);
        assert_eq!(movement_count(&h.service, "bb"), 1);
    }

    // the whole balance may be sent
    h.service.transfer("bb", dec(100)).unwrap();
    assert_eq!(
        h.service.find_account("aa").unwrap().unwrap().balance.amount,
        Decimal::ZERO
    );
    assert_parallel_lists(&h.service);
}

#[test]
fn test_transfer_requires_session() {
    let h = two_account_harness();
    assert!(matches!(
        h.service.transfer("bb", dec(10)),
        Err(Error::NoActiveSession)
    ));
    assert_eq!(movement_count(&h.service, "bb"), 1);
}

#[test]
fn test_transfer_resets_countdown() {
    let h = two_account_harness();
    h.service.login("aa", "1234").unwrap();
    for _ in 0..10 {
        h.service.tick();
    }
    assert_eq!(h.service.remaining_secs(), Some(290));

    h.service.transfer("bb", dec(1)).unwrap();
    assert_eq!(h.service.remaining_secs(), Some(300));

    // a rejected transfer does not count as activity
    h.service.tick();
    let _ = h.service.transfer("bb", dec(1000));
    assert_eq!(h.service.remaining_secs(), Some(299));
}

// ============================================================================
// Loans
// ============================================================================

#[test]
fn test_loan_is_floored_and_granted() {
    let h = demo_harness();
    h.service.login("js", "1111").unwrap();

    // largest movement is 3000
    let bundle = h.service.request_loan(Decimal::new(29999, 1)).unwrap();

    let view = bundle.account.unwrap();
    assert_eq!(view.balance.amount, dec(3840 + 2999));
    let jonas = h.service.find_account("js").unwrap().unwrap();
    assert_eq!(amounts(&jonas).last(), Some(&dec(2999)));
    assert_eq!(dates(&jonas).last(), Some(&now()));
}

#[test]
fn test_loan_refused_when_larger_than_any_movement() {
    let h = demo_harness();
    h.service.login("js", "1111").unwrap();

    assert!(matches!(
        h.service.request_loan(dec(3001)),
        Err(Error::LoanRefused(_))
    ));
    assert!(matches!(
        h.service.request_loan(Decimal::new(5, 1)),
        Err(Error::LoanRefused(_))
    ));
    assert!(matches!(
        h.service.request_loan(dec(-100)),
        Err(Error::LoanRefused(_))
    ));
    assert_eq!(movement_count(&h.service, "js"), 8);

    // exactly the largest movement is fine
    h.service.request_loan(dec(3000)).unwrap();
    assert_eq!(movement_count(&h.service, "js"), 9);
}

#[test]
fn test_loan_requires_session() {
    let h = demo_harness();
    assert!(matches!(
        h.service.request_loan(dec(10)),
        Err(Error::NoActiveSession)
    ));
}

// ============================================================================
// Closing accounts
// ============================================================================

#[test]
fn test_close_rejects_mismatched_credentials() {
    let h = demo_harness();
    h.service.login("js", "1111").unwrap();

    let attempts = [("js", "2222"), ("jd", "2222"), ("", "1111"), ("js", "")];
    for (username, pin) in attempts {
        assert!(matches!(
            h.service.close_account(username, pin),
            Err(Error::InvalidCredentials)
        ));
    }

    assert!(h.service.is_active());
    assert!(h.service.find_account("js").unwrap().is_some());
    assert!(h.service.find_account("jd").unwrap().is_some());
}

#[test]
fn test_close_removes_account_and_ends_session() {
    let h = demo_harness();
    let mut events = h.service.subscribe();
    h.service.login("js", "1111").unwrap();

    let closed = h.service.close_account("js", "1111").unwrap();

    assert_eq!(closed.owner, "Jonas Schmedtmann");
    assert!(!h.service.is_active());
    assert!(h.service.find_account("js").unwrap().is_none());
    assert_eq!(h.service.list_accounts().unwrap().len(), 3);
    assert!(matches!(
        h.service.login("js", "1111"),
        Err(Error::AccountNotFound(_))
    ));

    // nobody can send money to it any more
    h.service.login("jd", "2222").unwrap();
    assert!(matches!(
        h.service.transfer("js", dec(10)),
        Err(Error::InvalidTransfer(TransferRejection::UnknownReceiver))
    ));

    let seen = drain(&mut events);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::LoggedOut)));
}

#[test]
fn test_close_without_session() {
    let h = demo_harness();
    assert!(matches!(
        h.service.close_account("js", "1111"),
        Err(Error::NoActiveSession)
    ));
    assert!(h.service.find_account("js").unwrap().is_some());
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_sort_toggle_is_a_view() {
    let h = demo_harness();
    assert!(matches!(h.service.toggle_sort(), Err(Error::NoActiveSession)));

    h.service.login("js", "1111").unwrap();
    let stored = amounts(&h.service.find_account("js").unwrap().unwrap());

    let sorted = h.service.toggle_sort().unwrap();
    assert_eq!(sorted.sort, SortOrder::Ascending);
    let sorted_amounts: Vec<Decimal> = sorted
        .account
        .unwrap()
        .movements
        .iter()
        .map(|m| m.amount.amount)
        .collect();
    let mut expected = stored.clone();
    expected.sort();
    assert_eq!(sorted_amounts, expected);
    assert_eq!(amounts(&h.service.find_account("js").unwrap().unwrap()), stored);

    let restored = h.service.toggle_sort().unwrap();
    assert_eq!(restored.sort, SortOrder::Stored);
    let amounts: Vec<Decimal> = restored
        .account
        .unwrap()
        .movements
        .iter()
        .map(|m| m.amount.amount)
        .collect();
    assert_eq!(amounts, stored);
}

#[test]
fn test_sort_does_not_reset_countdown() {
    let h = demo_harness();
    h.service.login("js", "1111").unwrap();
    h.service.tick();
    h.service.toggle_sort().unwrap();
    assert_eq!(h.service.remaining_secs(), Some(299));
}

// ============================================================================
// Countdown driven by hand
// ============================================================================

#[test]
fn test_countdown_expiry_clears_session() {
    let h = harness_with(generate_demo_accounts(now()), Duration::from_secs(3));
    let mut events = h.service.subscribe();
    h.service.login("js", "1111").unwrap();

    assert_eq!(h.service.tick(), TickOutcome::Running(2));
    assert_eq!(h.service.tick(), TickOutcome::Running(1));
    assert_eq!(h.service.tick(), TickOutcome::Expired);
    assert_eq!(h.service.tick(), TickOutcome::Idle);

    assert!(!h.service.is_active());
    assert!(!h.service.display().unwrap().session_active);

    let seen = drain(&mut events);
    assert!(matches!(seen.first(), Some(SessionEvent::Updated(_))));
    assert!(matches!(
        seen.get(1),
        Some(SessionEvent::Tick { remaining_secs: 2 })
    ));
    assert!(matches!(seen.last(), Some(SessionEvent::Expired)));
}

// ============================================================================
// Invariants and activity log
// ============================================================================

#[test]
fn test_balance_matches_movements_after_every_action() {
    let h = demo_harness();
    h.service.login("jd", "2222").unwrap();
    assert_parallel_lists(&h.service);

    h.service.transfer("js", dec(250)).unwrap();
    assert_parallel_lists(&h.service);

    h.service.request_loan(dec(4000)).unwrap();
    assert_parallel_lists(&h.service);

    let _ = h.service.transfer("stw", dec(1_000_000));
    assert_parallel_lists(&h.service);

    h.service.close_account("jd", "2222").unwrap();
    assert_parallel_lists(&h.service);
}

#[test]
fn test_activity_log_records_outcomes_without_pins() {
    let h = demo_harness();
    h.service.login("js", "9999").unwrap_err();
    h.service.login("js", "1111").unwrap();
    let _ = h.service.transfer("js", dec(5));

    let recent = h.activity.get_recent(10);
    let events: Vec<&str> = recent.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events, vec!["transfer", "login", "login"]);

    let errors = h.activity.get_errors(10);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].error_kind.as_deref(), Some("invalid_transfer"));
    assert_eq!(errors[1].error_kind.as_deref(), Some("invalid_credentials"));
    assert!(recent
        .iter()
        .filter_map(|e| e.error_message.as_deref())
        .all(|m| !m.contains("9999")));
}

#[test]
fn test_list_accounts() {
    let h = demo_harness();
    let accounts = h.service.list_accounts().unwrap();
    let usernames: Vec<&str> = accounts.iter().map(|a| a.username.as_str()).collect();
    assert_eq!(usernames, vec!["js", "jd", "stw", "ss"]);
    assert_eq!(accounts[1].balance.currency, "USD");
}

#[test]
fn test_lookups_never_expose_pins() {
    let h = demo_harness();
    let view = h.service.find_account("js").unwrap().unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("pin").is_none());
    assert_eq!(json["username"], "js");

    h.service.login("js", "1111").unwrap();
    let closed = h.service.close_account("js", "1111").unwrap();
    let json = serde_json::to_value(&closed).unwrap();
    assert!(json.get("pin").is_none());
}

// ============================================================================
// Amounts near the limits of Decimal
// ============================================================================

/// Store that takes any account as-is, including ones seed validation rejects
#[derive(Default)]
struct UncheckedStore {
    accounts: Vec<Account>,
}

impl AccountStore for UncheckedStore {
    fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }

    fn list_all(&self) -> Vec<&Account> {
        self.accounts.iter().collect()
    }

    fn insert(&mut self, account: Account) -> Result<()> {
        self.accounts.push(account);
        Ok(())
    }

    fn append_movement(&mut self, username: &str, movement: Movement) -> Result<()> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.username == username)
            .ok_or_else(|| Error::AccountNotFound(username.to_string()))?;
        account.push_movement(movement);
        Ok(())
    }

    fn remove_by_username(&mut self, username: &str) -> Option<Account> {
        let index = self.accounts.iter().position(|a| a.username == username)?;
        Some(self.accounts.remove(index))
    }
}

/// 5 * 10^28, more than half of `Decimal::MAX`
fn huge() -> Decimal {
    Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0)
}

/// "bs" and "rr" both hold a single huge deposit; "bs" also has an absurd rate
fn huge_balance_service() -> SessionService {
    let mut store = UncheckedStore::default();
    store
        .insert(
            Account::new("Big Spender", 1)
                .with_interest_rate(Decimal::MAX)
                .with_movements([Movement::new(huge(), now())]),
        )
        .unwrap();
    store
        .insert(Account::new("Rich Receiver", 2).with_movements([Movement::new(huge(), now())]))
        .unwrap();
    SessionService::new(
        store,
        Duration::from_secs(300),
        Arc::new(FixedClock::new(now())),
        Arc::new(ActivityLog::default()),
    )
}

#[test]
fn test_loan_that_would_overflow_is_refused() {
    let service = huge_balance_service();
    let bundle = service.login("bs", "1").unwrap();
    assert_eq!(bundle.account.unwrap().balance.amount, huge());

    assert!(matches!(
        service.request_loan(huge()),
        Err(Error::LoanRefused(_))
    ));
    assert_eq!(movement_count(&service, "bs"), 1);

    // the session is still usable afterwards
    assert!(service.display().unwrap().session_active);
    service.toggle_sort().unwrap();
    service.request_loan(dec(1000)).unwrap();
    assert_eq!(movement_count(&service, "bs"), 2);
}

#[test]
fn test_transfer_that_would_overflow_is_rejected() {
    let service = huge_balance_service();
    service.login("bs", "1").unwrap();

    assert!(matches!(
        service.transfer("rr", huge()),
        Err(Error::InvalidTransfer(TransferRejection::AmountOutOfRange))
    ));
    assert_eq!(movement_count(&service, "bs"), 1);
    assert_eq!(movement_count(&service, "rr"), 1);

    assert!(service.display().unwrap().session_active);
    service.transfer("rr", dec(10)).unwrap();
    assert_eq!(movement_count(&service, "rr"), 2);
}
