//! Full trading sessions driven through the binaries' library
//!
//! These verify:
//! 1. Every accepted order lands in the journal, refused buys do not
//! 2. Lack of supply never stops a run
//! 3. Any other failure aborts the run
//! 4. The report agrees with the journal

use bourse_bins::playbook::{self, Order};
use bourse_bins::report::TradingReport;
use bourse_core::testing::{create_sell, InMemoryTradeStore, NoopLock, UnavailableLock};
use bourse_core::{
    open_exchange, ExchangeCode, ExchangeSettings, InstrumentRegistry, JournalBackedExchange,
    LedgerError, Side, StockExchange,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tempfile::TempDir;

fn order(side: Side, code: &str, quantity: u32) -> Order {
    Order {
        side,
        instrument: InstrumentRegistry::default().resolve(code).unwrap(),
        quantity,
    }
}

#[test]
fn test_refused_buys_do_not_stop_the_run() {
    let exchange = JournalBackedExchange::new(
        ExchangeCode::Asx,
        InMemoryTradeStore::new(),
        NoopLock::new(),
        5,
        InstrumentRegistry::default(),
    );
    let orders = vec![
        order(Side::Buy, "CBA", 10),
        order(Side::Sell, "CBA", 20),
        order(Side::Buy, "CBA", 15),
        order(Side::Buy, "CBA", 6),
        order(Side::Sell, "NAB", 1),
    ];

    let summary = playbook::run(&exchange, &orders).unwrap();
    assert_eq!(summary.sells_accepted, 2);
    assert_eq!(summary.buys_accepted, 1);
    assert_eq!(summary.buys_rejected, 2);
    assert_eq!(summary.submitted(), orders.len());
    assert_eq!(exchange.store().len(), 3);

    let book = exchange.order_book_total_volume().unwrap();
    assert_eq!(book.get("CBA"), Some(&5));
    assert_eq!(book.get("NAB"), Some(&1));
}

#[test]
fn test_lock_failure_aborts_the_run() {
    let store = InMemoryTradeStore::with_records(vec![create_sell("QAN", 50)]);
    let exchange = JournalBackedExchange::new(
        ExchangeCode::Asx,
        store.clone(),
        UnavailableLock,
        5,
        InstrumentRegistry::default(),
    );

    let result = playbook::run(&exchange, &[order(Side::Buy, "QAN", 1)]);
    assert!(matches!(result, Err(LedgerError::LockAcquisitionFailed { .. })));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_seeded_session_on_disk() {
    let dir = TempDir::new().unwrap();
    let settings = ExchangeSettings {
        brokerage_cents: 5,
        journal_path: dir.path().join("journal").join("cxa.csv"),
        lock_path: dir.path().join("journal").join("cxa.lock"),
    };
    let registry = InstrumentRegistry::default();
    let exchange = open_exchange(ExchangeCode::Cxa, &settings, registry.clone()).unwrap();

    let mut rng = StdRng::seed_from_u64(2024);
    let (buys, sells) = playbook::random_counts(&mut rng);
    let orders = playbook::generate(&registry, buys, sells, &mut rng);
    let summary = playbook::run(&exchange, &orders).unwrap();

    let accepted = summary.sells_accepted + summary.buys_accepted;
    let journal = std::fs::read_to_string(&settings.journal_path).unwrap();
    assert_eq!(journal.lines().count(), accepted);
    assert!(journal.lines().all(|l| l.starts_with("CXA,")));

    let report = TradingReport::collect(&exchange).unwrap();
    assert_eq!(report.exchange, ExchangeCode::Cxa);
    assert_eq!(report.trading_costs, Decimal::new(accepted as i64 * 5, 2));

    let sold: u64 = orders
        .iter()
        .filter(|o| o.side == Side::Sell)
        .map(|o| u64::from(o.quantity))
        .sum();
    let held: u64 = report.volumes.values().sum();
    assert!(held <= sold);

    let text = report.to_string();
    assert!(text.starts_with("--------< CXA: Trading Report START >--------------\n"));
    assert!(text.ends_with("--------< CXA: Trading Report END >--------------"));
    assert!(!settings.lock_path.exists());
}
