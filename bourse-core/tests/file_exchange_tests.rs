//! End-to-end tests of the file-backed exchange
//!
//! These run the real journal and sentinel lock against temporary
//! directories:
//! 1. Journal contents match what was traded, in order
//! 2. Aggregates survive reopening the exchange
//! 3. Two exchanges never see each other's trades
//! 4. A corrupt journal line fails the whole read
//! 5. A stale or corrupt lock never blocks trading

use bourse_core::config::ExchangeSettings;
use bourse_core::journal::JournalError;
use bourse_core::trade::now_ms;
use bourse_core::{open_exchange, ExchangeCode, InstrumentRegistry, LedgerError, StockExchange};
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn settings(dir: &Path, exchange: ExchangeCode, brokerage_cents: u32) -> ExchangeSettings {
    let stem = exchange.as_str().to_lowercase();
    ExchangeSettings {
        brokerage_cents,
        journal_path: dir.join("data").join(format!("{}_journal.csv", stem)),
        lock_path: dir.join("data").join(format!("{}_journal.lock", stem)),
    }
}

#[test]
fn test_trading_scenario_on_disk() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), ExchangeCode::Asx, 3);
    let exchange = open_exchange(ExchangeCode::Asx, &settings, InstrumentRegistry::default()).unwrap();

    exchange.sell("CBA", 100).unwrap();
    exchange.sell("QAN", 100).unwrap();
    exchange.sell("NAB", 100).unwrap();
    exchange.buy("CBA", 47).unwrap();
    exchange.buy("QAN", 13).unwrap();
    exchange.buy("NAB", 99).unwrap();

    let book = exchange.order_book_total_volume().unwrap();
    assert_eq!(book.get("CBA"), Some(&53));
    assert_eq!(book.get("QAN"), Some(&87));
    assert_eq!(book.get("NAB"), Some(&1));
    assert_eq!(exchange.trading_costs().unwrap(), dec!(0.18));

    let journal = fs::read_to_string(&settings.journal_path).unwrap();
    let lines: Vec<&str> = journal.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("ASX,SELL,"));
    assert!(lines[0].ends_with(",CBA,100,3"));
    assert!(lines[5].starts_with("ASX,BUY,"));
    assert!(lines[5].ends_with(",NAB,99,3"));

    // nothing left locked behind
    assert!(!settings.lock_path.exists());
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), ExchangeCode::Cxa, 5);

    {
        let exchange =
            open_exchange(ExchangeCode::Cxa, &settings, InstrumentRegistry::default()).unwrap();
        exchange.sell("NAB", 40).unwrap();
        exchange.buy("NAB", 15).unwrap();
    }

    let exchange = open_exchange(ExchangeCode::Cxa, &settings, InstrumentRegistry::default()).unwrap();
    assert_eq!(exchange.order_book_total_volume().unwrap().get("NAB"), Some(&25));
    assert_eq!(exchange.trading_costs().unwrap(), dec!(0.10));
    assert!(exchange.buy("NAB", 26).unwrap_err().is_insufficient_units());
}

#[test]
fn test_rejected_orders_leave_journal_unchanged() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), ExchangeCode::Asx, 5);
    let exchange = open_exchange(ExchangeCode::Asx, &settings, InstrumentRegistry::default()).unwrap();

    exchange.sell("CBA", 100).unwrap();
    let before = fs::read_to_string(&settings.journal_path).unwrap();

    assert!(matches!(exchange.buy("DBA", 1), Err(LedgerError::InvalidCode { .. })));
    assert!(exchange.buy("CBA", 101).unwrap_err().is_insufficient_units());

    assert_eq!(fs::read_to_string(&settings.journal_path).unwrap(), before);
}

#[test]
fn test_exchanges_are_isolated() {
    let dir = TempDir::new().unwrap();
    let asx_settings = settings(dir.path(), ExchangeCode::Asx, 5);
    let cxa_settings = settings(dir.path(), ExchangeCode::Cxa, 7);
    let asx = open_exchange(ExchangeCode::Asx, &asx_settings, InstrumentRegistry::default()).unwrap();
    let cxa = open_exchange(ExchangeCode::Cxa, &cxa_settings, InstrumentRegistry::default()).unwrap();

    asx.sell("QAN", 10).unwrap();
    cxa.sell("CBA", 20).unwrap();

    assert!(asx.buy("CBA", 1).unwrap_err().is_insufficient_units());
    assert!(cxa.buy("QAN", 1).unwrap_err().is_insufficient_units());
    assert_eq!(asx.trading_costs().unwrap(), dec!(0.05));
    assert_eq!(cxa.trading_costs().unwrap(), dec!(0.07));
}

#[test]
fn test_shared_journal_filters_by_exchange() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("shared.csv");
    fs::write(
        &journal,
        "CXA,SELL,1023439393000,CBA,30,5\nASX,SELL,1023439393001,CBA,12,4\n",
    )
    .unwrap();

    let asx = open_exchange(
        ExchangeCode::Asx,
        &ExchangeSettings {
            brokerage_cents: 5,
            journal_path: journal.clone(),
            lock_path: dir.path().join("shared.lock"),
        },
        InstrumentRegistry::default(),
    )
    .unwrap();

    assert_eq!(asx.order_book_total_volume().unwrap().get("CBA"), Some(&12));
    assert_eq!(asx.trading_costs().unwrap(), dec!(0.04));
}

#[test]
fn test_corrupt_journal_is_fatal() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), ExchangeCode::Asx, 5);
    fs::create_dir_all(settings.journal_path.parent().unwrap()).unwrap();
    fs::write(
        &settings.journal_path,
        "ASX,SELL,1023439393000,CBA,30,5\nASX,BUY,1023439393000,23,5\n",
    )
    .unwrap();

    let exchange = open_exchange(ExchangeCode::Asx, &settings, InstrumentRegistry::default()).unwrap();

    match exchange.order_book_total_volume() {
        Err(LedgerError::Journal(JournalError::Corrupt { source, .. })) => {
            assert_eq!(source.line(), 2)
        }
        other => panic!("Expected corrupt journal, got {:?}", other),
    }
    assert!(matches!(exchange.buy("CBA", 1), Err(LedgerError::Journal(_))));
    assert!(matches!(exchange.trading_costs(), Err(LedgerError::Journal(_))));
    // the failed buy still released its lock
    assert!(!settings.lock_path.exists());
}

#[test]
fn test_negative_journal_reports_line() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), ExchangeCode::Asx, 5);
    fs::create_dir_all(settings.journal_path.parent().unwrap()).unwrap();
    fs::write(
        &settings.journal_path,
        "ASX,SELL,1,CBA,30,5\nASX,SELL,2,NAB,1,5\nASX,BUY,3,NAB,2,5\n",
    )
    .unwrap();

    let exchange = open_exchange(ExchangeCode::Asx, &settings, InstrumentRegistry::default()).unwrap();
    let err = exchange.order_book_total_volume().unwrap_err();
    assert!(matches!(
        err,
        LedgerError::CorruptLedger {
            line: Some(3),
            volume: -1,
            ..
        }
    ));
    assert!(err.to_string().contains("at line 3"));
}

#[test]
fn test_stale_and_corrupt_locks_do_not_block() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), ExchangeCode::Asx, 5);
    let exchange = open_exchange(ExchangeCode::Asx, &settings, InstrumentRegistry::default()).unwrap();

    // a crashed holder left an expired sentinel
    fs::write(&settings.lock_path, format!("{}\n", now_ms() - 60_000)).unwrap();
    exchange.sell("CBA", 5).unwrap();

    fs::write(&settings.lock_path, "garbage").unwrap();
    exchange.sell("CBA", 5).unwrap();

    assert_eq!(exchange.order_book_total_volume().unwrap().get("CBA"), Some(&10));
    assert!(!settings.lock_path.exists());
}

#[test]
fn test_open_rejects_uncreatable_directory() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let settings = ExchangeSettings {
        brokerage_cents: 5,
        journal_path: blocker.join("journal.csv"),
        lock_path: blocker.join("journal.lock"),
    };
    assert!(matches!(
        open_exchange(ExchangeCode::Asx, &settings, InstrumentRegistry::default()),
        Err(JournalError::Io { .. })
    ));
}
