//! Scenario: failure propagation and negative backlog pass-through
//!
//! # Invariants under test
//!
//! 1. An Event Source failure fails the whole reconciliation (no partial result).
//! 2. A fiscal store failure fails the whole reconciliation.
//! 3. A closing backlog below zero is returned as computed, never clamped.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use inq_reconcile::{
    CaseRecord, Category, CategoryMarker, DateWindow, EventSource, FiscalConfigStore,
    FiscalYearConfig, MemoryEventSource, MemoryFiscalStore, Reconciler,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Entries answer, exits fail.
struct ExitsUnreachable;

#[async_trait::async_trait]
impl EventSource for ExitsUnreachable {
    fn source_name(&self) -> &'static str {
        "exits-unreachable"
    }

    async fn count_distinct_entries(&self, _: Category, _: DateWindow) -> Result<i64> {
        Ok(3)
    }

    async fn count_exits(&self, _: Category, _: DateWindow) -> Result<i64> {
        bail!("store unreachable")
    }

    async fn entry_identifiers(&self, _: Category, _: DateWindow) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

struct FiscalUnreachable;

#[async_trait::async_trait]
impl FiscalConfigStore for FiscalUnreachable {
    async fn fiscal_year(&self, _: i32) -> Result<Option<FiscalYearConfig>> {
        bail!("fiscal table unreachable")
    }
}

#[tokio::test]
async fn event_source_failure_aborts_reconciliation() {
    let events = ExitsUnreachable;
    let mut fiscal = MemoryFiscalStore::new();
    fiscal.upsert(FiscalYearConfig::new(2025, 10, 10));

    let r = Reconciler::new(&events, &fiscal);
    let err = r
        .reconcile_month(Category::Ordinary, DateWindow::month(2025, 1).unwrap())
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("store unreachable"),
        "root cause must be preserved: {err:#}"
    );

    assert!(r
        .reconcile_report(DateWindow::month(2025, 4).unwrap())
        .await
        .is_err());
}

#[tokio::test]
async fn fiscal_store_failure_aborts_reconciliation() {
    let events = MemoryEventSource::new(CategoryMarker::default());
    let fiscal = FiscalUnreachable;

    let r = Reconciler::new(&events, &fiscal);
    let err = r
        .reconcile_month(Category::Deprecated, DateWindow::month(2025, 6).unwrap())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("fiscal table unreachable"));
}

#[tokio::test]
async fn negative_closing_backlog_is_passed_through() {
    let mut events = MemoryEventSource::new(CategoryMarker::default());
    // Closures of cases that predate the configured stock.
    for i in 0..5 {
        events.push_case(
            CaseRecord::open(format!("OLD-{i}"), d(2019, 1, 1)).closed_on(d(2025, 2, 3)),
        );
    }
    let mut fiscal = MemoryFiscalStore::new();
    fiscal.upsert(FiscalYearConfig::new(2025, 2, 0));

    let r = Reconciler::new(&events, &fiscal);
    let feb = r
        .reconcile_month(Category::Ordinary, DateWindow::month(2025, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(feb.opening_backlog, 2);
    assert_eq!(feb.exits, 5);
    assert_eq!(feb.closing_backlog, -3);

    let mar = r
        .reconcile_month(Category::Ordinary, DateWindow::month(2025, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(mar.opening_backlog, -3);
}
