//! Scenario: monthly backlog conservation and continuity
//!
//! # Invariants under test
//!
//! 1. `closing_backlog == opening_backlog + entries - exits` for every window.
//! 2. January opens with the configured stock (no year-to-date roll-forward).
//! 3. 2025 ordinary stock 100, 20 January entries, 15 January closures
//!    => `{100, 20, 15, 105}`.
//! 4. February opens with January's closing backlog (105).
//! 5. Consecutive months chain: month N+1 opens where month N closed.
//! 6. A mid-month window rolls forward over `[Jan 1, start - 1 day]` only.
//!
//! All tests are pure in-process; no DB required.

use chrono::NaiveDate;
use inq_reconcile::{
    CaseRecord, Category, CategoryMarker, DateWindow, FiscalYearConfig, MemoryEventSource,
    MemoryFiscalStore, Reconciler,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// 2025 stock 100; January: 20 new cases, 15 older cases closed.
fn january_fixture() -> (MemoryEventSource, MemoryFiscalStore) {
    let mut events = MemoryEventSource::new(CategoryMarker::default());
    for i in 0..20 {
        events.push_case(CaseRecord::open(
            format!("NUIPC-{i}/25"),
            d(2025, 1, 1 + (i % 28) as u32),
        ));
    }
    for i in 0..15 {
        events.push_case(
            CaseRecord::open(format!("NUIPC-{i}/24"), d(2024, 6, 1)).closed_on(d(2025, 1, 31)),
        );
    }

    let mut fiscal = MemoryFiscalStore::new();
    fiscal.upsert(FiscalYearConfig::new(2025, 100, 0));
    (events, fiscal)
}

#[tokio::test]
async fn january_opens_with_configured_stock() {
    let (events, fiscal) = january_fixture();
    let r = Reconciler::new(&events, &fiscal);

    let jan = r
        .reconcile_month(Category::Ordinary, DateWindow::month(2025, 1).unwrap())
        .await
        .unwrap();

    assert_eq!(jan.opening_backlog, 100);
    assert_eq!(jan.entries, 20);
    assert_eq!(jan.exits, 15);
    assert_eq!(jan.closing_backlog, 105);
    assert!(jan.is_balanced());
}

#[tokio::test]
async fn february_opens_with_january_closing() {
    let (events, fiscal) = january_fixture();
    let r = Reconciler::new(&events, &fiscal);

    let feb = r
        .reconcile_month(Category::Ordinary, DateWindow::month(2025, 2).unwrap())
        .await
        .unwrap();

    assert_eq!(feb.opening_backlog, 105);
    assert_eq!(feb.entries, 0);
    assert_eq!(feb.exits, 0);
    assert_eq!(feb.closing_backlog, 105);
}

#[tokio::test]
async fn consecutive_months_chain_through_the_year() {
    let (mut events, fiscal) = january_fixture();
    // Spread extra movement over the year, boundary days included.
    events.push_case(CaseRecord::open("X-1", d(2025, 3, 31)));
    events.push_case(CaseRecord::open("X-2", d(2025, 4, 1)).closed_on(d(2025, 4, 30)));
    events.push_case(CaseRecord::open("X-3", d(2025, 7, 15)).closed_on(d(2025, 12, 31)));
    events.push_case(CaseRecord::open("X-4", d(2025, 12, 31)));

    let r = Reconciler::new(&events, &fiscal);

    let mut previous_closing = None;
    for month in 1..=12 {
        let res = r
            .reconcile_month(Category::Ordinary, DateWindow::month(2025, month).unwrap())
            .await
            .unwrap();
        assert!(res.is_balanced(), "month {month} not balanced: {res:?}");
        if let Some(prev) = previous_closing {
            assert_eq!(res.opening_backlog, prev, "month {month} does not chain");
        }
        previous_closing = Some(res.closing_backlog);
    }

    // 100 + (20 + 4 entries) - (15 + 2 exits)
    assert_eq!(previous_closing, Some(107));
}

#[tokio::test]
async fn mid_month_window_rolls_forward_to_the_day_before() {
    let (mut events, fiscal) = january_fixture();
    events.push_case(CaseRecord::open("MID-1", d(2025, 3, 9)));
    events.push_case(CaseRecord::open("MID-2", d(2025, 3, 10)));

    let r = Reconciler::new(&events, &fiscal);
    let window = DateWindow::new(d(2025, 3, 10), d(2025, 3, 20)).unwrap();
    let res = r.reconcile_month(Category::Ordinary, window).await.unwrap();

    // MID-1 (Mar 9) is year-to-date, MID-2 (Mar 10) is in-window.
    assert_eq!(res.opening_backlog, 106);
    assert_eq!(res.entries, 1);
    assert_eq!(res.closing_backlog, 107);
}

#[tokio::test]
async fn report_pairs_both_categories_for_the_same_window() {
    let (mut events, mut fiscal) = january_fixture();
    fiscal.upsert(FiscalYearConfig::new(2025, 100, 8));
    events.push_case(
        CaseRecord::open("P-1/25", d(2025, 1, 5)).with_annotation("Precatória de Lisboa"),
    );

    let r = Reconciler::new(&events, &fiscal);
    let window = DateWindow::month(2025, 1).unwrap();
    let report = r.reconcile_report(window).await.unwrap();

    assert_eq!(report.window, window);
    assert_eq!(report.ordinary.closing_backlog, 105);
    assert_eq!(report.deprecated.opening_backlog, 8);
    assert_eq!(report.deprecated.entries, 1);
    assert_eq!(report.deprecated.closing_backlog, 9);
    assert_eq!(report.for_category(Category::Deprecated), &report.deprecated);
}
