//! Read-only report command handlers.
//!
//! Covers `inq report month|year`, `inq stock resolve` and `inq entries list`.
//! All of them run against either a CSV export directory or the database.

use anyhow::{Context, Result};
use chrono::Datelike;
use inq_reconcile::{Category, DateWindow, MonthlyReport, YearReport};
use serde::Serialize;
use std::path::Path;

use super::{parse_category, parse_date, CommandContext};

#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    config_hash: &'a str,
    source: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

fn print_json<T: Serialize>(ctx: &CommandContext, source: &str, body: &T) -> Result<()> {
    let out = Stamped {
        config_hash: &ctx.loaded.config_hash,
        source,
        body,
    };
    let json = serde_json::to_string_pretty(&out).context("serialize report json failed")?;
    println!("{}", json);
    Ok(())
}

fn print_monthly(report: &MonthlyReport) {
    println!("window_from={}", report.window.from());
    println!("window_to={}", report.window.to());
    for category in Category::ALL {
        let r = report.for_category(category);
        println!("{}.opening_backlog={}", category, r.opening_backlog);
        println!("{}.entries={}", category, r.entries);
        println!("{}.exits={}", category, r.exits);
        println!("{}.closing_backlog={}", category, r.closing_backlog);
    }
}

fn print_row(label: &str, report: &MonthlyReport) {
    for category in Category::ALL {
        let r = report.for_category(category);
        println!(
            "{} category={} opening_backlog={} entries={} exits={} closing_backlog={}",
            label, category, r.opening_backlog, r.entries, r.exits, r.closing_backlog
        );
    }
}

fn print_year(report: &YearReport) {
    println!("year={}", report.year);
    println!("ordinary.opening_stock={}", report.opening_stock_ordinary);
    println!("deprecated.opening_stock={}", report.opening_stock_deprecated);
    for row in &report.months {
        let label = format!("month={}-{:02}", report.year, row.window.from().month());
        print_row(&label, row);
    }
    print_row("total", &report.total);
}

/// Execute `inq report month`.
pub async fn report_month(
    ctx: &CommandContext,
    year: Option<i32>,
    month: Option<u32>,
    csv_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let (now_year, now_month) = ctx.current_year_month();
    let window = DateWindow::month(year.unwrap_or(now_year), month.unwrap_or(now_month))?;

    let backend = ctx.open_backend(csv_dir).await?;
    let report = backend.reconciler().reconcile_report(window).await?;
    let source = backend.events().source_name();

    if json {
        return print_json(ctx, source, &report);
    }

    println!("config_hash={}", ctx.loaded.config_hash);
    println!("source={}", source);
    print_monthly(&report);
    Ok(())
}

/// Execute `inq report year`.
pub async fn report_year(
    ctx: &CommandContext,
    year: i32,
    through_month: Option<u32>,
    csv_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let through_month = match through_month {
        Some(m) => m,
        None => {
            let (now_year, now_month) = ctx.current_year_month();
            if year == now_year {
                now_month
            } else {
                12
            }
        }
    };

    let backend = ctx.open_backend(csv_dir).await?;
    let report = backend.reconciler().reconcile_year(year, through_month).await?;
    let source = backend.events().source_name();

    if json {
        return print_json(ctx, source, &report);
    }

    println!("config_hash={}", ctx.loaded.config_hash);
    println!("source={}", source);
    print_year(&report);
    Ok(())
}

/// Execute `inq stock resolve`.
pub async fn stock_resolve(
    ctx: &CommandContext,
    year: i32,
    category: &str,
    csv_dir: Option<&Path>,
) -> Result<()> {
    let category = parse_category(category)?;
    let backend = ctx.open_backend(csv_dir).await?;
    let reconciler = backend.reconciler();

    let configured = backend
        .fiscal()
        .fiscal_year(year)
        .await?
        .and_then(|cfg| cfg.configured_stock(category));
    let stock = reconciler.resolve_opening_stock(category, year).await?;

    println!("year={}", year);
    println!("category={}", category);
    println!("configured={}", configured.is_some());
    println!("opening_stock={}", stock);
    Ok(())
}

/// Execute `inq entries list`.
pub async fn entries_list(
    ctx: &CommandContext,
    from: &str,
    to: &str,
    category: &str,
    csv_dir: Option<&Path>,
) -> Result<()> {
    let window = DateWindow::new(parse_date("from", from)?, parse_date("to", to)?)?;
    let category = parse_category(category)?;

    let backend = ctx.open_backend(csv_dir).await?;
    let ids = backend.events().entry_identifiers(category, window).await?;

    println!("window_from={}", window.from());
    println!("window_to={}", window.to());
    println!("category={}", category);
    println!("entries={}", ids.len());
    for id in ids {
        println!("identifier={}", id);
    }
    Ok(())
}
