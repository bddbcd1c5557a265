//! Fiscal-year administration command handlers.
//!
//! Covers `inq fiscal show|set|list|rollover`. These write to the database;
//! there is no CSV variant.

use anyhow::{bail, Result};
use inq_reconcile::{Category, FiscalYearConfig, Reconciler};
use tracing::info;

use super::CommandContext;

fn print_fiscal(cfg: &FiscalYearConfig) {
    println!(
        "year={} opening_stock_ordinary={} opening_stock_deprecated={}",
        cfg.year, cfg.opening_stock_ordinary, cfg.opening_stock_deprecated
    );
}

/// Execute `inq fiscal show`.
pub async fn fiscal_show(ctx: &CommandContext, year: i32) -> Result<()> {
    let pool = ctx.connect_db().await?;
    match inq_db::fetch_fiscal_year(&pool, year).await? {
        Some(cfg) => {
            println!("configured=true");
            print_fiscal(&cfg);
        }
        None => {
            println!("configured=false");
            println!("year={}", year);
        }
    }
    Ok(())
}

/// Execute `inq fiscal set`.
pub async fn fiscal_set(
    ctx: &CommandContext,
    year: i32,
    ordinary: i64,
    deprecated: i64,
) -> Result<()> {
    let cfg = FiscalYearConfig::new(year, ordinary, deprecated);
    cfg.validate()?;

    let pool = ctx.connect_db().await?;
    inq_db::upsert_fiscal_year(&pool, &cfg).await?;
    println!("fiscal_set=true");
    print_fiscal(&cfg);
    Ok(())
}

/// Execute `inq fiscal list`.
pub async fn fiscal_list(ctx: &CommandContext) -> Result<()> {
    let pool = ctx.connect_db().await?;
    let years = inq_db::list_fiscal_years(&pool).await?;
    println!("years={}", years.len());
    for cfg in &years {
        print_fiscal(cfg);
    }
    Ok(())
}

/// Execute `inq fiscal rollover`.
pub async fn fiscal_rollover(ctx: &CommandContext, year: i32, yes: bool) -> Result<()> {
    let next_year = year
        .checked_add(1)
        .ok_or_else(|| anyhow::anyhow!("year {} has no successor", year))?;

    let store = ctx.pg_store().await?;
    let pool = store.pool().clone();
    let reconciler = Reconciler::new(&store, &store);

    let (ordinary, deprecated) = tokio::try_join!(
        reconciler.closing_stock(Category::Ordinary, year),
        reconciler.closing_stock(Category::Deprecated, year),
    )?;
    let next = FiscalYearConfig::new(next_year, ordinary, deprecated);

    let existing = inq_db::fetch_fiscal_year(&pool, next_year).await?;
    let allow_overwrite = yes || ctx.settings.allow_rollover_overwrite;
    check_rollover(existing.as_ref(), &next, allow_overwrite)?;

    inq_db::upsert_fiscal_year(&pool, &next).await?;
    info!(from_year = year, to_year = next_year, "rollover written");

    println!("rollover=true from_year={} to_year={}", year, next_year);
    print_fiscal(&next);
    Ok(())
}

/// Guardrail for writing `next` over what is already configured.
///
/// Refuses a negative stock (the register is inconsistent) and, unless
/// `allow_overwrite`, any change to a nonzero configured value.
fn check_rollover(
    existing: Option<&FiscalYearConfig>,
    next: &FiscalYearConfig,
    allow_overwrite: bool,
) -> Result<()> {
    for category in Category::ALL {
        let value = next.opening_stock(category);
        if value < 0 {
            bail!(
                "REFUSING ROLLOVER: {} closing stock of {} is negative ({}); fix the register first",
                category,
                next.year - 1,
                value
            );
        }
    }

    if allow_overwrite {
        return Ok(());
    }

    if let Some(current) = existing {
        let clobbers = Category::ALL.into_iter().any(|c| {
            current.configured_stock(c).is_some()
                && current.opening_stock(c) != next.opening_stock(c)
        });
        if clobbers {
            bail!(
                "FISCAL_OVERWRITE_REFUSED: year {} already configured (ordinary={} deprecated={}). \
                 Re-run with: `inq fiscal rollover --year {} --yes`",
                current.year,
                current.opening_stock_ordinary,
                current.opening_stock_deprecated,
                next.year - 1
            );
        }
    }
    Ok(())
}
