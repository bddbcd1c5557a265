use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::{Category, DateWindow, FiscalConfigStore, WindowAggregator};

/// Resolves the opening stock of a fiscal year.
///
/// Carry-forward reaches back exactly one year: when both `year` and
/// `year - 1` are unset, the prior year's literal 0 is used as its opening
/// stock. Deeper chains are not followed.
///
/// Nothing is written back and nothing is cached; every call reads live
/// configuration.
#[derive(Clone, Copy)]
pub struct CarryForwardResolver<'a> {
    fiscal: &'a dyn FiscalConfigStore,
    aggregator: WindowAggregator<'a>,
}

impl<'a> CarryForwardResolver<'a> {
    pub fn new(fiscal: &'a dyn FiscalConfigStore, aggregator: WindowAggregator<'a>) -> Self {
        Self { fiscal, aggregator }
    }

    pub async fn resolve_opening_stock(&self, category: Category, year: i32) -> Result<i64> {
        let current = self
            .fiscal
            .fiscal_year(year)
            .await
            .with_context(|| format!("fiscal year lookup failed year={}", year))?;

        if let Some(stock) = current.and_then(|c| c.configured_stock(category)) {
            debug!(%category, year, stock, "opening stock configured");
            return Ok(stock);
        }

        let prior_year = year
            .checked_sub(1)
            .ok_or_else(|| anyhow!("no year before {}", year))?;
        let prior = match self
            .fiscal
            .fiscal_year(prior_year)
            .await
            .with_context(|| format!("fiscal year lookup failed year={}", prior_year))?
        {
            Some(p) => p,
            None => {
                debug!(%category, year, "opening stock unset and no prior year, using 0");
                return Ok(0);
            }
        };

        let flow = self
            .aggregator
            .aggregate(category, DateWindow::full_year(prior_year)?)
            .await?;
        let stock = prior.opening_stock(category) + flow.net();

        debug!(
            %category,
            year,
            prior_opening = prior.opening_stock(category),
            prior_entries = flow.entries,
            prior_exits = flow.exits,
            stock,
            "opening stock carried forward"
        );

        Ok(stock)
    }
}
