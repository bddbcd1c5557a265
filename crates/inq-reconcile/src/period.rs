use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::{
    CarryForwardResolver, Category, DateWindow, EventSource, FiscalConfigStore, MonthlyReport,
    ReportWindowResult, WindowAggregator, WindowFlow, YearReport,
};

/// Entry point for report computations.
///
/// Request-scoped and read-only. Each category is computed independently; no
/// state is shared between calls.
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    events: &'a dyn EventSource,
    fiscal: &'a dyn FiscalConfigStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(events: &'a dyn EventSource, fiscal: &'a dyn FiscalConfigStore) -> Self {
        Self { events, fiscal }
    }

    pub fn aggregator(&self) -> WindowAggregator<'a> {
        WindowAggregator::new(self.events)
    }

    pub fn resolver(&self) -> CarryForwardResolver<'a> {
        CarryForwardResolver::new(self.fiscal, self.aggregator())
    }

    pub async fn aggregate(&self, category: Category, window: DateWindow) -> Result<WindowFlow> {
        self.aggregator().aggregate(category, window).await
    }

    pub async fn resolve_opening_stock(&self, category: Category, year: i32) -> Result<i64> {
        self.resolver().resolve_opening_stock(category, year).await
    }

    /// Opening backlog, entries, exits and closing backlog for `window`.
    ///
    /// The opening backlog is the year's opening stock rolled forward over
    /// `[Jan 1, window start - 1 day]`.
    pub async fn reconcile_month(
        &self,
        category: Category,
        window: DateWindow,
    ) -> Result<ReportWindowResult> {
        let opening_stock = self.resolve_opening_stock(category, window.year()).await?;
        self.reconcile_with_stock(category, window, opening_stock).await
    }

    /// Both categories for the same window.
    pub async fn reconcile_report(&self, window: DateWindow) -> Result<MonthlyReport> {
        let (ordinary, deprecated) = tokio::try_join!(
            self.reconcile_month(Category::Ordinary, window),
            self.reconcile_month(Category::Deprecated, window),
        )?;
        Ok(MonthlyReport {
            window,
            ordinary,
            deprecated,
        })
    }

    /// Months `1..=through_month` of `year`, each identical to
    /// [`reconcile_report`](Self::reconcile_report) for that month, plus the
    /// `[Jan 1, end of through_month]` total.
    ///
    /// The opening stock is resolved once per category for the whole table.
    pub async fn reconcile_year(&self, year: i32, through_month: u32) -> Result<YearReport> {
        if !(1..=12).contains(&through_month) {
            bail!("WINDOW_INVALID: through_month {} is outside 1..=12", through_month);
        }

        let (stock_ordinary, stock_deprecated) = tokio::try_join!(
            self.resolve_opening_stock(Category::Ordinary, year),
            self.resolve_opening_stock(Category::Deprecated, year),
        )?;

        let mut months = Vec::with_capacity(through_month as usize);
        for month in 1..=through_month {
            let window = DateWindow::month(year, month)?;
            months.push(
                self.report_with_stock(window, stock_ordinary, stock_deprecated)
                    .await?,
            );
        }

        let last = DateWindow::month(year, through_month)?;
        let span = DateWindow::new(DateWindow::month(year, 1)?.from(), last.to())?;
        let total = self
            .report_with_stock(span, stock_ordinary, stock_deprecated)
            .await?;

        Ok(YearReport {
            year,
            opening_stock_ordinary: stock_ordinary,
            opening_stock_deprecated: stock_deprecated,
            months,
            total,
        })
    }

    /// Stock at the end of `year`: resolved opening stock plus the full-year flow.
    /// Used by the administrative rollover; never written back from here.
    pub async fn closing_stock(&self, category: Category, year: i32) -> Result<i64> {
        let window = DateWindow::full_year(year)?;
        Ok(self.reconcile_month(category, window).await?.closing_backlog)
    }

    async fn report_with_stock(
        &self,
        window: DateWindow,
        stock_ordinary: i64,
        stock_deprecated: i64,
    ) -> Result<MonthlyReport> {
        let (ordinary, deprecated) = tokio::try_join!(
            self.reconcile_with_stock(Category::Ordinary, window, stock_ordinary),
            self.reconcile_with_stock(Category::Deprecated, window, stock_deprecated),
        )?;
        Ok(MonthlyReport {
            window,
            ordinary,
            deprecated,
        })
    }

    async fn reconcile_with_stock(
        &self,
        category: Category,
        window: DateWindow,
        opening_stock: i64,
    ) -> Result<ReportWindowResult> {
        let aggregator = self.aggregator();
        let ytd = window.year_to_date_before()?;

        let (ytd_flow, flow) = tokio::try_join!(
            async {
                match ytd {
                    Some(w) => aggregator.aggregate(category, w).await.map(Some),
                    None => Ok(None),
                }
            },
            aggregator.aggregate(category, window),
        )?;

        let opening_backlog = match ytd_flow {
            Some(f) => opening_stock + f.net(),
            None => opening_stock,
        };
        let result = ReportWindowResult::roll_forward(opening_backlog, flow);

        debug!(
            %category,
            %window,
            opening_stock,
            opening_backlog = result.opening_backlog,
            entries = result.entries,
            exits = result.exits,
            closing_backlog = result.closing_backlog,
            "window reconciled"
        );
        if result.closing_backlog < 0 {
            warn!(
                %category,
                %window,
                closing_backlog = result.closing_backlog,
                "negative closing backlog; check opening stock configuration and closure dates"
            );
        }

        Ok(result)
    }
}
