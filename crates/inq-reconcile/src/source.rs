//! Collaborator boundaries for the reconciliation core.
//!
//! Implementations must be `Send + Sync` so independent sub-queries can run
//! concurrently. All queries are read-only.

use anyhow::Result;

use crate::{Category, DateWindow, FiscalYearConfig};

/// Queryable register of case entries and closures.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Short name for logs (e.g. `"postgres"`, `"memory"`).
    fn source_name(&self) -> &'static str;

    /// Distinct normalized identifiers registered in `window` (inclusive) for
    /// `category`, across every entry table.
    async fn count_distinct_entries(&self, category: Category, window: DateWindow) -> Result<i64>;

    /// Closed cases whose `closed_at` falls in `window` (inclusive) for
    /// `category`. Not deduplicated.
    async fn count_exits(&self, category: Category, window: DateWindow) -> Result<i64>;

    /// The identifiers behind [`count_distinct_entries`](Self::count_distinct_entries),
    /// sorted ascending.
    async fn entry_identifiers(&self, category: Category, window: DateWindow)
        -> Result<Vec<String>>;
}

/// Point lookup of the per-year opening stock configuration.
#[async_trait::async_trait]
pub trait FiscalConfigStore: Send + Sync {
    async fn fiscal_year(&self, year: i32) -> Result<Option<FiscalYearConfig>>;
}
