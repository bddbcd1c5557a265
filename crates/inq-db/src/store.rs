//! Postgres-backed [`EventSource`] and [`FiscalConfigStore`].
//!
//! Each count is a single statement. The category filter is the marker's
//! `ILIKE` pattern bound as `$3`, applied per row, so a case lands in exactly
//! one category per source row.
//!
//! Identifier normalization mirrors [`inq_reconcile::normalize_identifier`]:
//! the trim set is bound as `$4` and only ASCII letters are uppercased, so the
//! dedup key does not depend on the server locale. The marker match does: it
//! needs a database whose `lower()` folds non-ASCII letters, which
//! [`verify_case_folding`](crate::verify_case_folding) checks.

use anyhow::{Context, Result};
use inq_reconcile::{
    identifier_trim_set, Category, CategoryMarker, DateWindow, EventSource, FiscalConfigStore,
    FiscalYearConfig,
};
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    marker: CategoryMarker,
}

impl PgStore {
    pub fn new(pool: PgPool, marker: CategoryMarker) -> Self {
        Self { pool, marker }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn category_filter(category: Category) -> &'static str {
    match category {
        Category::Deprecated => r"coalesce(annotation, '') ilike $3 escape '\'",
        Category::Ordinary => r"coalesce(annotation, '') not ilike $3 escape '\'",
    }
}

/// Normalized identifiers from both entry tables, before category filtering.
/// `$4` is the identifier trim set.
const ENTRY_UNION: &str = r#"
    select translate(btrim(identifier, $4),
                     'abcdefghijklmnopqrstuvwxyz',
                     'ABCDEFGHIJKLMNOPQRSTUVWXYZ') as ident,
           annotation
    from cases
    where registered_at between $1 and $2
    union all
    select translate(btrim(identifier, $4),
                     'abcdefghijklmnopqrstuvwxyz',
                     'ABCDEFGHIJKLMNOPQRSTUVWXYZ') as ident,
           annotation
    from case_registrations
    where registered_at between $1 and $2
"#;

#[async_trait::async_trait]
impl EventSource for PgStore {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn count_distinct_entries(&self, category: Category, window: DateWindow) -> Result<i64> {
        let sql = format!(
            "select count(distinct ident)::bigint from ({ENTRY_UNION}) entries \
             where ident <> '' and {}",
            category_filter(category)
        );
        let (n,): (i64,) = sqlx::query_as(&sql)
            .bind(window.from())
            .bind(window.to())
            .bind(self.marker.like_pattern())
            .bind(identifier_trim_set())
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("count_distinct_entries failed category={category}"))?;
        Ok(n)
    }

    async fn count_exits(&self, category: Category, window: DateWindow) -> Result<i64> {
        let sql = format!(
            "select count(*)::bigint from cases \
             where state = 'closed' and closed_at between $1 and $2 and {}",
            category_filter(category)
        );
        let (n,): (i64,) = sqlx::query_as(&sql)
            .bind(window.from())
            .bind(window.to())
            .bind(self.marker.like_pattern())
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("count_exits failed category={category}"))?;
        Ok(n)
    }

    async fn entry_identifiers(
        &self,
        category: Category,
        window: DateWindow,
    ) -> Result<Vec<String>> {
        let sql = format!(
            "select distinct ident from ({ENTRY_UNION}) entries \
             where ident <> '' and {} order by ident collate \"C\" asc",
            category_filter(category)
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(window.from())
            .bind(window.to())
            .bind(self.marker.like_pattern())
            .bind(identifier_trim_set())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("entry_identifiers failed category={category}"))?;
        Ok(rows.into_iter().map(|(ident,)| ident).collect())
    }
}

#[async_trait::async_trait]
impl FiscalConfigStore for PgStore {
    async fn fiscal_year(&self, year: i32) -> Result<Option<FiscalYearConfig>> {
        crate::fetch_fiscal_year(&self.pool, year).await
    }
}
