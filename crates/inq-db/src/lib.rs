//! inq-db
//!
//! PostgreSQL access for the case register: connection, embedded migrations,
//! the [`PgStore`] Event Source / fiscal store, and the administrative writes
//! (fiscal-year configuration, case intake and closure).

mod store;

pub use store::PgStore;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use inq_reconcile::{CaseRecord, FiscalYearConfig, RegistrationRecord};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;

pub const ENV_DB_URL: &str = "INQ_DATABASE_URL";

/// Connect to Postgres using INQ_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 5).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Pool for DB-backed tests: connects from env and applies migrations.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_cases_table: bool,
    pub has_fiscal_years_table: bool,
    /// `lower()` folds non-ASCII letters; see [`verify_case_folding`].
    pub case_folding_ok: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (has_cases, has_fiscal): (bool, bool) = sqlx::query_as(
        r#"
        select
          exists (select 1 from information_schema.tables
                  where table_schema = 'public' and table_name = 'cases'),
          exists (select 1 from information_schema.tables
                  where table_schema = 'public' and table_name = 'fiscal_years')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_cases_table: has_cases,
        has_fiscal_years_table: has_fiscal,
        case_folding_ok: case_folding_ok(pool).await?,
    })
}

/// Accented capitals the marker convention relies on folding ("PRECATÓRIA").
const CASE_FOLDING_SAMPLE: (&str, &str) = ("ÁÀÂÃÉÊÍÓÔÕÚÇ", "áàâãéêíóôõúç");

async fn case_folding_ok(pool: &PgPool) -> Result<bool> {
    let (ok,): (bool,) = sqlx::query_as("select lower($1) = $2 and $1 ilike $2")
        .bind(CASE_FOLDING_SAMPLE.0)
        .bind(CASE_FOLDING_SAMPLE.1)
        .fetch_one(pool)
        .await
        .context("case folding query failed")?;
    Ok(ok)
}

/// The category marker is matched with `ILIKE`, which folds case by the
/// database's LC_CTYPE. A C/POSIX ctype leaves "Ó" alone while the in-memory
/// source folds it, so refuse such a database instead of miscounting.
pub async fn verify_case_folding(pool: &PgPool) -> Result<()> {
    if !case_folding_ok(pool).await? {
        bail!(
            "DB_CASE_FOLDING_UNSUPPORTED: lower()/ILIKE do not fold non-ASCII letters; \
             create the database with a UTF-8 locale (e.g. LC_CTYPE=pt_PT.UTF-8)"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fiscal-year configuration
// ---------------------------------------------------------------------------

pub async fn fetch_fiscal_year(pool: &PgPool, year: i32) -> Result<Option<FiscalYearConfig>> {
    let row = sqlx::query(
        r#"
        select year, opening_stock_ordinary, opening_stock_deprecated
        from fiscal_years
        where year = $1
        "#,
    )
    .bind(year)
    .fetch_optional(pool)
    .await
    .context("fetch_fiscal_year failed")?;

    row.map(|r| fiscal_from_row(&r)).transpose()
}

pub async fn list_fiscal_years(pool: &PgPool) -> Result<Vec<FiscalYearConfig>> {
    let rows = sqlx::query(
        r#"
        select year, opening_stock_ordinary, opening_stock_deprecated
        from fiscal_years
        order by year asc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_fiscal_years failed")?;

    rows.iter().map(fiscal_from_row).collect()
}

fn fiscal_from_row(r: &sqlx::postgres::PgRow) -> Result<FiscalYearConfig> {
    Ok(FiscalYearConfig {
        year: r.try_get("year").context("fiscal_years.year")?,
        opening_stock_ordinary: r
            .try_get("opening_stock_ordinary")
            .context("fiscal_years.opening_stock_ordinary")?,
        opening_stock_deprecated: r
            .try_get("opening_stock_deprecated")
            .context("fiscal_years.opening_stock_deprecated")?,
    })
}

/// Insert or replace one year's opening stock. Changes every report that
/// reads this year, past ones included.
pub async fn upsert_fiscal_year(pool: &PgPool, cfg: &FiscalYearConfig) -> Result<()> {
    cfg.validate()?;

    sqlx::query(
        r#"
        insert into fiscal_years (year, opening_stock_ordinary, opening_stock_deprecated)
        values ($1, $2, $3)
        on conflict (year) do update set
          opening_stock_ordinary = excluded.opening_stock_ordinary,
          opening_stock_deprecated = excluded.opening_stock_deprecated,
          updated_at_utc = now()
        "#,
    )
    .bind(cfg.year)
    .bind(cfg.opening_stock_ordinary)
    .bind(cfg.opening_stock_deprecated)
    .execute(pool)
    .await
    .context("upsert_fiscal_year failed")?;

    info!(
        year = cfg.year,
        ordinary = cfg.opening_stock_ordinary,
        deprecated = cfg.opening_stock_deprecated,
        "fiscal year opening stock written"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Case register
// ---------------------------------------------------------------------------

pub async fn insert_case(pool: &PgPool, case: &CaseRecord) -> Result<()> {
    sqlx::query(
        r#"
        insert into cases (identifier, registered_at, closed_at, state, annotation)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&case.identifier)
    .bind(case.registered_at)
    .bind(case.closed_at)
    .bind(case.state.as_str())
    .bind(&case.annotation)
    .execute(pool)
    .await
    .with_context(|| format!("insert_case failed identifier={}", case.identifier))?;
    Ok(())
}

pub async fn insert_registration(pool: &PgPool, reg: &RegistrationRecord) -> Result<()> {
    sqlx::query(
        r#"
        insert into case_registrations (identifier, registered_at, annotation)
        values ($1, $2, $3)
        "#,
    )
    .bind(&reg.identifier)
    .bind(reg.registered_at)
    .bind(&reg.annotation)
    .execute(pool)
    .await
    .with_context(|| format!("insert_registration failed identifier={}", reg.identifier))?;
    Ok(())
}

/// Close a case: open -> closed, stamping `closed_at`. A case closes once.
pub async fn close_case(pool: &PgPool, identifier: &str, closed_at: NaiveDate) -> Result<()> {
    let res = sqlx::query(
        r#"
        update cases
        set state = 'closed',
            closed_at = $2
        where identifier = $1
          and state = 'open'
        "#,
    )
    .bind(identifier)
    .bind(closed_at)
    .execute(pool)
    .await
    .with_context(|| format!("close_case update failed identifier={identifier}"))?;

    if res.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<(String,)> = sqlx::query_as("select state from cases where identifier = $1")
        .bind(identifier)
        .fetch_optional(pool)
        .await
        .context("close_case lookup failed")?;

    match exists {
        Some(_) => Err(anyhow!("CASE_ALREADY_CLOSED identifier={}", identifier)),
        None => Err(anyhow!("case not found: {}", identifier)),
    }
}
