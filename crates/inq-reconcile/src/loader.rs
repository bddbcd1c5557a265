//! CSV loader for offline reports.
//!
//! A source directory holds up to three exports:
//!
//! - `cases.csv` (required): `identifier,registered_at,closed_at,state,annotation`.
//!   `state` is optional and defaults to `closed` when `closed_at` is present,
//!   `open` otherwise.
//! - `registrations.csv` (optional): `identifier,registered_at,annotation`
//! - `fiscal_years.csv` (optional): `year,opening_stock_ordinary,opening_stock_deprecated`
//!
//! Dates are `YYYY-MM-DD`. Empty fields are absent values.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    CaseRecord, CaseState, CategoryMarker, FiscalYearConfig, MemoryEventSource,
    MemoryFiscalStore, RegistrationRecord,
};

pub const CASES_FILE: &str = "cases.csv";
pub const REGISTRATIONS_FILE: &str = "registrations.csv";
pub const FISCAL_YEARS_FILE: &str = "fiscal_years.csv";

#[derive(Debug, Deserialize)]
struct CaseRow {
    identifier: String,
    registered_at: NaiveDate,
    #[serde(default)]
    closed_at: Option<NaiveDate>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    annotation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistrationRow {
    identifier: String,
    registered_at: NaiveDate,
    #[serde(default)]
    annotation: Option<String>,
}

pub fn parse_cases_csv(csv: &str) -> Result<Vec<CaseRecord>> {
    let mut rdr = csv::Reader::from_reader(csv.as_bytes());
    let mut out = Vec::new();

    for (i, rec) in rdr.deserialize::<CaseRow>().enumerate() {
        let line = i + 2;
        let row = rec.with_context(|| format!("cases.csv line {}: bad row", line))?;

        let state = match row.state.as_deref() {
            Some(s) => CaseState::parse(s).with_context(|| format!("cases.csv line {}", line))?,
            None if row.closed_at.is_some() => CaseState::Closed,
            None => CaseState::Open,
        };
        match (state, row.closed_at) {
            (CaseState::Closed, None) => {
                bail!("cases.csv line {}: closed case without closed_at", line)
            }
            (CaseState::Open, Some(_)) => {
                bail!("cases.csv line {}: open case with closed_at", line)
            }
            _ => {}
        }

        out.push(CaseRecord {
            identifier: row.identifier,
            registered_at: row.registered_at,
            closed_at: row.closed_at,
            state,
            annotation: row.annotation,
        });
    }

    Ok(out)
}

pub fn parse_registrations_csv(csv: &str) -> Result<Vec<RegistrationRecord>> {
    let mut rdr = csv::Reader::from_reader(csv.as_bytes());
    let mut out = Vec::new();

    for (i, rec) in rdr.deserialize::<RegistrationRow>().enumerate() {
        let row = rec.with_context(|| format!("registrations.csv line {}: bad row", i + 2))?;
        out.push(RegistrationRecord {
            identifier: row.identifier,
            registered_at: row.registered_at,
            annotation: row.annotation,
        });
    }

    Ok(out)
}

pub fn parse_fiscal_years_csv(csv: &str) -> Result<Vec<FiscalYearConfig>> {
    let mut rdr = csv::Reader::from_reader(csv.as_bytes());
    let mut out: Vec<FiscalYearConfig> = Vec::new();

    for (i, rec) in rdr.deserialize::<FiscalYearConfig>().enumerate() {
        let line = i + 2;
        let cfg = rec.with_context(|| format!("fiscal_years.csv line {}: bad row", line))?;
        cfg.validate().with_context(|| format!("fiscal_years.csv line {}", line))?;
        if out.iter().any(|c| c.year == cfg.year) {
            bail!("fiscal_years.csv line {}: duplicate year {}", line, cfg.year);
        }
        out.push(cfg);
    }

    Ok(out)
}

/// Load a CSV export directory into in-memory stores.
pub fn load_csv_dir(
    dir: impl AsRef<Path>,
    marker: CategoryMarker,
) -> Result<(MemoryEventSource, MemoryFiscalStore)> {
    let dir = dir.as_ref();

    let cases_path = dir.join(CASES_FILE);
    let raw = fs::read_to_string(&cases_path)
        .with_context(|| format!("failed to read {}", cases_path.display()))?;
    let cases = parse_cases_csv(&raw)?;

    let registrations = match read_optional(&dir.join(REGISTRATIONS_FILE))? {
        Some(raw) => parse_registrations_csv(&raw)?,
        None => Vec::new(),
    };

    let mut fiscal = MemoryFiscalStore::new();
    if let Some(raw) = read_optional(&dir.join(FISCAL_YEARS_FILE))? {
        for cfg in parse_fiscal_years_csv(&raw)? {
            fiscal.upsert(cfg);
        }
    }

    Ok((
        MemoryEventSource::with_records(marker, cases, registrations),
        fiscal,
    ))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(raw))
}
