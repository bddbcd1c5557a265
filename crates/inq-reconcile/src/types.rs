use std::fmt;

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The two case populations reported side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ordinary,
    /// Cases whose annotation carries the "precatória" marker.
    Deprecated,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Ordinary, Category::Deprecated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ordinary => "ordinary",
            Category::Deprecated => "deprecated",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ordinary" | "ordinario" | "ordinário" => Ok(Category::Ordinary),
            "deprecated" | "precatoria" | "precatória" => Ok(Category::Deprecated),
            other => Err(anyhow!(
                "invalid category '{}'. expected one of: ordinary | deprecated",
                other
            )),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Open,
    Closed,
}

impl CaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseState::Open => "open",
            CaseState::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(CaseState::Open),
            "closed" => Ok(CaseState::Closed),
            other => Err(anyhow!("invalid case state: {}", other)),
        }
    }
}

/// One inquiry as held in the canonical case table.
///
/// `closed_at` is set exactly once, when the case moves to [`CaseState::Closed`].
/// `closed_at >= registered_at` is assumed by the reports but never checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub identifier: String,
    pub registered_at: NaiveDate,
    pub closed_at: Option<NaiveDate>,
    pub state: CaseState,
    pub annotation: Option<String>,
}

impl CaseRecord {
    pub fn open(identifier: impl Into<String>, registered_at: NaiveDate) -> Self {
        Self {
            identifier: identifier.into(),
            registered_at,
            closed_at: None,
            state: CaseState::Open,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn closed_on(mut self, closed_at: NaiveDate) -> Self {
        self.closed_at = Some(closed_at);
        self.state = CaseState::Closed;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.state == CaseState::Closed
    }
}

/// A row of the secondary entry log. Only ever contributes entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub identifier: String,
    pub registered_at: NaiveDate,
    pub annotation: Option<String>,
}

impl RegistrationRecord {
    pub fn new(identifier: impl Into<String>, registered_at: NaiveDate) -> Self {
        Self {
            identifier: identifier.into(),
            registered_at,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

/// Administratively maintained opening stock for one calendar year.
///
/// A stock of `0` means "not configured" and triggers carry-forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearConfig {
    pub year: i32,
    pub opening_stock_ordinary: i64,
    pub opening_stock_deprecated: i64,
}

impl FiscalYearConfig {
    pub fn new(year: i32, opening_stock_ordinary: i64, opening_stock_deprecated: i64) -> Self {
        Self {
            year,
            opening_stock_ordinary,
            opening_stock_deprecated,
        }
    }

    /// Opening stocks are counts of open cases and cannot be negative.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            if self.opening_stock(category) < 0 {
                bail!(
                    "opening stock must be >= 0 (year={} category={} value={})",
                    self.year,
                    category,
                    self.opening_stock(category)
                );
            }
        }
        Ok(())
    }

    /// Literal stored value, 0 included.
    pub fn opening_stock(&self, category: Category) -> i64 {
        match category {
            Category::Ordinary => self.opening_stock_ordinary,
            Category::Deprecated => self.opening_stock_deprecated,
        }
    }

    /// Stored value, or `None` when it is the 0 sentinel.
    pub fn configured_stock(&self, category: Category) -> Option<i64> {
        match self.opening_stock(category) {
            0 => None,
            n => Some(n),
        }
    }
}

/// Inclusive calendar-date window `[from, to]`.
///
/// Construction guarantees `from <= to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if to < from {
            bail!("WINDOW_INVALID: end {} is before start {}", to, from);
        }
        Ok(Self { from, to })
    }

    /// The whole calendar month `month` (1..=12) of `year`.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("WINDOW_INVALID: month {} is outside 1..=12", month);
        }
        let from = ymd(year, month, 1)?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let to = ymd(next_year, next_month, 1)?
            .pred_opt()
            .ok_or_else(|| anyhow!("WINDOW_INVALID: no last day for {}-{:02}", year, month))?;
        Self::new(from, to)
    }

    pub fn full_year(year: i32) -> Result<Self> {
        Self::new(ymd(year, 1, 1)?, ymd(year, 12, 31)?)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Calendar year of the window start; the fiscal year the window reports on.
    pub fn year(&self) -> i32 {
        self.from.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn starts_year(&self) -> bool {
        self.from.month() == 1 && self.from.day() == 1
    }

    /// `[Jan 1, from - 1 day]` of the window's year, or `None` when the window
    /// already starts on Jan 1.
    pub fn year_to_date_before(&self) -> Result<Option<DateWindow>> {
        if self.starts_year() {
            return Ok(None);
        }
        let jan1 = ymd(self.year(), 1, 1)?;
        let day_before = self
            .from
            .pred_opt()
            .ok_or_else(|| anyhow!("WINDOW_INVALID: no day before {}", self.from))?;
        Ok(Some(Self::new(jan1, day_before)?))
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow!("WINDOW_INVALID: {}-{:02}-{:02} is not a date", year, month, day))
}

/// Raw movement inside a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFlow {
    pub entries: i64,
    pub exits: i64,
}

impl WindowFlow {
    pub fn net(&self) -> i64 {
        self.entries - self.exits
    }
}

/// One reconciled row of the statistics table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindowResult {
    /// Stock at window start ("pendentes do período anterior").
    pub opening_backlog: i64,
    /// Distinct cases registered in the window ("entrados").
    pub entries: i64,
    /// Closures in the window ("concluídos").
    pub exits: i64,
    /// Stock carried out of the window ("transitam"). May be negative.
    pub closing_backlog: i64,
}

impl ReportWindowResult {
    pub fn roll_forward(opening_backlog: i64, flow: WindowFlow) -> Self {
        Self {
            opening_backlog,
            entries: flow.entries,
            exits: flow.exits,
            closing_backlog: opening_backlog + flow.net(),
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.closing_backlog == self.opening_backlog + self.entries - self.exits
    }
}

/// Both categories for one requested window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyReport {
    pub window: DateWindow,
    pub ordinary: ReportWindowResult,
    pub deprecated: ReportWindowResult,
}

impl MonthlyReport {
    pub fn for_category(&self, category: Category) -> &ReportWindowResult {
        match category {
            Category::Ordinary => &self.ordinary,
            Category::Deprecated => &self.deprecated,
        }
    }
}

/// Month-by-month table for one year plus the year-to-date total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct YearReport {
    pub year: i32,
    pub opening_stock_ordinary: i64,
    pub opening_stock_deprecated: i64,
    pub months: Vec<MonthlyReport>,
    /// Reconciliation of `[Jan 1, end of last month]` taken as a single window.
    pub total: MonthlyReport,
}
