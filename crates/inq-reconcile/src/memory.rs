//! In-process [`EventSource`] / [`FiscalConfigStore`].
//!
//! Backs offline reports built from CSV exports and the scenario tests. Applies
//! the same rules as the Postgres source: inclusive dates, marker
//! classification per row, entries deduplicated by [`normalize_identifier`]
//! across cases and registrations, exits counted per closed case.
//!
//! The Postgres source binds the same [`IDENTIFIER_TRIM_CHARS`] and uppercases
//! ASCII only, so identifiers agree on any server. The marker match agrees only
//! on a database whose `lower()` folds accented letters (a UTF-8 LC_CTYPE).
//!
//! [`IDENTIFIER_TRIM_CHARS`]: crate::IDENTIFIER_TRIM_CHARS

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use crate::{
    normalize_identifier, CaseRecord, Category, CategoryMarker, DateWindow, EventSource,
    FiscalConfigStore, FiscalYearConfig, RegistrationRecord,
};

#[derive(Clone, Debug, Default)]
pub struct MemoryEventSource {
    marker: CategoryMarker,
    cases: Vec<CaseRecord>,
    registrations: Vec<RegistrationRecord>,
}

impl MemoryEventSource {
    pub fn new(marker: CategoryMarker) -> Self {
        Self {
            marker,
            cases: Vec::new(),
            registrations: Vec::new(),
        }
    }

    pub fn with_records(
        marker: CategoryMarker,
        cases: Vec<CaseRecord>,
        registrations: Vec<RegistrationRecord>,
    ) -> Self {
        Self {
            marker,
            cases,
            registrations,
        }
    }

    pub fn push_case(&mut self, case: CaseRecord) {
        self.cases.push(case);
    }

    pub fn push_registration(&mut self, registration: RegistrationRecord) {
        self.registrations.push(registration);
    }

    pub fn cases(&self) -> &[CaseRecord] {
        &self.cases
    }

    pub fn registrations(&self) -> &[RegistrationRecord] {
        &self.registrations
    }

    pub fn marker(&self) -> &CategoryMarker {
        &self.marker
    }

    fn entry_set(&self, category: Category, window: DateWindow) -> BTreeSet<String> {
        let from_cases = self
            .cases
            .iter()
            .map(|c| (&c.identifier, c.registered_at, c.annotation.as_deref()));
        let from_registrations = self
            .registrations
            .iter()
            .map(|r| (&r.identifier, r.registered_at, r.annotation.as_deref()));

        from_cases
            .chain(from_registrations)
            .filter(|(_, registered_at, annotation)| {
                window.contains(*registered_at) && self.marker.matches(category, *annotation)
            })
            .map(|(identifier, _, _)| normalize_identifier(identifier))
            .filter(|key| !key.is_empty())
            .collect()
    }
}

#[async_trait::async_trait]
impl EventSource for MemoryEventSource {
    fn source_name(&self) -> &'static str {
        "memory"
    }

    async fn count_distinct_entries(&self, category: Category, window: DateWindow) -> Result<i64> {
        Ok(self.entry_set(category, window).len() as i64)
    }

    async fn count_exits(&self, category: Category, window: DateWindow) -> Result<i64> {
        let n = self
            .cases
            .iter()
            .filter(|c| c.is_closed())
            .filter(|c| c.closed_at.is_some_and(|d| window.contains(d)))
            .filter(|c| self.marker.matches(category, c.annotation.as_deref()))
            .count();
        Ok(n as i64)
    }

    async fn entry_identifiers(
        &self,
        category: Category,
        window: DateWindow,
    ) -> Result<Vec<String>> {
        Ok(self.entry_set(category, window).into_iter().collect())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryFiscalStore {
    years: BTreeMap<i32, FiscalYearConfig>,
}

impl MemoryFiscalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the configuration for `cfg.year`.
    pub fn upsert(&mut self, cfg: FiscalYearConfig) {
        self.years.insert(cfg.year, cfg);
    }

    pub fn remove(&mut self, year: i32) -> Option<FiscalYearConfig> {
        self.years.remove(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = &FiscalYearConfig> {
        self.years.values()
    }
}

#[async_trait::async_trait]
impl FiscalConfigStore for MemoryFiscalStore {
    async fn fiscal_year(&self, year: i32) -> Result<Option<FiscalYearConfig>> {
        Ok(self.years.get(&year).copied())
    }
}
