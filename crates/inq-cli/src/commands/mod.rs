//! Command handler modules for inq-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod fiscal;
pub mod report;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use inq_config::{
    report_unused_keys, resolve_secrets, ConfigMode, DatabaseRequirement, LoadedConfig,
    ReportSettings, UnusedKeyPolicy,
};
use inq_db::PgStore;
use inq_reconcile::{
    loader, Category, CategoryMarker, EventSource, FiscalConfigStore, MemoryEventSource,
    MemoryFiscalStore, Reconciler,
};
use sqlx::PgPool;
use std::path::Path;
use tracing::warn;

/// Merged configuration plus the typed settings every command reads.
pub struct CommandContext {
    pub loaded: LoadedConfig,
    pub settings: ReportSettings,
    pub marker: CategoryMarker,
}

impl CommandContext {
    /// No paths means built-in defaults. Unused keys are logged, not fatal.
    pub fn load(config_paths: &[String], mode: ConfigMode) -> Result<Self> {
        let loaded = if config_paths.is_empty() {
            LoadedConfig::defaults()?
        } else {
            let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
            inq_config::load_layered_yaml(&path_refs)?
        };

        let unused = report_unused_keys(mode, &loaded.config_json, UnusedKeyPolicy::Warn)?;
        if !unused.is_clean() {
            warn!(
                mode = %unused.mode,
                keys = ?unused.unused_leaf_pointers,
                "config keys not read in this mode"
            );
        }

        let settings = ReportSettings::from_config_json(&loaded.config_json)?;
        let marker = CategoryMarker::new(&settings.deprecated_marker)?;

        Ok(Self {
            loaded,
            settings,
            marker,
        })
    }

    /// Pool for the URL held by the configured env var.
    pub async fn connect_db(&self) -> Result<PgPool> {
        let secrets = resolve_secrets(&self.settings, DatabaseRequirement::Required)?;
        let url = secrets.database_url.as_deref().ok_or_else(|| {
            anyhow!(
                "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
                secrets.database_url_env
            )
        })?;
        inq_db::connect(url, self.settings.max_connections).await
    }

    /// CSV export directory when given, otherwise the database.
    pub async fn open_backend(&self, csv_dir: Option<&Path>) -> Result<Backend> {
        match csv_dir {
            Some(dir) => {
                let (events, fiscal) = loader::load_csv_dir(dir, self.marker.clone())
                    .with_context(|| format!("load csv dir failed: {}", dir.display()))?;
                Ok(Backend::Csv { events, fiscal })
            }
            None => Ok(Backend::Postgres(self.pg_store().await?)),
        }
    }

    /// Postgres Event Source, refused when the database cannot fold the
    /// marker's case the way the in-memory source does.
    pub async fn pg_store(&self) -> Result<PgStore> {
        let pool = self.connect_db().await?;
        inq_db::verify_case_folding(&pool).await?;
        Ok(PgStore::new(pool, self.marker.clone()))
    }

    /// (year, month) of "now" in the configured report timezone.
    pub fn current_year_month(&self) -> (i32, u32) {
        let now = Utc::now().with_timezone(&self.settings.timezone);
        (now.year(), now.month())
    }
}

pub enum Backend {
    Csv {
        events: MemoryEventSource,
        fiscal: MemoryFiscalStore,
    },
    Postgres(PgStore),
}

impl Backend {
    pub fn events(&self) -> &dyn EventSource {
        match self {
            Backend::Csv { events, .. } => events,
            Backend::Postgres(store) => store,
        }
    }

    pub fn fiscal(&self) -> &dyn FiscalConfigStore {
        match self {
            Backend::Csv { fiscal, .. } => fiscal,
            Backend::Postgres(store) => store,
        }
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self.events(), self.fiscal())
    }
}

pub fn parse_category(raw: &str) -> Result<Category> {
    Category::parse(raw).with_context(|| format!("invalid --category '{}'", raw))
}

/// `YYYY-MM-DD`.
pub fn parse_date(flag: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid --{} '{}': expected YYYY-MM-DD", flag, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_iso_only() {
        assert_eq!(
            parse_date("from", "2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("from", "29/02/2024").is_err());
        assert!(parse_date("to", "2023-02-29").is_err());
    }

    #[test]
    fn context_without_config_uses_defaults() {
        let ctx = CommandContext::load(&[], ConfigMode::Report).unwrap();
        assert_eq!(ctx.marker.as_str(), "precatória");
        assert_eq!(ctx.settings.max_connections, 5);
        assert!(!ctx.settings.allow_rollover_overwrite);
    }
}
