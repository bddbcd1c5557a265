//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (`/database/url_env`).
//! - Callers resolve once at startup and pass [`ResolvedSecrets`] on; no
//!   scattered `std::env::var` calls.
//! - `Debug` redacts values. Errors name the env var, never its value.

use anyhow::{bail, Result};

use crate::settings::ReportSettings;

/// Whether the calling command needs a database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseRequirement {
    Required,
    Optional,
}

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Env var the URL was read from (safe to print).
    pub database_url_env: String,
    /// Postgres connection URL. `None` when unset/blank and not required.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url_env", &self.database_url_env)
            .field("database_url", &self.database_url.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// # Errors
/// SECRETS_MISSING naming the env var when `requirement` is `Required` and the
/// variable is unset or blank.
pub fn resolve_secrets(
    settings: &ReportSettings,
    requirement: DatabaseRequirement,
) -> Result<ResolvedSecrets> {
    let database_url_env = settings.database_url_env.clone();
    let database_url = resolve_env(&database_url_env);

    if requirement == DatabaseRequirement::Required && database_url.is_none() {
        bail!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            database_url_env
        );
    }

    Ok(ResolvedSecrets {
        database_url_env,
        database_url,
    })
}
