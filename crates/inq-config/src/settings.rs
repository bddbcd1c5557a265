//! Typed view over the merged configuration.
//!
//! | pointer                             | type   | default              |
//! |-------------------------------------|--------|----------------------|
//! | `/classification/deprecated_marker` | string | `precatória`         |
//! | `/database/url_env`                 | string | `INQ_DATABASE_URL`   |
//! | `/database/max_connections`         | int    | `5`                  |
//! | `/report/timezone`                  | IANA   | `Europe/Lisbon`      |
//! | `/rollover/allow_overwrite`         | bool   | `false`              |

use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use serde_json::Value;

pub use inq_reconcile::DEFAULT_DEPRECATED_MARKER;
pub const DEFAULT_DATABASE_URL_ENV: &str = "INQ_DATABASE_URL";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_TIMEZONE: &str = "Europe/Lisbon";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub deprecated_marker: String,
    pub database_url_env: String,
    pub max_connections: u32,
    /// Only used to decide what "the current month" is.
    pub timezone: Tz,
    pub allow_rollover_overwrite: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            deprecated_marker: DEFAULT_DEPRECATED_MARKER.to_string(),
            database_url_env: DEFAULT_DATABASE_URL_ENV.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            timezone: chrono_tz::Europe::Lisbon,
            allow_rollover_overwrite: false,
        }
    }
}

impl ReportSettings {
    /// Absent keys take defaults; present keys of the wrong type are errors.
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let defaults = Self::default();

        let deprecated_marker = match opt_str(config, "/classification/deprecated_marker")? {
            Some(s) if s.trim().is_empty() => {
                bail!("CONFIG_INVALID /classification/deprecated_marker must not be blank")
            }
            Some(s) => s,
            None => defaults.deprecated_marker,
        };

        let database_url_env = match opt_str(config, "/database/url_env")? {
            Some(s) if s.trim().is_empty() => {
                bail!("CONFIG_INVALID /database/url_env must not be blank")
            }
            Some(s) => s.trim().to_string(),
            None => defaults.database_url_env,
        };

        let max_connections = match config.pointer("/database/max_connections") {
            None | Some(Value::Null) => defaults.max_connections,
            Some(v) => v
                .as_u64()
                .filter(|n| (1..=u32::MAX as u64).contains(n))
                .map(|n| n as u32)
                .ok_or_else(|| {
                    anyhow!("CONFIG_INVALID /database/max_connections must be a positive integer")
                })?,
        };

        let timezone = match opt_str(config, "/report/timezone")? {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| anyhow!("CONFIG_INVALID /report/timezone unknown zone '{}'", name))?,
            None => defaults.timezone,
        };

        let allow_rollover_overwrite = match config.pointer("/rollover/allow_overwrite") {
            None | Some(Value::Null) => defaults.allow_rollover_overwrite,
            Some(v) => v.as_bool().ok_or_else(|| {
                anyhow!("CONFIG_INVALID /rollover/allow_overwrite must be a boolean")
            })?,
        };

        Ok(Self {
            deprecated_marker,
            database_url_env,
            max_connections,
            timezone,
            allow_rollover_overwrite,
        })
    }
}

fn opt_str(config: &Value, pointer: &str) -> Result<Option<String>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(anyhow!("CONFIG_INVALID {} must be a string", pointer)),
    }
}
