//! inq-reconcile
//!
//! Case-stock reconciliation for the monthly statistics reports.
//!
//! Rules:
//! - The opening stock of a fiscal year is the configured value, or (when the
//!   configured value is 0 / absent) the prior year's configured stock plus the
//!   prior year's net flow. Carry-forward goes back exactly one year.
//! - Entries are distinct case identifiers registered in a window, across both
//!   entry sources.
//! - Exits are closure events in a window.
//! - `closing = opening + entries - exits`. Never clamped.
//! - Ordinary and deprecated ("precatória") cases are reconciled independently.
//!
//! All IO sits behind [`EventSource`] and [`FiscalConfigStore`]. Everything else
//! is arithmetic over their answers.

mod aggregate;
mod carry;
mod classify;
pub mod loader;
mod memory;
mod period;
mod source;
mod types;

pub use aggregate::WindowAggregator;
pub use carry::CarryForwardResolver;
pub use classify::{
    identifier_trim_set, normalize_identifier, CategoryMarker, DEFAULT_DEPRECATED_MARKER,
    IDENTIFIER_TRIM_CHARS,
};
pub use memory::{MemoryEventSource, MemoryFiscalStore};
pub use period::Reconciler;
pub use source::{EventSource, FiscalConfigStore};
pub use types::*;
