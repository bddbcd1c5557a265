use anyhow::{Context, Result};
use tracing::debug;

use crate::{Category, DateWindow, EventSource, WindowFlow};

/// Counts entries and exits for one category over one window.
#[derive(Clone, Copy)]
pub struct WindowAggregator<'a> {
    events: &'a dyn EventSource,
}

impl<'a> WindowAggregator<'a> {
    pub fn new(events: &'a dyn EventSource) -> Self {
        Self { events }
    }

    /// Entries and exits are independent reads and are issued together.
    pub async fn aggregate(&self, category: Category, window: DateWindow) -> Result<WindowFlow> {
        let (entries, exits) = tokio::try_join!(
            self.events.count_distinct_entries(category, window),
            self.events.count_exits(category, window),
        )
        .with_context(|| {
            format!(
                "aggregate failed source={} category={} window={}",
                self.events.source_name(),
                category,
                window
            )
        })?;

        debug!(
            source = self.events.source_name(),
            %category,
            %window,
            entries,
            exits,
            "window aggregated"
        );

        Ok(WindowFlow { entries, exits })
    }
}
