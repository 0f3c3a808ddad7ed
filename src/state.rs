use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tokio::sync::broadcast;

use crate::clock::{operative_date, Clock, SystemClock};
use crate::engine::reference::ReferenceRegistry;
use crate::models::event::FleetEvent;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub reference: ReferenceRegistry,
    pub clock: Arc<dyn Clock>,
    pub operative_offset: FixedOffset,
    pub events_tx: broadcast::Sender<FleetEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_clock(event_buffer_size, Arc::new(SystemClock), utc())
    }

    pub fn with_clock(
        event_buffer_size: usize,
        clock: Arc<dyn Clock>,
        operative_offset: FixedOffset,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store: Store::new(),
            reference: ReferenceRegistry::new(clock.clone()),
            clock,
            operative_offset,
            events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        operative_date(self.clock.now(), self.operative_offset)
    }

    /// Publishes a committed change; having no subscribers is not an error.
    pub fn publish(&self, event: FleetEvent) {
        let _ = self.events_tx.send(event);
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}
