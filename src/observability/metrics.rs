use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub order_transitions_total: IntCounterVec,
    pub active_shifts: IntGauge,
    pub gps_pings_total: IntCounterVec,
    pub inventory_credited_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Order status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid order_transitions_total metric");

        let active_shifts = IntGauge::new("active_shifts", "Shifts currently active")
            .expect("valid active_shifts metric");

        let gps_pings_total = IntCounterVec::new(
            Opts::new("gps_pings_total", "GPS pings by admission outcome"),
            &["outcome"],
        )
        .expect("valid gps_pings_total metric");

        let inventory_credited_total = IntCounter::new(
            "inventory_credited_total",
            "Units credited to inventory by completed orders",
        )
        .expect("valid inventory_credited_total metric");

        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(active_shifts.clone()))
            .expect("register active_shifts");
        registry
            .register(Box::new(gps_pings_total.clone()))
            .expect("register gps_pings_total");
        registry
            .register(Box::new(inventory_credited_total.clone()))
            .expect("register inventory_credited_total");

        Self {
            registry,
            order_transitions_total,
            active_shifts,
            gps_pings_total,
            inventory_credited_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
