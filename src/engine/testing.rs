use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::clock::FixedClock;
use crate::engine::{allocation, order};
use crate::models::allocation::Allocation;
use crate::models::order::Order;
use crate::state::{utc, AppState};

/// An application state pinned to 2026-01-21 with one driver, vehicle,
/// destination and product registered.
pub(crate) struct Fixture {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub today: NaiveDate,
    pub driver: Uuid,
    pub vehicle: Uuid,
    pub location: Uuid,
    pub product: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        let today = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
        let clock = Arc::new(FixedClock::at_date(today));
        let state = AppState::with_clock(16, clock.clone(), utc());

        let driver = state.reference.create_driver("D1", None).unwrap().id;
        let vehicle = state
            .reference
            .create_vehicle("V1", Some(20_000))
            .unwrap()
            .id;
        let location = state.reference.create_location("T1", None).unwrap().id;
        let product = state.reference.create_product("Diesel", "litre").unwrap().id;

        Self {
            state,
            clock,
            today,
            driver,
            vehicle,
            location,
            product,
        }
    }

    pub fn add_driver(&self, name: &str) -> Uuid {
        self.state.reference.create_driver(name, None).unwrap().id
    }

    pub fn add_vehicle(&self, registration: &str) -> Uuid {
        self.state
            .reference
            .create_vehicle(registration, None)
            .unwrap()
            .id
    }

    pub async fn allocate_today(&self) -> Allocation {
        allocation::allocate(&self.state, self.vehicle, self.driver, self.today)
            .await
            .unwrap()
    }

    pub async fn assigned_order(&self, quantity: i64) -> Order {
        order::create(
            &self.state,
            order::NewOrder {
                destination_id: self.location,
                product_id: self.product,
                quantity,
                driver_id: Some(self.driver),
                date: Some(self.today),
            },
        )
        .await
        .unwrap()
    }

    /// Stock of the fixture product at the fixture destination, if any.
    pub async fn stock(&self) -> Option<i64> {
        self.state
            .store
            .begin()
            .await
            .inventory_at(self.location, self.product)
            .map(|item| item.quantity)
    }
}
