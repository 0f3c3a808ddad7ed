use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::gps::GpsLocation;
use crate::models::order::OrderStatus;
use crate::models::shift::ShiftStatus;

/// Lifecycle change published to live subscribers after it has been committed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    AllocationCreated {
        allocation_id: Uuid,
        vehicle_id: Uuid,
        driver_id: Uuid,
        date: NaiveDate,
    },
    AllocationReleased {
        allocation_id: Uuid,
    },
    ShiftChanged {
        shift_id: Uuid,
        driver_id: Uuid,
        status: ShiftStatus,
    },
    OrderChanged {
        order_id: Uuid,
        driver_id: Option<Uuid>,
        status: OrderStatus,
    },
    GpsAdmitted(GpsLocation),
}
