use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exclusive binding of one vehicle to one driver for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationChanges {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

impl AllocationChanges {
    pub fn is_empty(&self) -> bool {
        self.vehicle_id.is_none() && self.driver_id.is_none() && self.date.is_none()
    }
}
