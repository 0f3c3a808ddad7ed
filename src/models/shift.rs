use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::Order;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Scheduled,
    Active,
    Completed,
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShiftStatus::Scheduled => "scheduled",
            ShiftStatus::Active => "active",
            ShiftStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// A driver's working period for one operative date.
///
/// `allocation_id` stays empty while the shift is only scheduled and is bound
/// when the shift is activated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub allocation_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: ShiftStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Shift {
    pub fn is_active(&self) -> bool {
        self.status == ShiftStatus::Active
    }
}

/// A shift together with the orders its driver holds for the shift date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftDetail {
    #[serde(flatten)]
    pub shift: Shift,
    pub orders: Vec<Order>,
}
