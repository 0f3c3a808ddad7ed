use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Orders in these states still need their driver and block clock-out.
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Assigned | OrderStatus::InProgress)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub status: OrderStatus,
    pub assigned_driver_id: Option<Uuid>,
    pub assigned_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Failed,
}

/// Audit record of one driver's work on an order during one shift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderAttempt {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shift_id: Uuid,
    pub driver_id: Uuid,
    pub status: AttemptStatus,
    pub failure_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub attempts: Vec<OrderAttempt>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub driver_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|status| order.status == status)
            && self
                .driver_id
                .is_none_or(|driver| order.assigned_driver_id == Some(driver))
            && self.date.is_none_or(|date| order.assigned_date == Some(date))
    }
}
