use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock of one product at one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub delta: i64,
    pub reason: String,
    pub resulting_quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFilter {
    pub location_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

impl InventoryFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        self.location_id.is_none_or(|id| item.location_id == id)
            && self.product_id.is_none_or(|id| item.product_id == id)
    }
}
