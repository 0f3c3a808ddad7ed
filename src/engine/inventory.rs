use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::inventory::{InventoryAdjustment, InventoryFilter, InventoryItem};
use crate::state::AppState;
use crate::store::{StoreError, Tables, UnitOfWork};

/// Adds a delivered quantity to the stock at `location_id`, creating the row
/// on first delivery. Only called from order completion, inside its unit of
/// work.
pub(crate) fn credit_on_completion(
    uow: &mut UnitOfWork<'_>,
    location_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    at: DateTime<Utc>,
) -> Result<InventoryItem, StoreError> {
    let item = match uow.inventory_at(location_id, product_id).cloned() {
        Some(existing) => InventoryItem {
            quantity: existing
                .quantity
                .checked_add(quantity)
                .ok_or(StoreError::CheckViolation("ck_inventory_quantity_range"))?,
            updated_at: at,
            ..existing
        },
        None => InventoryItem {
            id: Uuid::new_v4(),
            location_id,
            product_id,
            quantity,
            updated_at: at,
        },
    };
    uow.put_inventory(item.clone())?;
    Ok(item)
}

/// Applies a signed manual correction and records it in the adjustment log.
pub async fn adjust(
    state: &AppState,
    inventory_id: Uuid,
    delta: i64,
    reason: &str,
) -> Result<InventoryItem, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "an adjustment reason is required".to_string(),
        ));
    }
    if delta == 0 {
        return Err(AppError::Validation("delta must not be zero".to_string()));
    }

    let now = state.now();
    let mut uow = state.store.begin().await;
    let current = find(&uow, inventory_id)?;
    let quantity = current
        .quantity
        .checked_add(delta)
        .filter(|quantity| *quantity >= 0)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "adjusting inventory {inventory_id} by {delta} would leave {} below zero",
                current.quantity
            ))
        })?;

    let adjusted = InventoryItem {
        quantity,
        updated_at: now,
        ..current
    };
    uow.put_inventory(adjusted.clone())?;
    uow.append_adjustment(InventoryAdjustment {
        id: Uuid::new_v4(),
        inventory_id,
        delta,
        reason: reason.to_string(),
        resulting_quantity: quantity,
        created_at: now,
    })?;
    uow.commit();

    info!(inventory_id = %inventory_id, delta, quantity, reason, "inventory adjusted");
    Ok(adjusted)
}

pub async fn get(state: &AppState, inventory_id: Uuid) -> Result<InventoryItem, AppError> {
    let uow = state.store.begin().await;
    find(&uow, inventory_id)
}

pub async fn list(state: &AppState, filter: &InventoryFilter) -> Vec<InventoryItem> {
    state.store.begin().await.inventory(filter)
}

pub async fn adjustments(
    state: &AppState,
    inventory_id: Uuid,
) -> Result<Vec<InventoryAdjustment>, AppError> {
    let uow = state.store.begin().await;
    find(&uow, inventory_id)?;
    Ok(uow.adjustments_for(inventory_id))
}

fn find(tables: &Tables, inventory_id: Uuid) -> Result<InventoryItem, AppError> {
    tables
        .inventory_item(inventory_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("inventory {inventory_id} not found")))
}
