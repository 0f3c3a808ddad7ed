use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::allocation::Allocation;
use crate::models::gps::GpsLocation;
use crate::models::inventory::{InventoryAdjustment, InventoryFilter, InventoryItem};
use crate::models::order::{AttemptStatus, Order, OrderAttempt, OrderFilter};
use crate::models::shift::{Shift, ShiftStatus};
use crate::store::StoreError;

/// Row storage for the core entities.
#[derive(Default)]
pub struct Tables {
    allocations: HashMap<Uuid, Allocation>,
    shifts: HashMap<Uuid, Shift>,
    orders: HashMap<Uuid, Order>,
    attempts: HashMap<Uuid, OrderAttempt>,
    inventory: HashMap<Uuid, InventoryItem>,
    pub(super) adjustments: Vec<InventoryAdjustment>,
    pub(super) gps: Vec<GpsLocation>,
}

pub(super) fn allocations_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Allocation> {
    &mut tables.allocations
}

pub(super) fn shifts_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Shift> {
    &mut tables.shifts
}

pub(super) fn orders_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Order> {
    &mut tables.orders
}

pub(super) fn attempts_mut(tables: &mut Tables) -> &mut HashMap<Uuid, OrderAttempt> {
    &mut tables.attempts
}

pub(super) fn inventory_mut(tables: &mut Tables) -> &mut HashMap<Uuid, InventoryItem> {
    &mut tables.inventory
}

impl Tables {
    pub fn allocation(&self, id: Uuid) -> Option<&Allocation> {
        self.allocations.get(&id)
    }

    pub fn allocations_on(&self, date: NaiveDate) -> Vec<Allocation> {
        let mut rows: Vec<Allocation> = self
            .allocations
            .values()
            .filter(|row| row.date == date)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        rows
    }

    pub fn allocation_for_driver(&self, driver_id: Uuid, date: NaiveDate) -> Option<&Allocation> {
        self.allocations
            .values()
            .find(|row| row.driver_id == driver_id && row.date == date)
    }

    pub fn allocation_for_vehicle(&self, vehicle_id: Uuid, date: NaiveDate) -> Option<&Allocation> {
        self.allocations
            .values()
            .find(|row| row.vehicle_id == vehicle_id && row.date == date)
    }

    pub fn shift(&self, id: Uuid) -> Option<&Shift> {
        self.shifts.get(&id)
    }

    pub fn shifts_for_driver(&self, driver_id: Uuid) -> Vec<Shift> {
        let mut rows: Vec<Shift> = self
            .shifts
            .values()
            .filter(|row| row.driver_id == driver_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        rows
    }

    pub fn shift_for_driver_on(&self, driver_id: Uuid, date: NaiveDate) -> Option<&Shift> {
        self.shifts
            .values()
            .find(|row| row.driver_id == driver_id && row.date == date)
    }

    pub fn active_shift_for_driver(&self, driver_id: Uuid) -> Option<&Shift> {
        self.shifts
            .values()
            .find(|row| row.driver_id == driver_id && row.is_active())
    }

    /// The active shift whose allocation binds `vehicle_id`. If a shift from
    /// an earlier date was never closed, the most recent one wins.
    pub fn active_shift_for_vehicle(&self, vehicle_id: Uuid) -> Option<&Shift> {
        self.shifts
            .values()
            .filter(|row| {
                row.is_active()
                    && row
                        .allocation_id
                        .and_then(|id| self.allocations.get(&id))
                        .is_some_and(|allocation| allocation.vehicle_id == vehicle_id)
            })
            .max_by_key(|row| (row.date, row.start_time, row.id))
    }

    pub fn shifts_referencing(&self, allocation_id: Uuid) -> impl Iterator<Item = &Shift> {
        self.shifts
            .values()
            .filter(move |row| row.allocation_id == Some(allocation_id))
    }

    pub fn order(&self, id: Uuid) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn orders(&self, filter: &OrderFilter) -> Vec<Order> {
        let mut rows: Vec<Order> = self
            .orders
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        rows
    }

    /// Orders that keep `shift` from ending: the driver's assigned or
    /// in-progress orders for the shift date, plus any order whose attempt
    /// under this shift is still in progress whatever its planned date.
    pub fn open_orders_for(&self, shift: &Shift) -> Vec<Order> {
        let mut rows: Vec<Order> = self
            .orders
            .values()
            .filter(|row| {
                let planned_today = row.assigned_driver_id == Some(shift.driver_id)
                    && row.assigned_date == Some(shift.date)
                    && row.status.is_open();
                planned_today
                    || self.attempts.values().any(|attempt| {
                        attempt.order_id == row.id
                            && attempt.shift_id == shift.id
                            && attempt.status == AttemptStatus::InProgress
                    })
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        rows
    }

    pub fn attempt_for(&self, order_id: Uuid, shift_id: Uuid) -> Option<&OrderAttempt> {
        self.attempts
            .values()
            .find(|row| row.order_id == order_id && row.shift_id == shift_id)
    }

    pub fn attempts_for_order(&self, order_id: Uuid) -> Vec<OrderAttempt> {
        let mut rows: Vec<OrderAttempt> = self
            .attempts
            .values()
            .filter(|row| row.order_id == order_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.started_at, row.id));
        rows
    }

    pub fn inventory_item(&self, id: Uuid) -> Option<&InventoryItem> {
        self.inventory.get(&id)
    }

    pub fn inventory_at(&self, location_id: Uuid, product_id: Uuid) -> Option<&InventoryItem> {
        self.inventory
            .values()
            .find(|row| row.location_id == location_id && row.product_id == product_id)
    }

    pub fn inventory(&self, filter: &InventoryFilter) -> Vec<InventoryItem> {
        let mut rows: Vec<InventoryItem> = self
            .inventory
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.location_id, row.product_id));
        rows
    }

    pub fn adjustments_for(&self, inventory_id: Uuid) -> Vec<InventoryAdjustment> {
        self.adjustments
            .iter()
            .filter(|row| row.inventory_id == inventory_id)
            .cloned()
            .collect()
    }

    pub fn gps_for_vehicle(&self, vehicle_id: Uuid, shift_id: Option<Uuid>) -> Vec<GpsLocation> {
        let mut rows: Vec<GpsLocation> = self
            .gps
            .iter()
            .filter(|row| row.vehicle_id == vehicle_id)
            .filter(|row| shift_id.is_none_or(|id| row.shift_id == Some(id)))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.recorded_at);
        rows
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            allocations: self.allocations.len(),
            shifts: self.shifts.len(),
            active_shifts: self.shifts.values().filter(|row| row.is_active()).count(),
            orders: self.orders.len(),
            gps_locations: self.gps.len(),
        }
    }

    pub(super) fn check_allocation(&self, row: &Allocation) -> Result<(), StoreError> {
        let others = self.allocations.values().filter(|other| other.id != row.id);
        for other in others {
            if other.date != row.date {
                continue;
            }
            if other.vehicle_id == row.vehicle_id {
                return Err(StoreError::UniqueViolation("uq_allocations_vehicle_date"));
            }
            if other.driver_id == row.driver_id {
                return Err(StoreError::UniqueViolation("uq_allocations_driver_date"));
            }
        }
        Ok(())
    }

    pub(super) fn check_shift(&self, row: &Shift) -> Result<(), StoreError> {
        let others = self.shifts.values().filter(|other| other.id != row.id);
        for other in others {
            if other.driver_id != row.driver_id {
                continue;
            }
            if other.date == row.date {
                return Err(StoreError::UniqueViolation("uq_shifts_driver_date"));
            }
            if row.is_active() && other.is_active() {
                return Err(StoreError::UniqueViolation("uq_shifts_active_driver"));
            }
        }

        let allocation = match row.allocation_id {
            Some(id) => Some(
                self.allocations
                    .get(&id)
                    .ok_or(StoreError::ForeignKeyViolation("fk_shifts_allocation"))?,
            ),
            None => None,
        };

        if row.status == ShiftStatus::Active {
            let bound = allocation
                .is_some_and(|a| a.date == row.date && a.driver_id == row.driver_id);
            if !bound {
                return Err(StoreError::CheckViolation("ck_shifts_active_allocation"));
            }
        }
        Ok(())
    }

    pub(super) fn check_order(&self, row: &Order) -> Result<(), StoreError> {
        if row.quantity <= 0 {
            return Err(StoreError::CheckViolation("ck_orders_quantity_positive"));
        }
        Ok(())
    }

    pub(super) fn check_attempt(&self, row: &OrderAttempt) -> Result<(), StoreError> {
        if !self.orders.contains_key(&row.order_id) {
            return Err(StoreError::ForeignKeyViolation("fk_order_attempts_order"));
        }
        if !self.shifts.contains_key(&row.shift_id) {
            return Err(StoreError::ForeignKeyViolation("fk_order_attempts_shift"));
        }
        let duplicate = self.attempts.values().any(|other| {
            other.id != row.id && other.order_id == row.order_id && other.shift_id == row.shift_id
        });
        if duplicate {
            return Err(StoreError::UniqueViolation("uq_order_attempts_order_shift"));
        }
        Ok(())
    }

    pub(super) fn check_inventory(&self, row: &InventoryItem) -> Result<(), StoreError> {
        if row.quantity < 0 {
            return Err(StoreError::CheckViolation("ck_inventory_quantity_nonnegative"));
        }
        let duplicate = self.inventory.values().any(|other| {
            other.id != row.id
                && other.location_id == row.location_id
                && other.product_id == row.product_id
        });
        if duplicate {
            return Err(StoreError::UniqueViolation("uq_inventory_location_product"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableCounts {
    pub allocations: usize,
    pub shifts: usize,
    pub active_shifts: usize,
    pub orders: usize,
    pub gps_locations: usize,
}
