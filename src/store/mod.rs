//! Transactional in-process storage for the coordination core.
//!
//! All tables live behind a single async mutex. A [`UnitOfWork`] holds that
//! lock for its whole lifetime, so every read-then-act sequence inside it is
//! serialised against all other requests. Writes are recorded in an undo log
//! and reverted when the unit of work is dropped without [`UnitOfWork::commit`].

mod tables;

use std::collections::HashMap;
use std::ops::Deref;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::allocation::Allocation;
use crate::models::gps::GpsLocation;
use crate::models::inventory::{InventoryAdjustment, InventoryItem};
use crate::models::order::{Order, OrderAttempt};
use crate::models::shift::Shift;

pub use tables::{TableCounts, Tables};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),

    #[error("check constraint violated: {0}")]
    CheckViolation(&'static str),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(&'static str),

    #[error("{table} row {id} not found")]
    RowNotFound { table: &'static str, id: Uuid },
}

type Undo = Box<dyn FnOnce(&mut Tables) + Send>;

#[derive(Default)]
pub struct Store {
    tables: Mutex<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            tables: self.tables.lock().await,
            undo: Vec::new(),
            committed: false,
        }
    }
}

pub struct UnitOfWork<'a> {
    tables: MutexGuard<'a, Tables>,
    undo: Vec<Undo>,
    committed: bool,
}

impl Deref for UnitOfWork<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &*self.tables
    }
}

impl UnitOfWork<'_> {
    pub fn commit(mut self) {
        self.committed = true;
        self.undo.clear();
    }

    pub fn put_allocation(&mut self, row: Allocation) -> Result<(), StoreError> {
        self.tables.check_allocation(&row)?;
        self.put(tables::allocations_mut, row.id, row);
        Ok(())
    }

    pub fn delete_allocation(&mut self, id: Uuid) -> Result<Allocation, StoreError> {
        if self.tables.shifts_referencing(id).next().is_some() {
            return Err(StoreError::ForeignKeyViolation("fk_shifts_allocation"));
        }
        self.remove(tables::allocations_mut, id)
            .ok_or(StoreError::RowNotFound {
                table: "allocations",
                id,
            })
    }

    pub fn put_shift(&mut self, row: Shift) -> Result<(), StoreError> {
        self.tables.check_shift(&row)?;
        self.put(tables::shifts_mut, row.id, row);
        Ok(())
    }

    pub fn put_order(&mut self, row: Order) -> Result<(), StoreError> {
        self.tables.check_order(&row)?;
        self.put(tables::orders_mut, row.id, row);
        Ok(())
    }

    pub fn delete_order(&mut self, id: Uuid) -> Result<Order, StoreError> {
        if !self.tables.attempts_for_order(id).is_empty() {
            return Err(StoreError::ForeignKeyViolation("fk_order_attempts_order"));
        }
        self.remove(tables::orders_mut, id)
            .ok_or(StoreError::RowNotFound { table: "orders", id })
    }

    pub fn put_attempt(&mut self, row: OrderAttempt) -> Result<(), StoreError> {
        self.tables.check_attempt(&row)?;
        self.put(tables::attempts_mut, row.id, row);
        Ok(())
    }

    pub fn put_inventory(&mut self, row: InventoryItem) -> Result<(), StoreError> {
        self.tables.check_inventory(&row)?;
        self.put(tables::inventory_mut, row.id, row);
        Ok(())
    }

    pub fn append_adjustment(&mut self, row: InventoryAdjustment) -> Result<(), StoreError> {
        if self.tables.inventory_item(row.inventory_id).is_none() {
            return Err(StoreError::ForeignKeyViolation(
                "fk_inventory_adjustments_inventory",
            ));
        }
        self.tables.adjustments.push(row);
        self.undo.push(Box::new(|tables: &mut Tables| {
            tables.adjustments.pop();
        }));
        Ok(())
    }

    pub fn append_gps(&mut self, row: GpsLocation) -> Result<(), StoreError> {
        if let Some(shift_id) = row.shift_id {
            if self.tables.shift(shift_id).is_none() {
                return Err(StoreError::ForeignKeyViolation("fk_gps_locations_shift"));
            }
        }
        self.tables.gps.push(row);
        self.undo.push(Box::new(|tables: &mut Tables| {
            tables.gps.pop();
        }));
        Ok(())
    }

    fn put<T>(&mut self, table: fn(&mut Tables) -> &mut HashMap<Uuid, T>, id: Uuid, row: T)
    where
        T: Send + 'static,
    {
        let previous = table(&mut *self.tables).insert(id, row);
        self.undo.push(Box::new(move |tables: &mut Tables| {
            let rows = table(tables);
            match previous {
                Some(previous) => {
                    rows.insert(id, previous);
                }
                None => {
                    rows.remove(&id);
                }
            }
        }));
    }

    fn remove<T>(&mut self, table: fn(&mut Tables) -> &mut HashMap<Uuid, T>, id: Uuid) -> Option<T>
    where
        T: Clone + Send + 'static,
    {
        let removed = table(&mut *self.tables).remove(&id)?;
        let restored = removed.clone();
        self.undo.push(Box::new(move |tables: &mut Tables| {
            table(tables).insert(id, restored);
        }));
        Some(removed)
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if self.committed || self.undo.is_empty() {
            return;
        }

        let writes = self.undo.len();
        while let Some(undo) = self.undo.pop() {
            undo(&mut *self.tables);
        }
        tracing::debug!(writes, "unit of work rolled back");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::{Store, StoreError};
    use crate::models::allocation::Allocation;
    use crate::models::inventory::InventoryItem;
    use crate::models::shift::{Shift, ShiftStatus};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 21).unwrap()
    }

    fn allocation(vehicle_id: Uuid, driver_id: Uuid) -> Allocation {
        Allocation {
            id: Uuid::new_v4(),
            vehicle_id,
            driver_id,
            date: date(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shift(driver_id: Uuid, allocation_id: Option<Uuid>, status: ShiftStatus) -> Shift {
        Shift {
            id: Uuid::new_v4(),
            driver_id,
            allocation_id,
            date: date(),
            status,
            start_time: None,
            end_time: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back_every_write() {
        let store = Store::new();
        let row = allocation(Uuid::new_v4(), Uuid::new_v4());

        {
            let mut uow = store.begin().await;
            uow.put_allocation(row.clone()).unwrap();
            assert!(uow.allocation(row.id).is_some());
        }

        let uow = store.begin().await;
        assert!(uow.allocation(row.id).is_none());
    }

    #[tokio::test]
    async fn rollback_restores_previous_row_version() {
        let store = Store::new();
        let mut item = InventoryItem {
            id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 10,
            updated_at: Utc::now(),
        };

        let mut uow = store.begin().await;
        uow.put_inventory(item.clone()).unwrap();
        uow.commit();

        {
            let mut uow = store.begin().await;
            item.quantity = 50;
            uow.put_inventory(item.clone()).unwrap();
        }

        let uow = store.begin().await;
        assert_eq!(uow.inventory_item(item.id).unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn allocation_exclusivity_names_the_violated_rule() {
        let store = Store::new();
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let mut uow = store.begin().await;
        uow.put_allocation(allocation(vehicle, driver)).unwrap();

        assert_eq!(
            uow.put_allocation(allocation(vehicle, Uuid::new_v4())),
            Err(StoreError::UniqueViolation("uq_allocations_vehicle_date"))
        );
        assert_eq!(
            uow.put_allocation(allocation(Uuid::new_v4(), driver)),
            Err(StoreError::UniqueViolation("uq_allocations_driver_date"))
        );
    }

    #[tokio::test]
    async fn active_shift_requires_same_day_allocation() {
        let store = Store::new();
        let driver = Uuid::new_v4();
        let mut uow = store.begin().await;

        assert_eq!(
            uow.put_shift(shift(driver, None, ShiftStatus::Active)),
            Err(StoreError::CheckViolation("ck_shifts_active_allocation"))
        );

        let mut other_day = allocation(Uuid::new_v4(), driver);
        other_day.date = date().succ_opt().unwrap();
        uow.put_allocation(other_day.clone()).unwrap();
        assert_eq!(
            uow.put_shift(shift(driver, Some(other_day.id), ShiftStatus::Active)),
            Err(StoreError::CheckViolation("ck_shifts_active_allocation"))
        );
    }

    #[tokio::test]
    async fn referenced_allocation_cannot_be_deleted() {
        let store = Store::new();
        let driver = Uuid::new_v4();
        let row = allocation(Uuid::new_v4(), driver);

        let mut uow = store.begin().await;
        uow.put_allocation(row.clone()).unwrap();
        uow.put_shift(shift(driver, Some(row.id), ShiftStatus::Completed))
            .unwrap();

        assert_eq!(
            uow.delete_allocation(row.id),
            Err(StoreError::ForeignKeyViolation("fk_shifts_allocation"))
        );
    }

    #[tokio::test]
    async fn inventory_cannot_go_negative() {
        let store = Store::new();
        let mut uow = store.begin().await;
        let result = uow.put_inventory(InventoryItem {
            id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: -1,
            updated_at: Utc::now(),
        });

        assert_eq!(
            result,
            Err(StoreError::CheckViolation("ck_inventory_quantity_nonnegative"))
        );
    }

    #[tokio::test]
    async fn vehicle_lookup_prefers_the_most_recent_active_shift() {
        let store = Store::new();
        let vehicle = Uuid::new_v4();
        let (earlier, later) = (Uuid::new_v4(), Uuid::new_v4());
        let mut uow = store.begin().await;

        let mut stale_allocation = allocation(vehicle, earlier);
        stale_allocation.date = date().pred_opt().unwrap();
        uow.put_allocation(stale_allocation.clone()).unwrap();
        let mut stale = shift(earlier, Some(stale_allocation.id), ShiftStatus::Active);
        stale.date = stale_allocation.date;
        uow.put_shift(stale).unwrap();

        let current_allocation = allocation(vehicle, later);
        uow.put_allocation(current_allocation.clone()).unwrap();
        let current = shift(later, Some(current_allocation.id), ShiftStatus::Active);
        uow.put_shift(current.clone()).unwrap();

        for _ in 0..20 {
            assert_eq!(
                uow.active_shift_for_vehicle(vehicle).map(|row| row.id),
                Some(current.id)
            );
        }
    }
}
