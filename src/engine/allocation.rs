use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::allocation::{Allocation, AllocationChanges};
use crate::models::event::FleetEvent;
use crate::models::reference::Vehicle;
use crate::state::AppState;
use crate::store::{StoreError, Tables};

pub async fn allocate(
    state: &AppState,
    vehicle_id: Uuid,
    driver_id: Uuid,
    date: NaiveDate,
) -> Result<Allocation, AppError> {
    state.reference.vehicle(vehicle_id)?;
    state.reference.driver(driver_id)?;
    ensure_not_past(state, date)?;

    let now = state.now();
    let allocation = Allocation {
        id: Uuid::new_v4(),
        vehicle_id,
        driver_id,
        date,
        created_at: now,
        updated_at: now,
    };

    let mut uow = state.store.begin().await;
    uow.put_allocation(allocation.clone())
        .map_err(|err| exclusivity_error(err, &allocation))?;
    uow.commit();

    info!(
        allocation_id = %allocation.id,
        vehicle_id = %vehicle_id,
        driver_id = %driver_id,
        %date,
        "vehicle allocated"
    );
    state.publish(FleetEvent::AllocationCreated {
        allocation_id: allocation.id,
        vehicle_id,
        driver_id,
        date,
    });

    Ok(allocation)
}

pub async fn modify(
    state: &AppState,
    allocation_id: Uuid,
    changes: AllocationChanges,
) -> Result<Allocation, AppError> {
    if changes.is_empty() {
        return Err(AppError::Validation(
            "at least one of vehicle_id, driver_id or date must be supplied".to_string(),
        ));
    }
    if let Some(vehicle_id) = changes.vehicle_id {
        state.reference.vehicle(vehicle_id)?;
    }
    if let Some(driver_id) = changes.driver_id {
        state.reference.driver(driver_id)?;
    }
    if let Some(date) = changes.date {
        ensure_not_past(state, date)?;
    }

    let mut uow = state.store.begin().await;
    let current = find(&uow, allocation_id)?;
    ensure_not_in_use(&uow, &current)?;

    let updated = Allocation {
        vehicle_id: changes.vehicle_id.unwrap_or(current.vehicle_id),
        driver_id: changes.driver_id.unwrap_or(current.driver_id),
        date: changes.date.unwrap_or(current.date),
        updated_at: state.now(),
        ..current
    };
    uow.put_allocation(updated.clone())
        .map_err(|err| exclusivity_error(err, &updated))?;
    uow.commit();

    info!(allocation_id = %updated.id, "allocation modified");
    Ok(updated)
}

pub async fn release(state: &AppState, allocation_id: Uuid) -> Result<Allocation, AppError> {
    let mut uow = state.store.begin().await;
    let current = find(&uow, allocation_id)?;
    ensure_not_in_use(&uow, &current)?;

    let released = uow.delete_allocation(allocation_id).map_err(|err| match err {
        StoreError::ForeignKeyViolation("fk_shifts_allocation") => AppError::Conflict(format!(
            "allocation {allocation_id} is referenced by a shift and cannot be released"
        )),
        other => other.into(),
    })?;
    uow.commit();

    info!(allocation_id = %allocation_id, "allocation released");
    state.publish(FleetEvent::AllocationReleased { allocation_id });
    Ok(released)
}

pub async fn get(state: &AppState, allocation_id: Uuid) -> Result<Allocation, AppError> {
    let uow = state.store.begin().await;
    find(&uow, allocation_id)
}

pub async fn list_for_date(state: &AppState, date: NaiveDate) -> Vec<Allocation> {
    state.store.begin().await.allocations_on(date)
}

/// Vehicles with no allocation on `date`.
pub async fn available_vehicles(state: &AppState, date: NaiveDate) -> Vec<Vehicle> {
    let uow = state.store.begin().await;
    state
        .reference
        .vehicles()
        .into_iter()
        .filter(|vehicle| uow.allocation_for_vehicle(vehicle.id, date).is_none())
        .collect()
}

pub async fn for_driver_on(
    state: &AppState,
    driver_id: Uuid,
    date: NaiveDate,
) -> Result<Option<Allocation>, AppError> {
    state.reference.driver(driver_id)?;
    let uow = state.store.begin().await;
    Ok(uow.allocation_for_driver(driver_id, date).cloned())
}

fn find(tables: &Tables, allocation_id: Uuid) -> Result<Allocation, AppError> {
    tables
        .allocation(allocation_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("allocation {allocation_id} not found")))
}

fn ensure_not_past(state: &AppState, date: NaiveDate) -> Result<(), AppError> {
    let today = state.today();
    if date < today {
        return Err(AppError::Validation(format!(
            "allocation date {date} is in the past (today is {today})"
        )));
    }
    Ok(())
}

fn ensure_not_in_use(tables: &Tables, allocation: &Allocation) -> Result<(), AppError> {
    let active = tables
        .shifts_referencing(allocation.id)
        .find(|shift| shift.is_active());
    if let Some(shift) = active {
        warn!(
            allocation_id = %allocation.id,
            shift_id = %shift.id,
            "allocation change blocked by active shift"
        );
        return Err(AppError::Conflict(format!(
            "allocation {} is in use by active shift {}",
            allocation.id, shift.id
        )));
    }
    Ok(())
}

fn exclusivity_error(err: StoreError, allocation: &Allocation) -> AppError {
    match err {
        StoreError::UniqueViolation("uq_allocations_vehicle_date") => AppError::Conflict(format!(
            "vehicle {} is already booked on {}",
            allocation.vehicle_id, allocation.date
        )),
        StoreError::UniqueViolation("uq_allocations_driver_date") => AppError::Conflict(format!(
            "driver {} already has a vehicle allocated on {}",
            allocation.driver_id, allocation.date
        )),
        other => other.into(),
    }
}
